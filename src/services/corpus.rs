use sqlx::{Row, SqlitePool};

use crate::services::goal::{Goal, GoalType};

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("invalid goal configuration: {0}")]
    InvalidGoalConfiguration(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Exactly one source reference must be populated, and it must be the one
/// selected by `goal_type`.
pub fn validate_source_refs(
    goal_type: GoalType,
    list_id: &Option<String>,
    set_id: &Option<String>,
    level: Option<i64>,
) -> Result<(), CorpusError> {
    let populated = [list_id.is_some(), set_id.is_some(), level.is_some()]
        .iter()
        .filter(|v| **v)
        .count();

    if populated != 1 {
        return Err(CorpusError::InvalidGoalConfiguration(format!(
            "expected exactly one corpus source, found {populated}"
        )));
    }

    let matches = match goal_type {
        GoalType::List => list_id.is_some(),
        GoalType::Set => set_id.is_some(),
        GoalType::Level => level.is_some(),
    };

    if !matches {
        return Err(CorpusError::InvalidGoalConfiguration(format!(
            "goal type {} does not match the populated source reference",
            goal_type.as_str()
        )));
    }

    Ok(())
}

/// Resolves a goal to the deduplicated set of item ids it covers, ordered
/// by term then id so repeated calls are stable. Reads the catalog fresh
/// every time; callers cache `totalItems` themselves.
pub async fn resolve(pool: &SqlitePool, goal: &Goal) -> Result<Vec<String>, CorpusError> {
    validate_source_refs(goal.goal_type, &goal.list_id, &goal.set_id, goal.level)?;

    let rows = match goal.goal_type {
        GoalType::List => {
            sqlx::query(
                r#"
                SELECT DISTINCT i."id"
                FROM "item_list_entries" e
                JOIN "items" i ON i."id" = e."itemId"
                WHERE e."listId" = $1
                ORDER BY i."term", i."id"
                "#,
            )
            .bind(goal.list_id.as_deref())
            .fetch_all(pool)
            .await?
        }
        GoalType::Set => {
            sqlx::query(
                r#"
                SELECT DISTINCT i."id"
                FROM "item_set_entries" e
                JOIN "items" i ON i."id" = e."itemId"
                WHERE e."setId" = $1
                ORDER BY i."term", i."id"
                "#,
            )
            .bind(goal.set_id.as_deref())
            .fetch_all(pool)
            .await?
        }
        GoalType::Level => {
            sqlx::query(
                r#"
                SELECT "id"
                FROM "items"
                WHERE "level" <= $1
                ORDER BY "term", "id"
                "#,
            )
            .bind(goal.level)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .iter()
        .map(|row| row.try_get::<String, _>("id").unwrap_or_default())
        .collect())
}
