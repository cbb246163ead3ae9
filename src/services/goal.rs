use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::services::corpus::{self, CorpusError};
use crate::services::{mastery, now_iso};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalType {
    List,
    Set,
    Level,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "LIST",
            Self::Set => "SET",
            Self::Level => "LEVEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LIST" => Some(Self::List),
            "SET" => Some(Self::Set),
            "LEVEL" => Some(Self::Level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub goal_type: GoalType,
    pub list_id: Option<String>,
    pub set_id: Option<String>,
    pub level: Option<i64>,
    pub is_current: bool,
    pub total_items: i64,
    pub learned_items: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalInput {
    pub name: String,
    pub goal_type: String,
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub set_id: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: String,
    pub total_items: i64,
    pub learned_items: i64,
    pub remaining_items: i64,
    pub progress_percentage: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid goal configuration: {0}")]
    InvalidGoalConfiguration(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<CorpusError> for GoalError {
    fn from(err: CorpusError) -> Self {
        match err {
            CorpusError::InvalidGoalConfiguration(msg) => Self::InvalidGoalConfiguration(msg),
            CorpusError::Sql(e) => Self::Sql(e),
        }
    }
}

pub async fn create_goal(
    pool: &SqlitePool,
    user_id: &str,
    input: CreateGoalInput,
) -> Result<Goal, GoalError> {
    if input.name.trim().is_empty() {
        return Err(GoalError::Validation("goal name must not be empty".into()));
    }

    let goal_type = GoalType::parse(&input.goal_type).ok_or_else(|| {
        GoalError::Validation(format!(
            "unknown goal type '{}', expected LIST, SET or LEVEL",
            input.goal_type
        ))
    })?;

    corpus::validate_source_refs(goal_type, &input.list_id, &input.set_id, input.level)
        .map_err(GoalError::from)?;

    let now = now_iso();
    let goal = Goal {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: input.name.trim().to_string(),
        goal_type,
        list_id: input.list_id,
        set_id: input.set_id,
        level: input.level,
        is_current: false,
        total_items: 0,
        learned_items: 0,
        created_at: now.clone(),
        updated_at: now,
    };

    // Corpus resolution both validates that the source exists and
    // primes the cached counter.
    let corpus = corpus::resolve(pool, &goal).await?;
    let total_items = corpus.len() as i64;

    sqlx::query(
        r#"
        INSERT INTO "goals"
          ("id","userId","name","goalType","listId","setId","level","isCurrent","totalItems","learnedItems","createdAt","updatedAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,0,$8,0,$9,$10)
        "#,
    )
    .bind(&goal.id)
    .bind(&goal.user_id)
    .bind(&goal.name)
    .bind(goal.goal_type.as_str())
    .bind(goal.list_id.as_deref())
    .bind(goal.set_id.as_deref())
    .bind(goal.level)
    .bind(total_items)
    .bind(&goal.created_at)
    .bind(&goal.updated_at)
    .execute(pool)
    .await?;

    Ok(Goal {
        total_items,
        ..goal
    })
}

pub async fn get_goal(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
) -> Result<Goal, GoalError> {
    let row = sqlx::query(
        r#"
        SELECT "id","userId","name","goalType","listId","setId","level","isCurrent",
               "totalItems","learnedItems","createdAt","updatedAt"
        FROM "goals"
        WHERE "id" = $1 AND "userId" = $2
        LIMIT 1
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| map_goal_row(&r))
        .ok_or_else(|| GoalError::NotFound(format!("goal {goal_id} does not exist")))
}

/// At most one current goal per user. Both writes run in one transaction
/// so a crash cannot leave two goals flagged.
pub async fn set_current_goal(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
) -> Result<Goal, GoalError> {
    let mut tx = pool.begin().await?;
    let now = now_iso();

    sqlx::query(r#"UPDATE "goals" SET "isCurrent" = 0, "updatedAt" = $1 WHERE "userId" = $2 AND "isCurrent" = 1"#)
        .bind(&now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query(
        r#"UPDATE "goals" SET "isCurrent" = 1, "updatedAt" = $1 WHERE "id" = $2 AND "userId" = $3"#,
    )
    .bind(&now)
    .bind(goal_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(GoalError::NotFound(format!("goal {goal_id} does not exist")));
    }

    tx.commit().await?;
    get_goal(pool, user_id, goal_id).await
}

/// Recomputes the cached `totalItems`/`learnedItems` counters from the
/// resolved corpus and the mastery tracker, then returns the fresh numbers.
pub async fn refresh_progress(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
) -> Result<GoalProgress, GoalError> {
    let goal = get_goal(pool, user_id, goal_id).await?;
    let counts = mastery::progress(pool, user_id, &goal)
        .await
        .map_err(|e| match e {
            mastery::MasteryError::Corpus(c) => GoalError::from(c),
            mastery::MasteryError::Sql(s) => GoalError::Sql(s),
            mastery::MasteryError::NotFound(m) => GoalError::NotFound(m),
        })?;

    sqlx::query(
        r#"UPDATE "goals" SET "totalItems" = $1, "learnedItems" = $2, "updatedAt" = $3 WHERE "id" = $4"#,
    )
    .bind(counts.total_count)
    .bind(counts.learned_count)
    .bind(now_iso())
    .bind(goal_id)
    .execute(pool)
    .await?;

    let progress_percentage = if counts.total_count > 0 {
        (counts.learned_count as f64 / counts.total_count as f64) * 100.0
    } else {
        0.0
    };

    Ok(GoalProgress {
        goal_id: goal_id.to_string(),
        total_items: counts.total_count,
        learned_items: counts.learned_count,
        remaining_items: (counts.total_count - counts.learned_count).max(0),
        progress_percentage: (progress_percentage * 100.0).round() / 100.0,
    })
}

pub(crate) fn map_goal_row(row: &sqlx::sqlite::SqliteRow) -> Goal {
    let goal_type_raw: String = row.try_get("goalType").unwrap_or_default();

    Goal {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        name: row.try_get("name").unwrap_or_default(),
        goal_type: GoalType::parse(&goal_type_raw).unwrap_or(GoalType::List),
        list_id: row.try_get("listId").ok().flatten(),
        set_id: row.try_get("setId").ok().flatten(),
        level: row.try_get("level").ok().flatten(),
        is_current: row.try_get::<bool, _>("isCurrent").unwrap_or(false),
        total_items: row.try_get("totalItems").unwrap_or(0),
        learned_items: row.try_get("learnedItems").unwrap_or(0),
        created_at: row.try_get("createdAt").unwrap_or_default(),
        updated_at: row.try_get("updatedAt").unwrap_or_default(),
    }
}
