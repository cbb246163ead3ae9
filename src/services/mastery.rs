use serde::Serialize;
use sqlx::{QueryBuilder, Row, SqlitePool};
use uuid::Uuid;

use crate::services::corpus::{self, CorpusError};
use crate::services::goal::Goal;
use crate::services::now_iso;

/// Review count at which an item is automatically considered mastered.
pub const MASTERY_THRESHOLD: i64 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProgressRecord {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub item_id: String,
    pub review_count: i64,
    pub last_review_at: Option<String>,
    pub is_mastered: bool,
    pub is_forgotten: bool,
    pub mastered_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounts {
    pub learned_count: i64,
    pub total_count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum MasteryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Lazily creates the progress row for (user, goal, item). All mastery
/// operations are upserts on top of this.
async fn ensure_row(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
    item_id: &str,
) -> Result<(), sqlx::Error> {
    let now = now_iso();
    sqlx::query(
        r#"
        INSERT INTO "item_progress"
          ("id","userId","goalId","itemId","reviewCount","isMastered","isForgotten","createdAt","updatedAt")
        VALUES ($1,$2,$3,$4,0,0,0,$5,$5)
        ON CONFLICT ("userId","goalId","itemId") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(goal_id)
    .bind(item_id)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

/// One logical review: increments the counter and stamps `lastReviewAt`.
/// Crossing MASTERY_THRESHOLD flips `isMastered` exactly once.
pub async fn review(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
    item_id: &str,
) -> Result<ItemProgressRecord, MasteryError> {
    ensure_row(pool, user_id, goal_id, item_id).await?;

    let now = now_iso();
    sqlx::query(
        r#"
        UPDATE "item_progress"
        SET "reviewCount" = "reviewCount" + 1,
            "lastReviewAt" = $1,
            "masteredAt" = CASE
                WHEN "isMastered" = 0 AND "reviewCount" + 1 >= $2 THEN $1
                ELSE "masteredAt"
            END,
            "isMastered" = CASE
                WHEN "reviewCount" + 1 >= $2 THEN 1
                ELSE "isMastered"
            END,
            "updatedAt" = $1
        WHERE "userId" = $3 AND "goalId" = $4 AND "itemId" = $5
        "#,
    )
    .bind(&now)
    .bind(MASTERY_THRESHOLD)
    .bind(user_id)
    .bind(goal_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    fetch_one(pool, user_id, goal_id, item_id).await
}

/// Manual override: mastered regardless of the review count.
pub async fn mark_mastered(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
    item_id: &str,
) -> Result<ItemProgressRecord, MasteryError> {
    ensure_row(pool, user_id, goal_id, item_id).await?;

    let now = now_iso();
    sqlx::query(
        r#"
        UPDATE "item_progress"
        SET "isMastered" = 1, "masteredAt" = $1, "updatedAt" = $1
        WHERE "userId" = $2 AND "goalId" = $3 AND "itemId" = $4
        "#,
    )
    .bind(&now)
    .bind(user_id)
    .bind(goal_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    fetch_one(pool, user_id, goal_id, item_id).await
}

pub async fn mark_forgotten(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
    item_id: &str,
) -> Result<ItemProgressRecord, MasteryError> {
    ensure_row(pool, user_id, goal_id, item_id).await?;

    let now = now_iso();
    sqlx::query(
        r#"
        UPDATE "item_progress"
        SET "isForgotten" = 1, "isMastered" = 0, "masteredAt" = NULL, "updatedAt" = $1
        WHERE "userId" = $2 AND "goalId" = $3 AND "itemId" = $4
        "#,
    )
    .bind(&now)
    .bind(user_id)
    .bind(goal_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    fetch_one(pool, user_id, goal_id, item_id).await
}

/// Back to a blank slate: zero reviews, both flags cleared.
pub async fn reset(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
    item_id: &str,
) -> Result<ItemProgressRecord, MasteryError> {
    ensure_row(pool, user_id, goal_id, item_id).await?;

    let now = now_iso();
    sqlx::query(
        r#"
        UPDATE "item_progress"
        SET "reviewCount" = 0,
            "isMastered" = 0,
            "isForgotten" = 0,
            "masteredAt" = NULL,
            "lastReviewAt" = NULL,
            "updatedAt" = $1
        WHERE "userId" = $2 AND "goalId" = $3 AND "itemId" = $4
        "#,
    )
    .bind(&now)
    .bind(user_id)
    .bind(goal_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    fetch_one(pool, user_id, goal_id, item_id).await
}

/// Mastered count over the goal's resolved corpus. Progress rows for items
/// that dropped out of the corpus are ignored.
pub async fn progress(
    pool: &SqlitePool,
    user_id: &str,
    goal: &Goal,
) -> Result<ProgressCounts, MasteryError> {
    let corpus = corpus::resolve(pool, goal).await?;
    let total_count = corpus.len() as i64;

    if corpus.is_empty() {
        return Ok(ProgressCounts {
            learned_count: 0,
            total_count: 0,
        });
    }

    let mut qb = QueryBuilder::<sqlx::Sqlite>::new(
        r#"SELECT COUNT(*) as "learned" FROM "item_progress" WHERE "userId" = "#,
    );
    qb.push_bind(user_id);
    qb.push(r#" AND "goalId" = "#);
    qb.push_bind(&goal.id);
    qb.push(r#" AND "isMastered" = 1 AND "itemId" IN ("#);
    {
        let mut sep = qb.separated(", ");
        for id in &corpus {
            sep.push_bind(id);
        }
    }
    qb.push(")");

    let row = qb.build().fetch_one(pool).await?;
    let learned_count: i64 = row.try_get("learned").unwrap_or(0);

    Ok(ProgressCounts {
        learned_count,
        total_count,
    })
}

/// All progress rows the user has under a goal, keyed lookup left to the
/// caller.
pub async fn list_for_goal(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
) -> Result<Vec<ItemProgressRecord>, MasteryError> {
    let rows = sqlx::query(
        r#"
        SELECT "id","userId","goalId","itemId","reviewCount","lastReviewAt",
               "isMastered","isForgotten","masteredAt","createdAt","updatedAt"
        FROM "item_progress"
        WHERE "userId" = $1 AND "goalId" = $2
        "#,
    )
    .bind(user_id)
    .bind(goal_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_row).collect())
}

async fn fetch_one(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
    item_id: &str,
) -> Result<ItemProgressRecord, MasteryError> {
    let row = sqlx::query(
        r#"
        SELECT "id","userId","goalId","itemId","reviewCount","lastReviewAt",
               "isMastered","isForgotten","masteredAt","createdAt","updatedAt"
        FROM "item_progress"
        WHERE "userId" = $1 AND "goalId" = $2 AND "itemId" = $3
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(goal_id)
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref()
        .map(map_row)
        .ok_or_else(|| MasteryError::NotFound(format!("progress row for item {item_id} missing")))
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> ItemProgressRecord {
    ItemProgressRecord {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        goal_id: row.try_get("goalId").unwrap_or_default(),
        item_id: row.try_get("itemId").unwrap_or_default(),
        review_count: row.try_get("reviewCount").unwrap_or(0),
        last_review_at: row.try_get("lastReviewAt").ok().flatten(),
        is_mastered: row.try_get::<bool, _>("isMastered").unwrap_or(false),
        is_forgotten: row.try_get::<bool, _>("isForgotten").unwrap_or(false),
        mastered_at: row.try_get("masteredAt").ok().flatten(),
        created_at: row.try_get("createdAt").unwrap_or_default(),
        updated_at: row.try_get("updatedAt").unwrap_or_default(),
    }
}
