use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::services::plan::{self, PlanError};
use crate::services::streak::StreakError;
use crate::services::{now_iso, streak};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub study_date: NaiveDate,
    pub target_items: i64,
    pub completed_items: i64,
    pub study_minutes: Option<i64>,
    pub completion_rate: f64,
    pub is_completed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<PlanError> for RecordError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NotFound(msg) => Self::NotFound(msg),
            PlanError::Sql(e) => Self::Sql(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<StreakError> for RecordError {
    fn from(err: StreakError) -> Self {
        match err {
            StreakError::Sql(e) => Self::Sql(e),
        }
    }
}

/// Upserts the ledger row for (user, plan, date). `targetItems` is
/// stamped from the plan's daily target when the row is first created
/// and never rewritten afterwards, so past rows keep whatever was asked
/// of the user at the time.
///
/// The first upsert for a calendar day also feeds the streak tracker;
/// later writes for the same date (same plan or another) do not, so a
/// day is never counted twice. The existence check, the row write and
/// the streak update share one transaction.
pub async fn upsert_daily_record(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
    study_date: &str,
    completed_items: i64,
    study_minutes: Option<i64>,
) -> Result<DailyRecord, RecordError> {
    if completed_items < 0 {
        return Err(RecordError::Validation(
            "completedItems must not be negative".into(),
        ));
    }
    if let Some(minutes) = study_minutes {
        if minutes < 0 {
            return Err(RecordError::Validation(
                "studyMinutes must not be negative".into(),
            ));
        }
    }

    let date = NaiveDate::parse_from_str(study_date.trim(), "%Y-%m-%d").map_err(|_| {
        RecordError::Validation(format!("invalid date '{study_date}', expected YYYY-MM-DD"))
    })?;

    let plan = plan::get_plan(pool, user_id, plan_id).await?;

    let mut tx = pool.begin().await?;

    let prior_for_date: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "daily_records" WHERE "userId" = $1 AND "studyDate" = $2"#,
    )
    .bind(user_id)
    .bind(date.to_string())
    .fetch_one(&mut *tx)
    .await?;

    let now = now_iso();
    sqlx::query(
        r#"
        INSERT INTO "daily_records"
          ("id","userId","planId","studyDate","targetItems","completedItems","studyMinutes","createdAt","updatedAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        ON CONFLICT ("userId","planId","studyDate") DO UPDATE SET
          "completedItems" = excluded."completedItems",
          "studyMinutes" = excluded."studyMinutes",
          "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(plan_id)
    .bind(date.to_string())
    .bind(plan.daily_target)
    .bind(completed_items)
    .bind(study_minutes)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    if prior_for_date == 0 {
        streak::record_activity_in(&mut tx, user_id, date).await?;
    }

    tx.commit().await?;

    fetch_one(pool, user_id, plan_id, date).await
}

pub async fn list_for_plan(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
) -> Result<Vec<DailyRecord>, RecordError> {
    let rows = sqlx::query(
        r#"
        SELECT "id","userId","planId","studyDate","targetItems","completedItems","studyMinutes"
        FROM "daily_records"
        WHERE "userId" = $1 AND "planId" = $2
        ORDER BY "studyDate" ASC
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_row).collect())
}

async fn fetch_one(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
    date: NaiveDate,
) -> Result<DailyRecord, RecordError> {
    let row = sqlx::query(
        r#"
        SELECT "id","userId","planId","studyDate","targetItems","completedItems","studyMinutes"
        FROM "daily_records"
        WHERE "userId" = $1 AND "planId" = $2 AND "studyDate" = $3
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .bind(date.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref()
        .map(map_row)
        .ok_or_else(|| RecordError::NotFound(format!("daily record for {date} missing")))
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> DailyRecord {
    let date_raw: String = row.try_get("studyDate").unwrap_or_default();
    let target_items: i64 = row.try_get("targetItems").unwrap_or(0);
    let completed_items: i64 = row.try_get("completedItems").unwrap_or(0);

    let completion_rate = if target_items > 0 {
        completed_items as f64 / target_items as f64
    } else {
        0.0
    };

    DailyRecord {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        plan_id: row.try_get("planId").unwrap_or_default(),
        study_date: NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
        target_items,
        completed_items,
        study_minutes: row.try_get("studyMinutes").ok().flatten(),
        completion_rate: (completion_rate * 10_000.0).round() / 10_000.0,
        is_completed: completed_items >= target_items,
    }
}
