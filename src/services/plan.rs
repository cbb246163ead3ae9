use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::services::goal::{self, GoalError};
use crate::services::now_iso;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanMode {
    Fixed,
    Adaptive,
    Workdays,
    Weekends,
}

impl PlanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::Adaptive => "ADAPTIVE",
            Self::Workdays => "WORKDAYS",
            Self::Weekends => "WEEKENDS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FIXED" => Some(Self::Fixed),
            "ADAPTIVE" => Some(Self::Adaptive),
            "WORKDAYS" => Some(Self::Workdays),
            "WEEKENDS" => Some(Self::Weekends),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Paused => "PAUSED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "COMPLETED" => Some(Self::Completed),
            "PAUSED" => Some(Self::Paused),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub mode: PlanMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_items: i64,
    pub daily_target: i64,
    pub status: PlanStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanInput {
    pub goal_id: String,
    pub mode: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: String,
    pub goal_id: String,
    pub mode: PlanMode,
    pub status: PlanStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_items: i64,
    pub learned_items: i64,
    pub daily_target: i64,
    pub total_days: i64,
    pub elapsed_days: i64,
    pub remaining_days: i64,
    pub progress_percentage: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Goal(#[from] GoalError),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Inclusive count of the days in `[from, to]` the mode schedules study
/// on. Zero when the range is empty.
pub fn count_study_days(mode: PlanMode, from: NaiveDate, to: NaiveDate) -> i64 {
    if from > to {
        return 0;
    }
    match mode {
        PlanMode::Fixed | PlanMode::Adaptive => (to - from).num_days() + 1,
        PlanMode::Workdays => count_matching(from, to, |d| {
            !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
        }),
        PlanMode::Weekends => count_matching(from, to, |d| {
            matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
        }),
    }
}

fn count_matching(from: NaiveDate, to: NaiveDate, pred: impl Fn(NaiveDate) -> bool) -> i64 {
    let mut count = 0;
    let mut day = from;
    while day <= to {
        if pred(day) {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

/// Daily target math for every mode. Division rounds up so the targets
/// over the range always cover the item count, and divisors are floored
/// at 1, so an overdue plan concentrates all remaining items into the
/// next target rather than dividing by zero.
pub fn daily_target_for(
    mode: PlanMode,
    total_items: i64,
    learned_items: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> i64 {
    match mode {
        PlanMode::Fixed => {
            if total_items <= 0 {
                return 0;
            }
            let total_days = ((end_date - start_date).num_days() + 1).max(1);
            ((total_items + total_days - 1) / total_days).max(1)
        }
        PlanMode::Adaptive => {
            let remaining = total_items - learned_items;
            if remaining <= 0 {
                return 0;
            }
            let remaining_days = ((end_date - today).num_days() + 1).max(1);
            ((remaining + remaining_days - 1) / remaining_days).max(1)
        }
        PlanMode::Workdays | PlanMode::Weekends => {
            let remaining = total_items - learned_items;
            if remaining <= 0 {
                return 0;
            }
            let remaining_days = count_study_days(mode, today, end_date).max(1);
            ((remaining + remaining_days - 1) / remaining_days).max(1)
        }
    }
}

pub async fn create_plan(
    pool: &SqlitePool,
    user_id: &str,
    input: CreatePlanInput,
) -> Result<Plan, PlanError> {
    let mode = PlanMode::parse(&input.mode).ok_or_else(|| {
        PlanError::Validation(format!(
            "unknown plan mode '{}', expected FIXED, ADAPTIVE, WORKDAYS or WEEKENDS",
            input.mode
        ))
    })?;

    let start_date = parse_date(&input.start_date)?;
    let end_date = parse_date(&input.end_date)?;
    if end_date <= start_date {
        return Err(PlanError::InvalidDateRange(format!(
            "end date {end_date} must be after start date {start_date}"
        )));
    }

    // NotFound if the goal is missing or owned by someone else; the
    // refresh also primes learnedItems for the first target computation.
    let progress = goal::refresh_progress(pool, user_id, &input.goal_id).await?;
    let goal = goal::get_goal(pool, user_id, &input.goal_id).await?;

    let today = Utc::now().date_naive();
    let daily_target = daily_target_for(
        mode,
        progress.total_items,
        progress.learned_items,
        start_date,
        end_date,
        today,
    );

    let now = now_iso();
    let plan = Plan {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        goal_id: goal.id,
        mode,
        start_date,
        end_date,
        total_items: progress.total_items,
        daily_target,
        status: PlanStatus::Active,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO "plans"
          ("id","userId","goalId","mode","startDate","endDate","totalItems","dailyTarget","status","createdAt","updatedAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        "#,
    )
    .bind(&plan.id)
    .bind(&plan.user_id)
    .bind(&plan.goal_id)
    .bind(plan.mode.as_str())
    .bind(plan.start_date.to_string())
    .bind(plan.end_date.to_string())
    .bind(plan.total_items)
    .bind(plan.daily_target)
    .bind(plan.status.as_str())
    .bind(&plan.created_at)
    .bind(&plan.updated_at)
    .execute(pool)
    .await?;

    Ok(plan)
}

pub async fn get_plan(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
) -> Result<Plan, PlanError> {
    let row = sqlx::query(
        r#"
        SELECT "id","userId","goalId","mode","startDate","endDate","totalItems",
               "dailyTarget","status","createdAt","updatedAt"
        FROM "plans"
        WHERE "id" = $1 AND "userId" = $2
        LIMIT 1
        "#,
    )
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref()
        .map(map_plan_row)
        .ok_or_else(|| PlanError::NotFound(format!("plan {plan_id} does not exist")))
}

/// Refreshes goal progress and rewrites `dailyTarget`. Fixed-mode plans
/// keep their creation-time target and are returned untouched.
pub async fn recompute_target(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
) -> Result<Plan, PlanError> {
    let plan = get_plan(pool, user_id, plan_id).await?;
    if plan.mode == PlanMode::Fixed {
        return Ok(plan);
    }

    let progress = goal::refresh_progress(pool, user_id, &plan.goal_id).await?;
    let today = Utc::now().date_naive();
    let daily_target = daily_target_for(
        plan.mode,
        progress.total_items,
        progress.learned_items,
        plan.start_date,
        plan.end_date,
        today,
    );

    sqlx::query(
        r#"UPDATE "plans" SET "totalItems" = $1, "dailyTarget" = $2, "updatedAt" = $3 WHERE "id" = $4"#,
    )
    .bind(progress.total_items)
    .bind(daily_target)
    .bind(now_iso())
    .bind(plan_id)
    .execute(pool)
    .await?;

    get_plan(pool, user_id, plan_id).await
}

pub async fn get_summary(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
) -> Result<PlanSummary, PlanError> {
    let plan = get_plan(pool, user_id, plan_id).await?;
    let goal = goal::get_goal(pool, user_id, &plan.goal_id).await?;
    let today = Utc::now().date_naive();
    Ok(summarize(&plan, goal.learned_items, today))
}

pub async fn update_status(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: &str,
    status: PlanStatus,
) -> Result<Plan, PlanError> {
    let result = sqlx::query(
        r#"UPDATE "plans" SET "status" = $1, "updatedAt" = $2 WHERE "id" = $3 AND "userId" = $4"#,
    )
    .bind(status.as_str())
    .bind(now_iso())
    .bind(plan_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PlanError::NotFound(format!("plan {plan_id} does not exist")));
    }

    get_plan(pool, user_id, plan_id).await
}

pub fn summarize(plan: &Plan, learned_items: i64, today: NaiveDate) -> PlanSummary {
    let total_days = (plan.end_date - plan.start_date).num_days() + 1;
    let elapsed_days = ((today - plan.start_date).num_days() + 1).clamp(0, total_days);
    let remaining_days = count_study_days(plan.mode, today.max(plan.start_date), plan.end_date);
    let progress_percentage = if total_days > 0 {
        (elapsed_days as f64 / total_days as f64) * 100.0
    } else {
        0.0
    };

    PlanSummary {
        id: plan.id.clone(),
        goal_id: plan.goal_id.clone(),
        mode: plan.mode,
        status: plan.status,
        start_date: plan.start_date,
        end_date: plan.end_date,
        total_items: plan.total_items,
        learned_items,
        daily_target: plan.daily_target,
        total_days,
        elapsed_days,
        remaining_days,
        progress_percentage: (progress_percentage * 100.0).round() / 100.0,
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, PlanError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| PlanError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

pub(crate) fn map_plan_row(row: &sqlx::sqlite::SqliteRow) -> Plan {
    let mode_raw: String = row.try_get("mode").unwrap_or_default();
    let status_raw: String = row.try_get("status").unwrap_or_default();
    let start_raw: String = row.try_get("startDate").unwrap_or_default();
    let end_raw: String = row.try_get("endDate").unwrap_or_default();
    let today = Utc::now().date_naive();

    Plan {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        goal_id: row.try_get("goalId").unwrap_or_default(),
        mode: PlanMode::parse(&mode_raw).unwrap_or(PlanMode::Adaptive),
        start_date: NaiveDate::parse_from_str(&start_raw, "%Y-%m-%d").unwrap_or(today),
        end_date: NaiveDate::parse_from_str(&end_raw, "%Y-%m-%d")
            .unwrap_or(today + Duration::days(30)),
        total_items: row.try_get("totalItems").unwrap_or(0),
        daily_target: row.try_get("dailyTarget").unwrap_or(0),
        status: PlanStatus::parse(&status_raw).unwrap_or(PlanStatus::Active),
        created_at: row.try_get("createdAt").unwrap_or_default(),
        updated_at: row.try_get("updatedAt").unwrap_or_default(),
    }
}
