use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::services::now_iso;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_study_date: Option<NaiveDate>,
    pub total_study_days: i64,
}

impl Streak {
    fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            total_study_days: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StreakError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Day machine for a single activity date. Same-day activity is a no-op,
/// the next calendar day extends the streak, a gap restarts it.
///
/// Backfilled activity (a date before `last_study_date`) only bumps
/// `totalStudyDays`; callers are expected to invoke this at most once per
/// newly recorded calendar day.
pub fn advance(streak: &Streak, date: NaiveDate) -> Streak {
    let mut next = streak.clone();

    let Some(last) = streak.last_study_date else {
        next.current_streak = 1;
        next.longest_streak = streak.longest_streak.max(1);
        next.total_study_days = streak.total_study_days + 1;
        next.last_study_date = Some(date);
        return next;
    };

    if date == last {
        return next;
    }

    if date < last {
        next.total_study_days += 1;
        return next;
    }

    if date == last + Duration::days(1) {
        next.current_streak += 1;
    } else {
        next.current_streak = 1;
    }
    next.longest_streak = next.longest_streak.max(next.current_streak);
    next.total_study_days += 1;
    next.last_study_date = Some(date);
    next
}

/// Applies one day of activity and persists the result. Runs in a
/// transaction so concurrent requests for the same user serialize on the
/// row write.
pub async fn record_activity(
    pool: &SqlitePool,
    user_id: &str,
    date: NaiveDate,
) -> Result<Streak, StreakError> {
    let mut tx = pool.begin().await?;
    let next = record_activity_in(&mut tx, user_id, date).await?;
    tx.commit().await?;
    Ok(next)
}

/// Transaction-scoped variant for callers that need the streak update
/// atomic with their own writes, such as the daily record ledger.
pub(crate) async fn record_activity_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
    date: NaiveDate,
) -> Result<Streak, StreakError> {
    let row = sqlx::query(
        r#"
        SELECT "userId","currentStreak","longestStreak","lastStudyDate","totalStudyDays"
        FROM "streaks"
        WHERE "userId" = $1
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    let current = row
        .as_ref()
        .map(map_row)
        .unwrap_or_else(|| Streak::empty(user_id));
    let next = advance(&current, date);

    sqlx::query(
        r#"
        INSERT INTO "streaks"
          ("userId","currentStreak","longestStreak","lastStudyDate","totalStudyDays","updatedAt")
        VALUES ($1,$2,$3,$4,$5,$6)
        ON CONFLICT ("userId") DO UPDATE SET
          "currentStreak" = excluded."currentStreak",
          "longestStreak" = excluded."longestStreak",
          "lastStudyDate" = excluded."lastStudyDate",
          "totalStudyDays" = excluded."totalStudyDays",
          "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(user_id)
    .bind(next.current_streak)
    .bind(next.longest_streak)
    .bind(next.last_study_date.map(|d| d.to_string()))
    .bind(next.total_study_days)
    .bind(now_iso())
    .execute(&mut **tx)
    .await?;

    Ok(next)
}

/// Forces the running streak to zero. `longestStreak` and
/// `lastStudyDate` keep their values.
pub async fn reset(pool: &SqlitePool, user_id: &str) -> Result<Streak, StreakError> {
    sqlx::query(
        r#"UPDATE "streaks" SET "currentStreak" = 0, "updatedAt" = $1 WHERE "userId" = $2"#,
    )
    .bind(now_iso())
    .bind(user_id)
    .execute(pool)
    .await?;

    get_streak(pool, user_id).await
}

pub async fn get_streak(pool: &SqlitePool, user_id: &str) -> Result<Streak, StreakError> {
    let row = sqlx::query(
        r#"
        SELECT "userId","currentStreak","longestStreak","lastStudyDate","totalStudyDays"
        FROM "streaks"
        WHERE "userId" = $1
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row
        .as_ref()
        .map(map_row)
        .unwrap_or_else(|| Streak::empty(user_id)))
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Streak {
    let last_raw: Option<String> = row.try_get("lastStudyDate").ok().flatten();

    Streak {
        user_id: row.try_get("userId").unwrap_or_default(),
        current_streak: row.try_get("currentStreak").unwrap_or(0),
        longest_streak: row.try_get("longestStreak").unwrap_or(0),
        last_study_date: last_raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        total_study_days: row.try_get("totalStudyDays").unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn run(dates: &[&str]) -> Streak {
        let mut streak = Streak::empty("u1");
        for d in dates {
            streak = advance(&streak, date(d));
        }
        streak
    }

    #[test]
    fn first_activity_starts_streak() {
        let s = run(&["2024-01-01"]);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 1);
        assert_eq!(s.total_study_days, 1);
        assert_eq!(s.last_study_date, Some(date("2024-01-01")));
    }

    #[test]
    fn three_consecutive_days_build_streak_of_three() {
        let s = run(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(s.current_streak, 3);
        assert_eq!(s.longest_streak, 3);
        assert_eq!(s.total_study_days, 3);
    }

    #[test]
    fn gap_breaks_streak_but_keeps_longest() {
        let s = run(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-08"]);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 3);
        assert_eq!(s.total_study_days, 4);
    }

    #[test]
    fn same_day_activity_is_a_no_op() {
        let once = run(&["2024-01-01", "2024-01-02"]);
        let twice = run(&["2024-01-01", "2024-01-02", "2024-01-02"]);
        assert_eq!(once.current_streak, twice.current_streak);
        assert_eq!(once.total_study_days, twice.total_study_days);
        assert_eq!(once.last_study_date, twice.last_study_date);
    }

    #[test]
    fn backfilled_date_only_counts_a_study_day() {
        let s = run(&["2024-01-05", "2024-01-06", "2024-01-02"]);
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.longest_streak, 2);
        assert_eq!(s.last_study_date, Some(date("2024-01-06")));
        assert_eq!(s.total_study_days, 3);
    }

    #[test]
    fn longest_never_below_current() {
        let s = run(&[
            "2024-01-01",
            "2024-01-02",
            "2024-01-05",
            "2024-01-06",
            "2024-01-07",
        ]);
        assert!(s.longest_streak >= s.current_streak);
        assert_eq!(s.current_streak, 3);
        assert_eq!(s.longest_streak, 3);
    }
}
