//! Property tests for the pure scheduling, streak and kanban math.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use studyplan_backend::services::kanban::{classify, Bucket};
use studyplan_backend::services::mastery::ItemProgressRecord;
use studyplan_backend::services::plan::{count_study_days, daily_target_for, PlanMode};
use studyplan_backend::services::streak::{advance, Streak};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..=365).prop_map(|(year, ordinal)| {
        NaiveDate::from_yo_opt(year, ordinal)
            .unwrap_or_else(|| NaiveDate::from_yo_opt(year, 1).unwrap())
    })
}

fn arb_progress_row() -> impl Strategy<Value = Option<ItemProgressRecord>> {
    proptest::option::of((0i64..12, any::<bool>(), any::<bool>()).prop_map(
        |(review_count, is_mastered, is_forgotten)| ItemProgressRecord {
            id: String::new(),
            user_id: "u1".to_string(),
            goal_id: "g1".to_string(),
            item_id: String::new(),
            review_count,
            last_review_at: None,
            is_mastered,
            is_forgotten,
            mastered_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        },
    ))
}

fn arb_mode() -> impl Strategy<Value = PlanMode> {
    prop_oneof![
        Just(PlanMode::Fixed),
        Just(PlanMode::Adaptive),
        Just(PlanMode::Workdays),
        Just(PlanMode::Weekends),
    ]
}

proptest! {
    #[test]
    fn target_is_positive_while_items_remain(
        mode in arb_mode(),
        total in 1i64..10_000,
        learned in 0i64..10_000,
        start in arb_date(),
        span in 1i64..720,
        today_offset in -30i64..750,
    ) {
        let end = start + Duration::days(span);
        let today = start + Duration::days(today_offset);
        let learned = learned.min(total);
        let target = daily_target_for(mode, total, learned, start, end, today);

        if total - learned > 0 && mode != PlanMode::Fixed {
            prop_assert!(target >= 1);
        }
        if mode == PlanMode::Fixed {
            prop_assert!(target >= 1);
        }
        prop_assert!(target >= 0);
    }

    #[test]
    fn target_is_zero_once_nothing_remains(
        mode in arb_mode(),
        total in 0i64..10_000,
        start in arb_date(),
        span in 1i64..720,
    ) {
        let end = start + Duration::days(span);
        if mode != PlanMode::Fixed {
            let target = daily_target_for(mode, total, total, start, end, start);
            prop_assert_eq!(target, 0);
        }
    }

    #[test]
    fn fixed_mode_covers_the_whole_corpus(
        total in 1i64..10_000,
        start in arb_date(),
        span in 1i64..720,
    ) {
        let end = start + Duration::days(span);
        let total_days = span + 1;
        let target = daily_target_for(PlanMode::Fixed, total, 0, start, end, start);
        prop_assert!(target * total_days >= total);
    }

    #[test]
    fn adaptive_mode_covers_everything_remaining(
        total in 1i64..10_000,
        learned in 0i64..10_000,
        start in arb_date(),
        span in 1i64..720,
        today_offset in 0i64..720,
    ) {
        let end = start + Duration::days(span);
        let today = start + Duration::days(today_offset.min(span));
        let learned = learned.min(total);
        let remaining = total - learned;

        let target = daily_target_for(PlanMode::Adaptive, total, learned, start, end, today);
        let remaining_days = (end - today).num_days() + 1;
        prop_assert!(target * remaining_days >= remaining);
    }

    #[test]
    fn workdays_and_weekends_partition_the_calendar(
        start in arb_date(),
        span in 0i64..720,
    ) {
        let end = start + Duration::days(span);
        let workdays = count_study_days(PlanMode::Workdays, start, end);
        let weekends = count_study_days(PlanMode::Weekends, start, end);
        prop_assert_eq!(workdays + weekends, span + 1);
    }

    #[test]
    fn streak_invariants_hold_under_any_activity(
        user_days in proptest::collection::vec(arb_date(), 1..50),
    ) {
        let mut streak = Streak {
            user_id: "u1".to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            total_study_days: 0,
        };

        for (i, date) in user_days.iter().enumerate() {
            let next = advance(&streak, *date);

            prop_assert!(next.longest_streak >= next.current_streak);
            prop_assert!(next.longest_streak >= streak.longest_streak);
            prop_assert!(next.total_study_days >= streak.total_study_days);
            prop_assert!(next.total_study_days <= streak.total_study_days + 1);
            prop_assert!(next.total_study_days <= (i as i64) + 1);

            streak = next;
        }
    }

    #[test]
    fn every_item_lands_in_exactly_one_bucket(
        rows in proptest::collection::vec(arb_progress_row(), 0..200),
    ) {
        // review_1..review_6, mastered, forgotten, remaining
        let mut counts = [0i64; 9];

        for row in &rows {
            match classify(row.as_ref()) {
                Bucket::Review(stage) => {
                    prop_assert!((1..=6).contains(&stage));
                    counts[(stage - 1) as usize] += 1;
                }
                Bucket::Mastered => counts[6] += 1,
                Bucket::Forgotten => counts[7] += 1,
                Bucket::Remaining => counts[8] += 1,
            }
        }

        prop_assert_eq!(counts.iter().sum::<i64>(), rows.len() as i64);
    }

    #[test]
    fn consecutive_days_always_extend(
        start in arb_date(),
        len in 1i64..100,
    ) {
        let mut streak = Streak {
            user_id: "u1".to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
            total_study_days: 0,
        };

        for offset in 0..len {
            streak = advance(&streak, start + Duration::days(offset));
        }

        prop_assert_eq!(streak.current_streak, len);
        prop_assert_eq!(streak.longest_streak, len);
        prop_assert_eq!(streak.total_study_days, len);
    }
}
