use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::services::corpus::{self, CorpusError};
use crate::services::goal::{self, GoalError};
use crate::services::mastery::{self, ItemProgressRecord, MasteryError};

/// Per-stage item counts for one goal's dashboard board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanBoard {
    pub goal_id: String,
    pub total_items: i64,
    pub review_1: i64,
    pub review_2: i64,
    pub review_3: i64,
    pub review_4: i64,
    pub review_5: i64,
    pub review_6: i64,
    pub mastered: i64,
    pub forgotten: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Review(u8),
    Mastered,
    Forgotten,
    Remaining,
}

#[derive(Debug, thiserror::Error)]
pub enum KanbanError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<MasteryError> for KanbanError {
    fn from(err: MasteryError) -> Self {
        match err {
            MasteryError::NotFound(msg) => Self::NotFound(msg),
            MasteryError::Corpus(e) => Self::Corpus(e),
            MasteryError::Sql(e) => Self::Sql(e),
        }
    }
}

impl From<GoalError> for KanbanError {
    fn from(err: GoalError) -> Self {
        match err {
            GoalError::NotFound(msg) => Self::NotFound(msg),
            GoalError::Sql(e) => Self::Sql(e),
            other => Self::NotFound(other.to_string()),
        }
    }
}

/// Classifies a single corpus item from its progress row, if any.
/// Every item lands in exactly one bucket.
pub fn classify(progress: Option<&ItemProgressRecord>) -> Bucket {
    match progress {
        Some(p) if p.is_mastered => Bucket::Mastered,
        Some(p) if p.is_forgotten => Bucket::Forgotten,
        Some(p) if p.review_count > 0 => Bucket::Review(p.review_count.min(6) as u8),
        _ => Bucket::Remaining,
    }
}

pub async fn board(
    pool: &SqlitePool,
    user_id: &str,
    goal_id: &str,
) -> Result<KanbanBoard, KanbanError> {
    let goal = goal::get_goal(pool, user_id, goal_id).await?;
    let item_ids = corpus::resolve(pool, &goal).await?;
    let progress: HashMap<String, ItemProgressRecord> =
        mastery::list_for_goal(pool, user_id, goal_id)
            .await?
            .into_iter()
            .map(|p| (p.item_id.clone(), p))
            .collect();

    let mut board = KanbanBoard {
        goal_id: goal_id.to_string(),
        total_items: item_ids.len() as i64,
        ..KanbanBoard::default()
    };

    for item_id in &item_ids {
        match classify(progress.get(item_id)) {
            Bucket::Review(1) => board.review_1 += 1,
            Bucket::Review(2) => board.review_2 += 1,
            Bucket::Review(3) => board.review_3 += 1,
            Bucket::Review(4) => board.review_4 += 1,
            Bucket::Review(5) => board.review_5 += 1,
            Bucket::Review(_) => board.review_6 += 1,
            Bucket::Mastered => board.mastered += 1,
            Bucket::Forgotten => board.forgotten += 1,
            Bucket::Remaining => board.remaining += 1,
        }
    }

    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(review_count: i64, mastered: bool, forgotten: bool) -> ItemProgressRecord {
        ItemProgressRecord {
            id: "p1".into(),
            user_id: "u1".into(),
            goal_id: "g1".into(),
            item_id: "w1".into(),
            review_count,
            last_review_at: None,
            is_mastered: mastered,
            is_forgotten: forgotten,
            mastered_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn untouched_item_is_remaining() {
        assert_eq!(classify(None), Bucket::Remaining);
        assert_eq!(classify(Some(&record(0, false, false))), Bucket::Remaining);
    }

    #[test]
    fn review_counts_map_to_stages() {
        assert_eq!(classify(Some(&record(1, false, false))), Bucket::Review(1));
        assert_eq!(classify(Some(&record(5, false, false))), Bucket::Review(5));
    }

    #[test]
    fn review_stage_caps_at_six() {
        assert_eq!(classify(Some(&record(9, false, false))), Bucket::Review(6));
    }

    #[test]
    fn mastered_wins_over_review_count() {
        assert_eq!(classify(Some(&record(6, true, false))), Bucket::Mastered);
    }

    #[test]
    fn forgotten_wins_over_review_count_but_not_mastered() {
        assert_eq!(classify(Some(&record(3, false, true))), Bucket::Forgotten);
        assert_eq!(classify(Some(&record(3, true, true))), Bucket::Mastered);
    }
}
