mod common;

use common::TEST_USER;
use studyplan_backend::services::mastery;

#[tokio::test]
async fn six_reviews_promote_to_mastered() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    let mut last = None;
    for _ in 0..6 {
        last = Some(
            mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
                .await
                .expect("review failed"),
        );
    }

    let progress = last.unwrap();
    assert_eq!(progress.review_count, 6);
    assert!(progress.is_mastered);
    assert!(progress.mastered_at.is_some());
    assert!(progress.last_review_at.is_some());
}

#[tokio::test]
async fn five_reviews_are_not_enough() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    let mut last = None;
    for _ in 0..5 {
        last = Some(
            mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
                .await
                .expect("review failed"),
        );
    }

    let progress = last.unwrap();
    assert_eq!(progress.review_count, 5);
    assert!(!progress.is_mastered);
    assert!(progress.mastered_at.is_none());
}

#[tokio::test]
async fn mastered_at_is_stamped_only_once() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    for _ in 0..6 {
        mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
            .await
            .expect("review failed");
    }
    let first = mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
        .await
        .expect("review failed");
    let second = mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
        .await
        .expect("review failed");

    assert_eq!(first.mastered_at, second.mastered_at);
    assert_eq!(second.review_count, 8);
}

#[tokio::test]
async fn mark_mastered_short_circuits_reviews() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    let progress = mastery::mark_mastered(db.pool(), TEST_USER, &goal.id, "item-2")
        .await
        .expect("mark_mastered failed");

    assert!(progress.is_mastered);
    assert_eq!(progress.review_count, 0);
}

#[tokio::test]
async fn forgetting_clears_mastery_but_keeps_count() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    for _ in 0..6 {
        mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
            .await
            .expect("review failed");
    }

    let progress = mastery::mark_forgotten(db.pool(), TEST_USER, &goal.id, "item-1")
        .await
        .expect("mark_forgotten failed");

    assert!(progress.is_forgotten);
    assert!(!progress.is_mastered);
    assert!(progress.mastered_at.is_none());
    assert_eq!(progress.review_count, 6);
}

#[tokio::test]
async fn reset_returns_item_to_untouched() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    for _ in 0..6 {
        mastery::review(db.pool(), TEST_USER, &goal.id, "item-1")
            .await
            .expect("review failed");
    }

    let progress = mastery::reset(db.pool(), TEST_USER, &goal.id, "item-1")
        .await
        .expect("reset failed");

    assert_eq!(progress.review_count, 0);
    assert!(!progress.is_mastered);
    assert!(!progress.is_forgotten);
    assert!(progress.last_review_at.is_none());
    assert!(progress.mastered_at.is_none());
}

#[tokio::test]
async fn progress_counts_only_mastered_corpus_items() {
    let (_dir, db) = common::test_db().await;
    let goal = common::seed_list_goal(db.pool(), 10).await;

    mastery::mark_mastered(db.pool(), TEST_USER, &goal.id, "item-1")
        .await
        .expect("mark_mastered failed");
    mastery::mark_mastered(db.pool(), TEST_USER, &goal.id, "item-2")
        .await
        .expect("mark_mastered failed");
    // Progress on an item outside the corpus never counts.
    mastery::mark_mastered(db.pool(), TEST_USER, &goal.id, "item-off-corpus")
        .await
        .expect("mark_mastered failed");

    let counts = mastery::progress(db.pool(), TEST_USER, &goal)
        .await
        .expect("progress failed");

    assert_eq!(counts.total_count, 10);
    assert_eq!(counts.learned_count, 2);
}
