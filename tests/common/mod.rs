#![allow(dead_code)]

use axum::Router;
use sqlx::SqlitePool;
use tempfile::TempDir;

use studyplan_backend::db::Database;
use studyplan_backend::services::goal::{self, CreateGoalInput, Goal};

pub const TEST_USER: &str = "user-1";

/// Fresh migrated database backed by a temp file. Keep the TempDir alive
/// for the duration of the test or the file disappears under the pool.
pub async fn test_db() -> (TempDir, Database) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let db_path = dir.path().join("studyplan-test.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.display());

    let db = Database::connect(&url)
        .await
        .expect("failed to open test database");
    db.migrate().await.expect("failed to run migrations");

    (dir, db)
}

pub async fn create_test_app() -> (TempDir, Router) {
    let (dir, db) = test_db().await;
    (dir, studyplan_backend::create_app(db))
}

/// Seeds `count` catalog items `item-1..item-count` with levels cycling
/// 1..=3, and returns their ids.
pub async fn seed_items(pool: &SqlitePool, count: usize) -> Vec<String> {
    let mut ids = Vec::with_capacity(count);
    for i in 1..=count {
        let id = format!("item-{i}");
        sqlx::query(r#"INSERT INTO "items" ("id","term","level") VALUES ($1,$2,$3)"#)
            .bind(&id)
            .bind(format!("term-{i:04}"))
            .bind(((i - 1) % 3 + 1) as i64)
            .execute(pool)
            .await
            .expect("failed to seed item");
        ids.push(id);
    }
    ids
}

pub async fn seed_list(pool: &SqlitePool, list_id: &str, item_ids: &[String]) {
    sqlx::query(r#"INSERT INTO "item_lists" ("id","name") VALUES ($1,$2)"#)
        .bind(list_id)
        .bind(format!("list {list_id}"))
        .execute(pool)
        .await
        .expect("failed to seed list");

    for item_id in item_ids {
        sqlx::query(r#"INSERT INTO "item_list_entries" ("listId","itemId") VALUES ($1,$2)"#)
            .bind(list_id)
            .bind(item_id)
            .execute(pool)
            .await
            .expect("failed to seed list entry");
    }
}

pub async fn seed_set(pool: &SqlitePool, set_id: &str, item_ids: &[String]) {
    sqlx::query(r#"INSERT INTO "item_sets" ("id","name") VALUES ($1,$2)"#)
        .bind(set_id)
        .bind(format!("set {set_id}"))
        .execute(pool)
        .await
        .expect("failed to seed set");

    for item_id in item_ids {
        sqlx::query(r#"INSERT INTO "item_set_entries" ("setId","itemId") VALUES ($1,$2)"#)
            .bind(set_id)
            .bind(item_id)
            .execute(pool)
            .await
            .expect("failed to seed set entry");
    }
}

/// Seeds `count` items under a fresh list and creates a LIST goal over it.
pub async fn seed_list_goal(pool: &SqlitePool, count: usize) -> Goal {
    let item_ids = seed_items(pool, count).await;
    seed_list(pool, "list-1", &item_ids).await;

    goal::create_goal(
        pool,
        TEST_USER,
        CreateGoalInput {
            name: "test goal".to_string(),
            goal_type: "LIST".to_string(),
            list_id: Some("list-1".to_string()),
            set_id: None,
            level: None,
        },
    )
    .await
    .expect("failed to create goal")
}
