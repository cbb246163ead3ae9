use sqlx::SqlitePool;

pub const SCHEMA_VERSION: &str = "1.0.0";

pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Splits the schema file on `;`, dropping `--` comment lines. The DDL
/// contains no string literals with embedded semicolons, so a line-based
/// split is sufficient.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let without_comments: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for stmt in split_sql_statements(SCHEMA_SQL) {
        sqlx::query(&stmt).execute(pool).await?;
    }

    sqlx::query(
        r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', $1)"#,
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    Ok(())
}
