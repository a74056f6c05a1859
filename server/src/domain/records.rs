//! Records domain - DB queries for the records table
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct InsertedRecord {
    id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CountResult {
    count: i64,
}

/// Create the records table if it does not exist yet
pub async fn ensure_schema<'e, E>(executor: E) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id BIGSERIAL PRIMARY KEY,
            value TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// Insert a record and return its id
pub async fn insert_record<'e, E>(executor: E, value: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result: InsertedRecord = sqlx::query_as(
        r#"
        INSERT INTO records (value)
        VALUES ($1)
        RETURNING id
        "#,
    )
    .bind(value)
    .fetch_one(executor)
    .await?;

    Ok(result.id)
}

pub async fn get_record<'e, E>(executor: E, id: i64) -> Result<Option<Record>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, value, created_at FROM records WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn count_records<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result: CountResult = sqlx::query_as("SELECT COUNT(*) as count FROM records")
        .fetch_one(executor)
        .await?;

    Ok(result.count)
}
