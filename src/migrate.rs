//! Idempotent schema creation.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // (owner_id, filename) is unique: the upload pre-check alone cannot
    // stop two concurrent uploads of the same name.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            filename TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            uploaded_at INTEGER NOT NULL,
            UNIQUE(owner_id, filename),
            FOREIGN KEY (owner_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_owner_uploaded ON documents(owner_id, uploaded_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
