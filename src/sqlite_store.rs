//! SQLite-backed [`UserStore`] and [`DocumentStore`] implementation.
//!
//! Timestamps are stored as Unix milliseconds. Uniqueness of usernames and
//! of `(owner_id, filename)` is enforced by the schema; violations surface
//! as [`VaultError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docvault_core::models::{Document, DocumentQuery, User};
use docvault_core::store::{DocumentStore, UserStore};
use docvault_core::{VaultError, VaultResult};

/// SQLite implementation of the repository traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const DUPLICATE_FILENAME: &str = "A file with this filename already exists.";

fn storage_error(err: sqlx::Error) -> VaultError {
    VaultError::Internal(format!("storage error: {}", err))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: from_millis(row.get("created_at")),
    }
}

fn document_from_row(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        filename: row.get("filename"),
        owner_id: row.get("owner_id"),
        uploaded_at: from_millis(row.get("uploaded_at")),
    }
}

const DOCUMENT_COLUMNS: &str = "id, title, content, filename, owner_id, uploaded_at";

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, user: &User) -> VaultResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                VaultError::Conflict(format!("username already exists: {}", user.username))
            } else {
                storage_error(e)
            }
        })?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> VaultResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: &str) -> VaultResult<Option<User>> {
        let row =
            sqlx::query("SELECT id, username, password_hash, created_at FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create_document(&self, doc: &Document) -> VaultResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, title, content, filename, owner_id, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(&doc.filename)
        .bind(&doc.owner_id)
        .bind(doc.uploaded_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                VaultError::Conflict(DUPLICATE_FILENAME.to_string())
            } else {
                storage_error(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_owner_and_filename(
        &self,
        owner_id: &str,
        filename: &str,
    ) -> VaultResult<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE owner_id = ? AND filename = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(owner_id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn find_document(&self, id: &str) -> VaultResult<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn update_content(&self, id: &str, content: &str) -> VaultResult<Option<Document>> {
        let result = sqlx::query("UPDATE documents SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_document(id).await
    }

    async fn update_filename(&self, id: &str, filename: &str) -> VaultResult<u64> {
        let result = sqlx::query("UPDATE documents SET filename = ? WHERE id = ?")
            .bind(filename)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    VaultError::Conflict(DUPLICATE_FILENAME.to_string())
                } else {
                    storage_error(e)
                }
            })?;
        Ok(result.rows_affected())
    }

    async fn delete_document(&self, id: &str) -> VaultResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn search_documents(
        &self,
        owner_id: &str,
        query: &DocumentQuery,
    ) -> VaultResult<Vec<Document>> {
        // Substring matching happens in `DocumentQuery::apply` so both
        // stores fold case the same way (SQLite's lower() is ASCII-only).
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE owner_id = ? ORDER BY uploaded_at DESC, rowid DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let docs = rows.iter().map(document_from_row).collect();
        Ok(query.apply(docs))
    }
}
