//! Repository abstraction for docvault.
//!
//! [`UserStore`] and [`DocumentStore`] define every storage operation the
//! service layer needs. Handlers receive them as trait objects constructed
//! once at startup, so the SQLite backend and [`memory::InMemoryStore`] are
//! interchangeable.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::VaultResult;
use crate::models::{Document, DocumentQuery, User};

/// Credential storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user. Fails with `Conflict` if the username is taken.
    async fn create_user(&self, user: &User) -> VaultResult<()>;

    async fn find_user_by_username(&self, username: &str) -> VaultResult<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> VaultResult<Option<User>>;
}

/// Document storage.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_document`](DocumentStore::create_document) | Insert a new record |
/// | [`find_by_owner_and_filename`](DocumentStore::find_by_owner_and_filename) | Duplicate pre-check |
/// | [`find_document`](DocumentStore::find_document) | Lookup by id |
/// | [`update_content`](DocumentStore::update_content) | Replace the content field |
/// | [`update_filename`](DocumentStore::update_filename) | Replace the filename field |
/// | [`delete_document`](DocumentStore::delete_document) | Remove a record |
/// | [`search_documents`](DocumentStore::search_documents) | Owner-scoped filtered listing |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document.
    ///
    /// Fails with `Conflict` if the owner already has a document with the
    /// same filename.
    async fn create_document(&self, doc: &Document) -> VaultResult<()>;

    async fn find_by_owner_and_filename(
        &self,
        owner_id: &str,
        filename: &str,
    ) -> VaultResult<Option<Document>>;

    async fn find_document(&self, id: &str) -> VaultResult<Option<Document>>;

    /// Replaces the content of a document and returns the updated record,
    /// or `None` if no document has this id.
    async fn update_content(&self, id: &str, content: &str) -> VaultResult<Option<Document>>;

    /// Replaces the filename of a document. Returns the number of matched
    /// records (0 or 1).
    async fn update_filename(&self, id: &str, filename: &str) -> VaultResult<u64>;

    /// Deletes a document. Returns the number of removed records (0 or 1).
    async fn delete_document(&self, id: &str) -> VaultResult<u64>;

    /// Returns the owner's documents that satisfy `query`, in the query's
    /// sort order.
    async fn search_documents(
        &self,
        owner_id: &str,
        query: &DocumentQuery,
    ) -> VaultResult<Vec<Document>>;
}
