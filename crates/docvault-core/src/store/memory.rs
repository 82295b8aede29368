//! In-memory [`UserStore`] and [`DocumentStore`] implementation.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Uniqueness checks run under the
//! write lock, so concurrent creates with the same key cannot both succeed.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{VaultError, VaultResult};
use crate::models::{Document, DocumentQuery, User};

use super::{DocumentStore, UserStore};

/// In-memory store for tests and embedding.
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    // insertion order; newest last
    docs: RwLock<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: &User) -> VaultResult<()> {
        let mut users = self.users.write().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(VaultError::Conflict(format!(
                "username already exists: {}",
                user.username
            )));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> VaultResult<Option<User>> {
        let users = self.users.read().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> VaultResult<Option<User>> {
        let users = self.users.read().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create_document(&self, doc: &Document) -> VaultResult<()> {
        let mut docs = self.docs.write().unwrap();
        if docs
            .iter()
            .any(|d| d.owner_id == doc.owner_id && d.filename == doc.filename)
        {
            return Err(VaultError::Conflict(
                "A file with this filename already exists.".to_string(),
            ));
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn find_by_owner_and_filename(
        &self,
        owner_id: &str,
        filename: &str,
    ) -> VaultResult<Option<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .iter()
            .find(|d| d.owner_id == owner_id && d.filename == filename)
            .cloned())
    }

    async fn find_document(&self, id: &str) -> VaultResult<Option<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn update_content(&self, id: &str, content: &str) -> VaultResult<Option<Document>> {
        let mut docs = self.docs.write().unwrap();
        Ok(docs.iter_mut().find(|d| d.id == id).map(|d| {
            d.content = content.to_string();
            d.clone()
        }))
    }

    async fn update_filename(&self, id: &str, filename: &str) -> VaultResult<u64> {
        let mut docs = self.docs.write().unwrap();
        let owner_id = match docs.iter().find(|d| d.id == id) {
            Some(d) => d.owner_id.clone(),
            None => return Ok(0),
        };
        if docs
            .iter()
            .any(|d| d.id != id && d.owner_id == owner_id && d.filename == filename)
        {
            return Err(VaultError::Conflict(
                "A file with this filename already exists.".to_string(),
            ));
        }
        let mut matched = 0;
        for d in docs.iter_mut().filter(|d| d.id == id) {
            d.filename = filename.to_string();
            matched += 1;
        }
        Ok(matched)
    }

    async fn delete_document(&self, id: &str) -> VaultResult<u64> {
        let mut docs = self.docs.write().unwrap();
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok((before - docs.len()) as u64)
    }

    async fn search_documents(
        &self,
        owner_id: &str,
        query: &DocumentQuery,
    ) -> VaultResult<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        let mut owned: Vec<Document> = docs
            .iter()
            .rev()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(query.apply(owned))
    }
}
