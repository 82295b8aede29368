//! Records persisted by docvault and the query type used to list them.
//!
//! A [`User`] owns any number of [`Document`]s by reference (`owner_id`).
//! Documents serialize with camelCase keys, which is the shape returned by
//! `GET /search` and `PUT /update/{id}`.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VaultError;

/// Title given to every ingested document.
pub const DEFAULT_TITLE: &str = "Untitled PDF";

/// Registered account. The password is stored only as a PHC hash string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: now_millis(),
        }
    }
}

/// Text record derived from an uploaded PDF or DOCX file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub filename: String,
    pub owner_id: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Builds a fresh record with a new id, the default title, and the
    /// current time as upload timestamp.
    pub fn new(
        owner_id: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            content: content.into(),
            filename: filename.into(),
            owner_id: owner_id.into(),
            uploaded_at: now_millis(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// Current time truncated to millisecond precision, the resolution the
/// SQLite store persists.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Result ordering for document listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently uploaded first.
    #[default]
    Newest,
    /// Filename ascending, case-insensitive.
    Filename,
}

impl std::str::FromStr for SortOrder {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "uploaded" | "uploadDate" | "newest" => Ok(SortOrder::Newest),
            "filename" => Ok(SortOrder::Filename),
            other => Err(VaultError::Validation(format!(
                "unknown sort order: '{}'. Use uploaded or filename.",
                other
            ))),
        }
    }
}

/// Owner-scoped listing request.
///
/// `text` is matched case-insensitively as a substring of the filename or
/// the content. An empty string means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    text: Option<String>,
    pub sort: SortOrder,
}

impl DocumentQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(text: Option<&str>) -> Self {
        Self {
            text: text.filter(|t| !t.is_empty()).map(str::to_lowercase),
            sort: SortOrder::Newest,
        }
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match &self.text {
            None => true,
            Some(needle) => {
                doc.filename.to_lowercase().contains(needle.as_str())
                    || doc.content.to_lowercase().contains(needle.as_str())
            }
        }
    }

    /// Filters and orders an owner's documents.
    ///
    /// `docs` must already be ordered newest first; ties keep their input
    /// order because both sorts are stable.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if self.sort == SortOrder::Filename {
            out.sort_by_cached_key(|d| d.filename.to_lowercase());
        }
        out
    }
}
