//! Owner-scoped query and mutation surface.
//!
//! Every operation takes the caller identity injected by the token gate.
//! Rename and delete require the caller to own the record; content edits
//! only check ownership when a caller is supplied (see
//! `server.protect_content_update`).

use tracing::{info, warn};

use docvault_core::models::{Document, DocumentQuery};
use docvault_core::store::DocumentStore;
use docvault_core::{VaultError, VaultResult};

pub async fn search(
    documents: &dyn DocumentStore,
    caller_id: &str,
    query: &DocumentQuery,
) -> VaultResult<Vec<Document>> {
    documents.search_documents(caller_id, query).await
}

/// Loads a document and checks that `caller_id` owns it.
async fn owned_document(
    documents: &dyn DocumentStore,
    caller_id: &str,
    id: &str,
    action: &str,
) -> VaultResult<Document> {
    let doc = documents
        .find_document(id)
        .await?
        .ok_or_else(|| VaultError::NotFound("PDF not found.".to_string()))?;
    if !doc.is_owned_by(caller_id) {
        warn!(document_id = %id, caller_id = %caller_id, action, "non-owner mutation rejected");
        return Err(VaultError::Forbidden(format!(
            "Unauthorized to {} this PDF.",
            action
        )));
    }
    Ok(doc)
}

pub async fn rename(
    documents: &dyn DocumentStore,
    caller_id: &str,
    id: &str,
    new_filename: &str,
) -> VaultResult<Document> {
    if new_filename.trim().is_empty() {
        return Err(VaultError::Validation(
            "New filename is required".to_string(),
        ));
    }
    let mut doc = owned_document(documents, caller_id, id, "rename").await?;

    if documents.update_filename(id, new_filename).await? == 0 {
        return Err(VaultError::NotFound(
            "No documents matched the query.".to_string(),
        ));
    }
    info!(document_id = %id, from = %doc.filename, to = %new_filename, "document renamed");
    doc.filename = new_filename.to_string();
    Ok(doc)
}

pub async fn delete(documents: &dyn DocumentStore, caller_id: &str, id: &str) -> VaultResult<()> {
    owned_document(documents, caller_id, id, "delete").await?;

    // Zero here means a concurrent delete won the race.
    match documents.delete_document(id).await? {
        0 => Err(VaultError::NotFound(
            "No documents matched the query.".to_string(),
        )),
        _ => {
            info!(document_id = %id, "document deleted");
            Ok(())
        }
    }
}

/// Replaces a document's content.
///
/// With `caller_id == None` no ownership check is made; that mode exists
/// only for the unprotected `PUT /update/{id}` route.
pub async fn update_content(
    documents: &dyn DocumentStore,
    caller_id: Option<&str>,
    id: &str,
    content: &str,
) -> VaultResult<Document> {
    if let Some(caller_id) = caller_id {
        owned_document(documents, caller_id, id, "edit").await?;
    }
    documents
        .update_content(id, content)
        .await?
        .ok_or_else(|| VaultError::NotFound("PDF not found.".to_string()))
}
