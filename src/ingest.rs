//! Upload ingestion pipeline.
//!
//! upload → type check → duplicate pre-check → (DOCX conversion) → text
//! extraction → persist. The duplicate pre-check runs before any
//! extraction work; the storage layer's uniqueness constraint catches the
//! race between two concurrent uploads of the same filename.

use tracing::{info, warn};

use docvault_core::models::Document;
use docvault_core::store::DocumentStore;
use docvault_core::{VaultError, VaultResult};

use crate::config::IngestConfig;
use crate::convert::DocxConverter;
use crate::extract::{self, FileKind};

/// A single uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Ingestion settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct Ingestor {
    allow_docx: bool,
    converter: Option<DocxConverter>,
}

impl Ingestor {
    pub fn new(allow_docx: bool, converter: Option<DocxConverter>) -> Self {
        Self {
            allow_docx,
            converter,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.allow_docx,
            config.docx_converter.clone().map(DocxConverter::new),
        )
    }

    /// Turns an upload into a stored [`Document`] owned by `owner_id`.
    pub async fn ingest(
        &self,
        documents: &dyn DocumentStore,
        owner_id: &str,
        upload: Option<Upload>,
    ) -> VaultResult<Document> {
        let upload = upload.ok_or_else(|| VaultError::Validation("No file uploaded.".to_string()))?;
        if upload.filename.trim().is_empty() {
            return Err(VaultError::Validation(
                "Uploaded file has no filename.".to_string(),
            ));
        }

        let kind = FileKind::detect(upload.content_type.as_deref(), &upload.filename)
            .filter(|k| *k == FileKind::Pdf || self.allow_docx)
            .ok_or_else(|| {
                VaultError::Validation(format!(
                    "unsupported file type: {}",
                    upload.content_type.as_deref().unwrap_or("unknown")
                ))
            })?;

        if documents
            .find_by_owner_and_filename(owner_id, &upload.filename)
            .await?
            .is_some()
        {
            warn!(owner_id = %owner_id, filename = %upload.filename, "duplicate upload rejected");
            return Err(VaultError::Conflict(
                "A file with this filename already exists.".to_string(),
            ));
        }

        let content = self.extract(kind, upload.bytes).await?;
        let doc = Document::new(owner_id, upload.filename, content);
        documents.create_document(&doc).await?;

        info!(
            document_id = %doc.id,
            owner_id = %owner_id,
            filename = %doc.filename,
            mime = kind.mime(),
            chars = doc.content.len(),
            "document ingested"
        );
        Ok(doc)
    }

    async fn extract(&self, kind: FileKind, bytes: Vec<u8>) -> VaultResult<String> {
        let (bytes, kind) = match (kind, &self.converter) {
            (FileKind::Docx, Some(converter)) => (converter.convert(&bytes).await?, FileKind::Pdf),
            _ => (bytes, kind),
        };

        tokio::task::spawn_blocking(move || extract::extract_text(&bytes, kind))
            .await
            .map_err(|e| VaultError::Upstream(format!("Failed to process PDF: extraction aborted: {}", e)))?
            .map_err(|e| VaultError::Upstream(format!("Failed to process PDF: {}", e)))
    }
}
