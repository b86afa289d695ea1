//! Catalog store adapters
//!
//! Structured records (documents, employees, assignments) live in a document
//! database. The only multi-record write is the share batch, which must land
//! completely or not at all.

mod memory;
mod mongo;

pub use memory::MemoryCatalog;
pub use mongo::MongoCatalog;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Assignment, Document, Employee, SharingUpdate};

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{message}")]
    Provider {
        code: Option<String>,
        message: String,
    },

    #[error("Document {0} no longer exists")]
    DocumentGone(String),

    #[error("Revision mismatch: expected {expected}, found {current}")]
    RevisionMismatch { expected: i64, current: i64 },
}

impl CatalogError {
    pub fn provider_code(&self) -> Option<String> {
        match self {
            CatalogError::Provider { code, .. } => code.clone(),
            CatalogError::DocumentGone(_) => Some("NOT_FOUND".to_string()),
            CatalogError::RevisionMismatch { .. } => Some("REVISION_MISMATCH".to_string()),
        }
    }
}

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        let code = match err.kind.as_ref() {
            mongodb::error::ErrorKind::Command(cmd) => Some(cmd.code_name.clone()),
            mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(w)) => {
                Some(w.code.to_string())
            }
            _ => None,
        };
        CatalogError::Provider {
            code,
            message: err.to_string(),
        }
    }
}

/// All writes produced by one share call.
#[derive(Debug, Clone)]
pub struct ShareBatch {
    pub document_id: String,
    /// When set, the batch only commits if the stored revision still matches
    pub expected_revision: Option<i64>,
    pub assignments: Vec<Assignment>,
    pub sharing: SharingUpdate,
}

/// Structured document store
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a new document record and return its identifier.
    async fn insert_document(&self, doc: Document) -> CatalogResult<String>;

    async fn get_document(&self, id: &str) -> CatalogResult<Option<Document>>;

    /// Documents owned by `owner_uid`, newest first.
    async fn list_documents_by_owner(
        &self,
        owner_uid: &str,
        limit: i64,
    ) -> CatalogResult<Vec<Document>>;

    /// Returns whether a record was removed.
    async fn delete_document(&self, id: &str) -> CatalogResult<bool>;

    async fn get_employee(&self, id: &str) -> CatalogResult<Option<Employee>>;

    /// Atomically insert every assignment and apply the sharing update.
    /// Returns the assignment identifiers in batch order.
    async fn commit_share(&self, batch: ShareBatch) -> CatalogResult<Vec<String>>;

    async fn ping(&self) -> CatalogResult<()>;
}

/// Fresh record identifier (ObjectId hex, as the collections already use)
pub fn new_record_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}
