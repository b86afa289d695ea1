//! Docflow document workflow
//!
//! Document catalog and sharing workflow: uploaded files are written to an
//! object store and catalogued, owners fan a document out to recipients as
//! tracked assignments, and teardown removes the blob and its record.
//!
//! # Features
//! - Ingestion with metadata validation and time-limited read capabilities
//! - Atomic share fan-out (assignments plus document update in one batch)
//! - Teardown that tolerates blobs already removed
//! - MongoDB and in-memory catalogs, filesystem and in-memory object stores
//! - axum routes for the whole workflow

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

pub use config::DocflowConfig;
pub use db::MongoDb;
pub use error::{DocflowError, DocflowResult};
pub use services::DocumentWorkflow;

/// Verified caller identity, supplied by the upstream identity provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl CallerIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.subject
    }

    /// Human-facing identity: email, then display name
    pub fn display_identity(&self) -> Option<&str> {
        [self.email.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}
