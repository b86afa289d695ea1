//! Services module - business logic layer
//!
//! [`DocumentWorkflow`] owns handles to both stores and runs ingestion,
//! sharing fan-out, teardown and capability re-issue against them. Store
//! clients are constructed once at startup and injected here.

mod access;
mod ingest;
mod share;
mod teardown;

pub use ingest::{storage_path_for, Upload};

use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::DocflowConfig;
use crate::error::{DocflowError, DocflowResult};
use crate::models::Document;
use crate::storage::ObjectStore;
use crate::CallerIdentity;

/// Document lifecycle and sharing workflow
#[derive(Clone)]
pub struct DocumentWorkflow {
    objects: Arc<dyn ObjectStore>,
    catalog: Arc<dyn CatalogStore>,
    config: DocflowConfig,
}

impl DocumentWorkflow {
    pub fn new(objects: Arc<dyn ObjectStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self::with_config(objects, catalog, DocflowConfig::default())
    }

    pub fn with_config(
        objects: Arc<dyn ObjectStore>,
        catalog: Arc<dyn CatalogStore>,
        config: DocflowConfig,
    ) -> Self {
        Self {
            objects,
            catalog,
            config,
        }
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn config(&self) -> &DocflowConfig {
        &self.config
    }

    /// Load a document and require the caller to own it.
    async fn load_owned(
        &self,
        document_id: &str,
        caller: &CallerIdentity,
        action: &str,
    ) -> DocflowResult<Document> {
        let doc = self
            .catalog
            .get_document(document_id)
            .await?
            .ok_or_else(|| DocflowError::NotFound(document_id.to_string()))?;

        if !doc.is_owned_by(caller.as_str()) {
            return Err(DocflowError::Forbidden {
                action: action.to_string(),
            });
        }
        Ok(doc)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::models::Employee;
    use crate::storage::{CapabilitySigner, MemoryObjectStore};

    pub(crate) struct Harness {
        pub objects: Arc<MemoryObjectStore>,
        pub catalog: Arc<MemoryCatalog>,
        pub workflow: DocumentWorkflow,
    }

    pub(crate) fn signer() -> CapabilitySigner {
        CapabilitySigner::new("test-secret", "http://localhost:8080").unwrap()
    }

    pub(crate) fn harness() -> Harness {
        let objects = Arc::new(MemoryObjectStore::new(signer()));
        let catalog = Arc::new(MemoryCatalog::new());
        for (id, name, dept) in [
            ("E1", "Asha Rao", "Engineering"),
            ("E2", "Ravi Menon", "Engineering"),
            ("E3", "Lena Park", "Finance"),
        ] {
            catalog.put_employee(Employee::new(id, name, dept));
        }
        let workflow = DocumentWorkflow::new(objects.clone(), catalog.clone());
        Harness {
            objects,
            catalog,
            workflow,
        }
    }

    pub(crate) fn owner() -> CallerIdentity {
        CallerIdentity::new("U1").with_email("u1@example.org")
    }
}
