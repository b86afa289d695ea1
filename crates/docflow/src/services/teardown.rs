//! Teardown: remove a document's blob, then its catalog record

use super::DocumentWorkflow;
use crate::error::{DocflowError, DocflowResult};
use crate::CallerIdentity;

impl DocumentWorkflow {
    /// Delete a document owned by the caller.
    ///
    /// A blob that is already gone counts as deleted. Any other storage
    /// failure aborts before the catalog record is touched.
    pub async fn teardown(&self, document_id: &str, caller: &CallerIdentity) -> DocflowResult<()> {
        let doc = self.load_owned(document_id, caller, "delete it").await?;

        if doc.storage_path.is_empty() {
            tracing::warn!("Document {} has no storage path", document_id);
        } else {
            self.objects
                .delete(&doc.storage_path, true)
                .await
                .map_err(DocflowError::storage_delete)?;
        }

        if !self.catalog.delete_document(document_id).await? {
            // Removed concurrently between the load and here.
            return Err(DocflowError::NotFound(document_id.to_string()));
        }

        tracing::info!(document_id = %document_id, "Deleted {}", doc.storage_path);
        Ok(())
    }
}
