//! Read access: owner listing and capability re-issue

use super::DocumentWorkflow;
use crate::error::{DocflowError, DocflowResult};
use crate::models::DocumentSummary;
use crate::storage::Capability;
use crate::CallerIdentity;

impl DocumentWorkflow {
    /// The caller's documents, newest first
    pub async fn list_owned(&self, owner: &CallerIdentity) -> DocflowResult<Vec<DocumentSummary>> {
        let docs = self
            .catalog
            .list_documents_by_owner(owner.as_str(), self.config.list_limit)
            .await?;
        Ok(docs.into_iter().map(DocumentSummary::from).collect())
    }

    /// Mint a fresh read link for the owner or a recipient.
    ///
    /// The stored document is left untouched.
    pub async fn issue_capability(
        &self,
        document_id: &str,
        caller: &CallerIdentity,
    ) -> DocflowResult<Capability> {
        let doc = self
            .catalog
            .get_document(document_id)
            .await?
            .ok_or_else(|| DocflowError::NotFound(document_id.to_string()))?;

        if !doc.is_readable_by(caller.as_str()) {
            return Err(DocflowError::Forbidden {
                action: "read it".to_string(),
            });
        }

        self.objects
            .mint_read_capability(&doc.storage_path, self.config.capability_ttl())
            .await
            .map_err(DocflowError::capability_mint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentMetadata, ShareRequest};
    use crate::services::testing::{harness, owner};
    use crate::services::Upload;

    #[tokio::test]
    async fn test_list_owned_newest_first() {
        let h = harness();
        let mut ids = Vec::new();
        for title in ["First", "Second"] {
            let id = h
                .workflow
                .ingest(
                    Upload::new(vec![1], "a.txt"),
                    DocumentMetadata::new(title, "Finance"),
                    &owner(),
                )
                .await
                .unwrap();
            ids.push(id);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        h.workflow
            .ingest(
                Upload::new(vec![1], "b.txt"),
                DocumentMetadata::new("Other", "Finance"),
                &CallerIdentity::new("U2"),
            )
            .await
            .unwrap();

        let listed = h.workflow.list_owned(&owner()).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
        assert_eq!(listed[0].etag, "W/\"0\"");
    }

    #[tokio::test]
    async fn test_recipient_can_reissue_capability() {
        let h = harness();
        let doc_id = h
            .workflow
            .ingest(
                Upload::new(vec![1], "plan.pdf"),
                DocumentMetadata::new("Plan", "Operations"),
                &owner(),
            )
            .await
            .unwrap();
        let stranger = CallerIdentity::new("E1");

        let err = h
            .workflow
            .issue_capability(&doc_id, &stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, DocflowError::Forbidden { .. }));

        h.workflow
            .share(
                &doc_id,
                ShareRequest::new("Engineering", vec!["E1".into()]),
                &owner(),
                None,
            )
            .await
            .unwrap();
        let before = h.catalog.document(&doc_id).unwrap();

        let capability = h.workflow.issue_capability(&doc_id, &stranger).await.unwrap();
        assert!(capability.url.contains("/api/blobs/documents/U1/"));

        let after = h.catalog.document(&doc_id).unwrap();
        assert_eq!(after.url, before.url);
        assert_eq!(after.revision, before.revision);
    }

    #[tokio::test]
    async fn test_reissue_missing_document() {
        let h = harness();
        let err = h
            .workflow
            .issue_capability("nope", &owner())
            .await
            .unwrap_err();
        assert!(matches!(err, DocflowError::NotFound(_)));
        assert_eq!(h.objects.mint_count(), 0);
    }
}
