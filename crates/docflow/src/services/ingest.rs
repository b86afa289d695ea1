//! Ingestion: uploaded file plus metadata into a catalogued document

use chrono::{DateTime, Utc};

use super::DocumentWorkflow;
use crate::catalog::new_record_id;
use crate::error::{DocflowError, DocflowResult};
use crate::models::{Document, DocumentMetadata};
use crate::CallerIdentity;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Binary payload as delivered by the upload transport
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Option<Vec<u8>>,
    pub file_name: String,
    /// Declared content type; guessed from the file name when absent
    pub mime_type: Option<String>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: Some(bytes),
            file_name: file_name.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    fn content_type(&self) -> String {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_raw()
                    .unwrap_or(FALLBACK_MIME)
                    .to_string()
            })
    }
}

/// Object path for an upload: `documents/{owner}/{millis}_{unique}_{file name}`.
///
/// `unique` must differ per blob; the timestamp alone repeats for uploads of
/// the same file name landing in one millisecond.
pub fn storage_path_for(
    owner_uid: &str,
    at: DateTime<Utc>,
    unique: &str,
    file_name: &str,
) -> String {
    format!(
        "documents/{}/{}_{}_{}",
        path_component(owner_uid, "owner"),
        at.timestamp_millis(),
        path_component(unique, "blob"),
        path_component(file_name, "file")
    )
}

fn path_component(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

impl DocumentWorkflow {
    /// Validate, store the blob, mint its read capability, then catalog it.
    /// Returns the new document identifier.
    pub async fn ingest(
        &self,
        upload: Upload,
        metadata: DocumentMetadata,
        owner: &CallerIdentity,
    ) -> DocflowResult<String> {
        let metadata = metadata.into_validated()?;

        let content_type = upload.content_type();
        let bytes = upload.bytes.ok_or(DocflowError::MissingPayload)?;
        if bytes.len() > self.config.max_upload_bytes {
            return Err(DocflowError::PayloadTooLarge {
                size: bytes.len(),
                max: self.config.max_upload_bytes,
            });
        }

        let now = Utc::now();
        let file_size = bytes.len() as i64;
        let storage_path =
            storage_path_for(owner.as_str(), now, &new_record_id(), &upload.file_name);

        tracing::debug!("Writing blob {} ({} bytes)", storage_path, file_size);
        self.objects
            .put(&storage_path, bytes, &content_type)
            .await
            .map_err(DocflowError::storage_write)?;

        let capability = match self
            .objects
            .mint_read_capability(&storage_path, self.config.capability_ttl())
            .await
        {
            Ok(capability) => capability,
            Err(e) => {
                tracing::warn!("Blob {} left unreferenced: capability mint failed", storage_path);
                return Err(DocflowError::capability_mint(e));
            }
        };

        let doc = Document {
            id: None,
            owner_uid: owner.as_str().to_string(),
            title: metadata.title,
            sector: metadata.sector,
            project_id: metadata.project_id,
            tags: metadata.tags.unwrap_or_default(),
            document_type: metadata.document_type,
            language: metadata.language,
            urgency: metadata.urgency,
            target_department: metadata.target_department,
            description: metadata.description,
            storage_path: storage_path.clone(),
            mime_type: content_type,
            file_name: upload.file_name,
            file_size,
            url: capability.url,
            url_expires_at: capability.expires_at,
            created_at: now,
            revision: 0,
            shared_with: None,
            shared_department: None,
            shared_at: None,
            shared_by: None,
        };

        let id = match self.catalog.insert_document(doc).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    "Blob {} left unreferenced: catalog insert failed: {}",
                    storage_path,
                    e
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            document_id = %id,
            owner = %owner.as_str(),
            "Ingested {} ({} bytes)",
            storage_path,
            file_size
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::services::testing::{harness, owner};

    fn budget() -> DocumentMetadata {
        DocumentMetadata::new("Budget.pdf", "Finance")
    }

    #[test]
    fn test_storage_path_is_namespaced() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            storage_path_for("U1", at, "65f0", "report.pdf"),
            "documents/U1/1700000000123_65f0_report.pdf"
        );
        assert_eq!(
            storage_path_for("a/b", at, "65f0", "../../etc/passwd"),
            "documents/a_b/1700000000123_65f0__.._etc_passwd"
        );
        assert_eq!(
            storage_path_for("U1", at, "65f0", "..."),
            "documents/U1/1700000000123_65f0_file"
        );
    }

    #[tokio::test]
    async fn test_repeated_uploads_get_their_own_blobs() {
        let h = harness();
        let mut ids = Vec::new();
        for i in 0..50u8 {
            let upload = Upload::new(vec![i; 4], "same.pdf");
            ids.push(h.workflow.ingest(upload, budget(), &owner()).await.unwrap());
        }

        let paths: std::collections::HashSet<String> = ids
            .iter()
            .map(|id| h.catalog.document(id).unwrap().storage_path)
            .collect();
        assert_eq!(paths.len(), 50);
        assert_eq!(h.objects.len(), 50);

        h.workflow.teardown(&ids[0], &owner()).await.unwrap();
        for id in &ids[1..] {
            let doc = h.catalog.document(id).unwrap();
            assert!(h.objects.contains(&doc.storage_path));
        }
    }

    #[tokio::test]
    async fn test_ingest_records_what_was_stored() {
        let h = harness();
        let upload = Upload::new(vec![7u8; 2048], "budget.pdf");

        let id = h.workflow.ingest(upload, budget(), &owner()).await.unwrap();

        let doc = h.catalog.document(&id).unwrap();
        let stored = h.objects.object(&doc.storage_path).unwrap();
        assert_eq!(doc.file_size, 2048);
        assert_eq!(doc.file_size as usize, stored.size());
        assert_eq!(doc.mime_type, stored.content_type);
        assert_eq!(doc.mime_type, "application/pdf");
        assert_eq!(doc.tags, Vec::<String>::new());
        assert_eq!(doc.owner_uid, "U1");
        assert_eq!(doc.revision, 0);
        assert!(doc.storage_path.starts_with("documents/U1/"));
        assert!(doc.url.contains("signature="));
        assert!(doc.url_expires_at > Utc::now() + chrono::Duration::days(6));
    }

    #[tokio::test]
    async fn test_declared_content_type_wins() {
        let h = harness();
        let upload = Upload::new(b"a,b".to_vec(), "data.bin").with_mime_type("text/csv");
        let id = h.workflow.ingest(upload, budget(), &owner()).await.unwrap();
        assert_eq!(h.catalog.document(&id).unwrap().mime_type, "text/csv");
    }

    #[tokio::test]
    async fn test_invalid_metadata_touches_no_store() {
        let h = harness();
        let upload = Upload::new(vec![1, 2, 3], "a.txt");

        let err = h
            .workflow
            .ingest(upload, DocumentMetadata::new("", "Finance"), &owner())
            .await
            .unwrap_err();

        assert!(matches!(err, DocflowError::Validation { .. }));
        assert_eq!(h.objects.put_count(), 0);
        assert_eq!(h.objects.mint_count(), 0);
        assert_eq!(h.catalog.document_insert_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_payload() {
        let h = harness();
        let upload = Upload {
            file_name: "a.txt".into(),
            ..Default::default()
        };
        let err = h.workflow.ingest(upload, budget(), &owner()).await.unwrap_err();
        assert!(matches!(err, DocflowError::MissingPayload));
        assert_eq!(h.objects.put_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected_before_write() {
        let h = harness();
        let max = h.workflow.config().max_upload_bytes;
        let upload = Upload::new(vec![0u8; max + 1], "big.bin");
        let err = h.workflow.ingest(upload, budget(), &owner()).await.unwrap_err();
        assert!(matches!(err, DocflowError::PayloadTooLarge { .. }));
        assert_eq!(h.objects.put_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_skips_catalog() {
        let h = harness();
        h.objects.fail_puts(true);
        let err = h
            .workflow
            .ingest(Upload::new(vec![1], "a.txt"), budget(), &owner())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_WRITE_ERROR");
        assert_eq!(h.catalog.document_insert_count(), 0);
    }

    #[tokio::test]
    async fn test_mint_failure_skips_catalog() {
        let h = harness();
        h.objects.fail_mints(true);
        let err = h
            .workflow
            .ingest(Upload::new(vec![1], "a.txt"), budget(), &owner())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CAPABILITY_MINT_ERROR");
        assert_eq!(h.catalog.document_insert_count(), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_leaves_orphaned_blob() {
        let h = harness();
        h.catalog.fail_inserts(true);
        let err = h
            .workflow
            .ingest(Upload::new(vec![1], "a.txt"), budget(), &owner())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CATALOG_ERROR");
        assert_eq!(h.objects.len(), 1);
        assert_eq!(h.catalog.document_count(), 0);
    }
}
