//! Document catalog record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{bson_datetime_option, ETag};

/// One uploaded file (stored in the documents collection).
///
/// `storage_path` is written once at ingestion and never changes. Only the
/// `shared_*` fields and `revision` are touched after creation, and only by
/// the sharing batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub owner_uid: String,
    pub title: String,
    pub sector: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub target_department: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub storage_path: String,
    pub mime_type: String,
    pub file_name: String,
    pub file_size: i64,
    pub url: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub url_expires_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Bumped by every committed share; backs the `If-Match` check
    #[serde(default)]
    pub revision: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_department: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_option"
    )]
    pub shared_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<String>,
}

impl Document {
    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_uid == uid
    }

    pub fn etag(&self) -> ETag {
        ETag::from_revision(self.revision)
    }

    /// Owner, or anyone the document has been shared with
    pub fn is_readable_by(&self, uid: &str) -> bool {
        self.is_owned_by(uid)
            || self
                .shared_with
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| id == uid))
    }
}

/// Sharing metadata written onto the source document by the share batch
#[derive(Debug, Clone, PartialEq)]
pub struct SharingUpdate {
    pub shared_with: Vec<String>,
    pub shared_department: String,
    pub shared_at: DateTime<Utc>,
    pub shared_by: String,
}

impl SharingUpdate {
    pub fn apply(&self, doc: &mut Document) {
        doc.shared_with = Some(self.shared_with.clone());
        doc.shared_department = Some(self.shared_department.clone());
        doc.shared_at = Some(self.shared_at);
        doc.shared_by = Some(self.shared_by.clone());
        doc.revision += 1;
    }
}

/// Document summary for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub owner_uid: String,
    pub title: String,
    pub sector: String,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
    pub document_type: Option<String>,
    pub language: Option<String>,
    pub urgency: Option<String>,
    pub target_department: Option<String>,
    pub description: Option<String>,
    pub storage_path: String,
    pub mime_type: String,
    pub file_name: String,
    pub file_size: i64,
    pub url: String,
    pub url_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub etag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<String>,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        let etag = doc.etag().to_string();
        Self {
            id: doc.id.unwrap_or_default(),
            owner_uid: doc.owner_uid,
            title: doc.title,
            sector: doc.sector,
            project_id: doc.project_id,
            tags: doc.tags,
            document_type: doc.document_type,
            language: doc.language,
            urgency: doc.urgency,
            target_department: doc.target_department,
            description: doc.description,
            storage_path: doc.storage_path,
            mime_type: doc.mime_type,
            file_name: doc.file_name,
            file_size: doc.file_size,
            url: doc.url,
            url_expires_at: doc.url_expires_at,
            created_at: doc.created_at,
            etag,
            shared_with: doc.shared_with,
            shared_department: doc.shared_department,
            shared_at: doc.shared_at,
            shared_by: doc.shared_by,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_document(id: &str, owner: &str) -> Document {
    let now = Utc::now();
    Document {
        id: Some(id.to_string()),
        owner_uid: owner.to_string(),
        title: "Quarterly report".to_string(),
        sector: "Finance".to_string(),
        project_id: None,
        tags: vec!["q3".to_string()],
        document_type: None,
        language: None,
        urgency: None,
        target_department: None,
        description: None,
        storage_path: format!("documents/{}/1_report.pdf", owner),
        mime_type: "application/pdf".to_string(),
        file_name: "report.pdf".to_string(),
        file_size: 4,
        url: "http://localhost/blob".to_string(),
        url_expires_at: now,
        created_at: now,
        revision: 0,
        shared_with: None,
        shared_department: None,
        shared_at: None,
        shared_by: None,
    }
}
