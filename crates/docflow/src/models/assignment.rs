//! Follow-up item generated per recipient by a share

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Category label for share-derived assignments
pub const SHARE_CATEGORY: &str = "Document Review";

/// Tag every share-derived assignment starts with
pub const SHARE_TAG: &str = "Document Review";

/// Urgency used when the source document has none
pub const DEFAULT_URGENCY: &str = "medium";

/// Stand-in when the sharer has no displayable identity
pub const UNKNOWN_SHARER: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    #[default]
    Planning,
    InProgress,
    Review,
    Completed,
    Overdue,
}

/// Assignment record (stored in the projects collection, where the task
/// tracker reads and updates it)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub assigned_by: String,
    pub assigned_date: NaiveDate,
    pub deadline: NaiveDate,
    pub urgency: String,
    pub status: AssignmentStatus,
    pub progress: u32,
    pub category: String,
    pub documents: u32,
    pub collaborators: Vec<String>,
    pub tags: Vec<String>,
    pub estimated_hours: u32,
    pub spent_hours: u32,
    pub assigned_to: String,
    pub sector: String,
    pub related_document_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Result of a share call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareOutcome {
    pub success: bool,
    #[serde(rename = "projectIds")]
    pub assignment_ids: Vec<String>,
    #[serde(rename = "sharedWith")]
    pub resolved_recipients: Vec<super::ResolvedRecipient>,
}
