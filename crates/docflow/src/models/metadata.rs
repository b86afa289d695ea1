//! Caller-supplied metadata for uploads and shares
//!
//! Both request types are validated with [`validator::Validate`] and
//! normalized before any store is touched.

use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{DocflowError, DocflowResult};

/// Metadata accompanying an uploaded file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sector: String,
    pub project_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub document_type: Option<String>,
    pub language: Option<String>,
    pub urgency: Option<String>,
    pub target_department: Option<String>,
    pub description: Option<String>,
}

impl DocumentMetadata {
    pub fn new(title: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sector: sector.into(),
            ..Default::default()
        }
    }

    /// Build from multipart text fields. `tags` arrives as a JSON array string.
    pub fn from_form(fields: &BTreeMap<String, String>) -> DocflowResult<Self> {
        let text = |name: &str| fields.get(name).cloned();
        let tags = match fields.get("tags") {
            Some(raw) if !raw.trim().is_empty() => {
                Some(serde_json::from_str::<Vec<String>>(raw).map_err(|_| {
                    DocflowError::field("tags", "Tags must be a JSON array of strings")
                })?)
            }
            _ => None,
        };

        Ok(Self {
            title: text("title").unwrap_or_default(),
            sector: text("sector").unwrap_or_default(),
            project_id: text("projectId"),
            tags,
            document_type: text("documentType"),
            language: text("language"),
            urgency: text("urgency"),
            target_department: text("targetDepartment"),
            description: text("description"),
        })
    }

    /// Validate, then return the trimmed form with blank optionals cleared.
    pub fn into_validated(self) -> DocflowResult<Self> {
        self.validate()
            .map_err(DocflowError::from_validation_errors)?;

        Ok(Self {
            title: self.title.trim().to_string(),
            sector: self.sector.trim().to_string(),
            project_id: non_blank(self.project_id),
            tags: Some(
                self.tags
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            ),
            document_type: non_blank(self.document_type),
            language: non_blank(self.language),
            urgency: non_blank(self.urgency),
            target_department: non_blank(self.target_department),
            description: non_blank(self.description),
        })
    }
}

impl Validate for DocumentMetadata {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "title", &self.title, "Title is required");
        check_required(&mut errors, "sector", &self.sector, "Sector is required");

        let optionals: [(&'static str, &Option<String>); 6] = [
            ("projectId", &self.project_id),
            ("documentType", &self.document_type),
            ("language", &self.language),
            ("urgency", &self.urgency),
            ("targetDepartment", &self.target_department),
            ("description", &self.description),
        ];
        for (field, value) in optionals {
            if let Some(v) = value {
                if let Err(e) = no_control_chars(v) {
                    errors.add(field, e);
                }
            }
        }
        if let Some(tags) = &self.tags {
            if tags.iter().any(|t| no_control_chars(t).is_err()) {
                errors.add(
                    "tags",
                    ValidationError::new("no_control_chars")
                        .with_message("Tags must not contain control characters".into()),
                );
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of a share request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub department: String,
    #[serde(default, alias = "recipientIds")]
    pub employee_ids: Vec<String>,
    pub message: Option<String>,
}

impl ShareRequest {
    pub fn new(department: impl Into<String>, employee_ids: Vec<String>) -> Self {
        Self {
            department: department.into(),
            employee_ids,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Validate, then trim the department and de-duplicate recipient ids
    /// (first occurrence wins).
    pub fn into_validated(self) -> DocflowResult<Self> {
        self.validate()
            .map_err(DocflowError::from_validation_errors)?;

        let mut ids: Vec<String> = Vec::with_capacity(self.employee_ids.len());
        for id in self.employee_ids {
            let id = id.trim().to_string();
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }

        Ok(Self {
            department: self.department.trim().to_string(),
            employee_ids: ids,
            message: non_blank(self.message),
        })
    }
}

impl Validate for ShareRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(
            &mut errors,
            "department",
            &self.department,
            "Department is required",
        );
        if self.employee_ids.iter().all(|id| id.trim().is_empty()) {
            errors.add(
                "employeeIds",
                ValidationError::new("required")
                    .with_message("At least one recipient is required".into()),
            );
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_required(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    message: &'static str,
) {
    if let Err(e) = not_empty_trimmed(value) {
        errors.add(field, e.with_message(message.into()));
    } else if let Err(e) = no_control_chars(value) {
        errors.add(field, e);
    }
}

/// Reject strings that are empty after trimming whitespace.
pub fn not_empty_trimmed(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_empty_trimmed")
            .with_message("Must not be empty".into()));
    }
    Ok(())
}

/// Reject control characters other than newline, carriage return and tab.
pub fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
