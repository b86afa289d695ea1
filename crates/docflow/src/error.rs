//! Error types for the document workflow

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Result type alias for workflow operations
pub type DocflowResult<T> = Result<T, DocflowError>;

/// Per-field validation messages, keyed by the wire name of the field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Workflow error types
#[derive(Debug, Error)]
pub enum DocflowError {
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("File is required")]
    MissingPayload,

    #[error("File exceeds the {max} byte limit ({size} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Forbidden: only the document owner can {action}")]
    Forbidden { action: String },

    #[error("Document was modified concurrently (expected {expected}, current {current})")]
    Conflict { expected: String, current: String },

    #[error("Storage is not configured: {0}")]
    StorageConfig(String),

    #[error("Storage write failed: {message}")]
    StorageWrite {
        code: Option<String>,
        message: String,
    },

    #[error("Storage delete failed: {message}")]
    StorageDelete {
        code: Option<String>,
        message: String,
    },

    #[error("Could not mint read capability: {0}")]
    CapabilityMint(String),

    #[error("Batch commit failed: {message}")]
    BatchCommit {
        code: Option<String>,
        message: String,
    },

    #[error("Catalog error: {message}")]
    Catalog {
        code: Option<String>,
        message: String,
    },
}

impl DocflowError {
    /// Validation error for a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.clone()]);
        DocflowError::Validation { message, fields }
    }

    /// Validation error from a `validator` report
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        DocflowError::Validation {
            message: "Validation failed".to_string(),
            fields,
        }
    }

    /// Map a storage failure raised while writing the blob
    pub fn storage_write(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => DocflowError::StorageConfig(msg),
            other => DocflowError::StorageWrite {
                code: other.provider_code(),
                message: other.to_string(),
            },
        }
    }

    /// Map a storage failure raised while deleting the blob
    pub fn storage_delete(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => DocflowError::StorageConfig(msg),
            other => DocflowError::StorageDelete {
                code: other.provider_code(),
                message: other.to_string(),
            },
        }
    }

    /// Map a failure to mint a read capability
    pub fn capability_mint(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => DocflowError::StorageConfig(msg),
            other => DocflowError::CapabilityMint(other.to_string()),
        }
    }

    /// Map a failed batch commit
    pub fn batch_commit(err: CatalogError) -> Self {
        match err {
            CatalogError::RevisionMismatch { expected, current } => DocflowError::Conflict {
                expected: format!("W/\"{:x}\"", expected),
                current: format!("W/\"{:x}\"", current),
            },
            CatalogError::DocumentGone(id) => DocflowError::NotFound(id),
            other => DocflowError::BatchCommit {
                code: other.provider_code(),
                message: other.to_string(),
            },
        }
    }

    /// Convert to API error code
    pub fn code(&self) -> &'static str {
        match self {
            DocflowError::Validation { .. } => "VALIDATION_ERROR",
            DocflowError::MissingPayload => "MISSING_PAYLOAD",
            DocflowError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            DocflowError::NotFound(_) => "NOT_FOUND",
            DocflowError::Forbidden { .. } => "FORBIDDEN",
            DocflowError::Conflict { .. } => "CONFLICT",
            DocflowError::StorageConfig(_) => "STORAGE_CONFIG_ERROR",
            DocflowError::StorageWrite { .. } => "STORAGE_WRITE_ERROR",
            DocflowError::StorageDelete { .. } => "STORAGE_DELETE_ERROR",
            DocflowError::CapabilityMint(_) => "CAPABILITY_MINT_ERROR",
            DocflowError::BatchCommit { .. } => "BATCH_COMMIT_ERROR",
            DocflowError::Catalog { .. } => "CATALOG_ERROR",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocflowError::Validation { .. } | DocflowError::MissingPayload => {
                StatusCode::BAD_REQUEST
            }

            DocflowError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            DocflowError::NotFound(_) => StatusCode::NOT_FOUND,

            DocflowError::Forbidden { .. } => StatusCode::FORBIDDEN,

            DocflowError::Conflict { .. } => StatusCode::CONFLICT,

            DocflowError::StorageConfig(_)
            | DocflowError::StorageWrite { .. }
            | DocflowError::StorageDelete { .. }
            | DocflowError::CapabilityMint(_)
            | DocflowError::BatchCommit { .. }
            | DocflowError::Catalog { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Provider diagnostics attached to infrastructure errors
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DocflowError::Validation { fields, .. } => serde_json::to_value(fields).ok(),
            DocflowError::StorageWrite {
                code: Some(code), ..
            }
            | DocflowError::StorageDelete {
                code: Some(code), ..
            }
            | DocflowError::BatchCommit {
                code: Some(code), ..
            }
            | DocflowError::Catalog {
                code: Some(code), ..
            } => Some(serde_json::json!({ "providerCode": code })),
            _ => None,
        }
    }
}

impl From<CatalogError> for DocflowError {
    fn from(err: CatalogError) -> Self {
        DocflowError::Catalog {
            code: err.provider_code(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for DocflowError {
    fn from(rejection: JsonRejection) -> Self {
        DocflowError::field("body", rejection.body_text())
    }
}

impl From<PathRejection> for DocflowError {
    fn from(rejection: PathRejection) -> Self {
        DocflowError::field("path", rejection.body_text())
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for DocflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }
        let body = ApiError {
            code: self.code().to_string(),
            message: self.to_string(),
            details: self.details(),
        };

        (status, axum::Json(body)).into_response()
    }
}
