//! Object store adapters
//!
//! Blobs are written once under a namespaced path, read back only through
//! time-limited capability URLs, and deleted on teardown.

mod capability;
mod local;
mod memory;

pub use capability::{Capability, CapabilitySigner};
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Config(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("{message}")]
    Provider {
        code: Option<String>,
        message: String,
    },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Provider error code, when the backend reported one
    pub fn provider_code(&self) -> Option<String> {
        match self {
            StorageError::Provider { code, .. } => code.clone(),
            StorageError::NotFound(_) => Some("NOT_FOUND".to_string()),
            StorageError::AlreadyExists(_) => Some("ALREADY_EXISTS".to_string()),
            StorageError::InvalidPath(_) => Some("INVALID_PATH".to_string()),
            StorageError::Config(_) => None,
        }
    }

    fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
            kind => StorageError::Provider {
                code: Some(format!("{:?}", kind)),
                message: err.to_string(),
            },
        }
    }
}

/// A stored blob together with the content type it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl StoredObject {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Binary object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a private object in one shot, tagged with its content type.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()>;

    async fn get(&self, path: &str) -> StorageResult<StoredObject>;

    /// Delete an object. With `ignore_missing`, an absent object is success.
    async fn delete(&self, path: &str, ignore_missing: bool) -> StorageResult<()>;

    /// Mint a read capability valid for `ttl`.
    async fn mint_read_capability(&self, path: &str, ttl: Duration) -> StorageResult<Capability>;

    /// Check a presented capability (signature and expiry).
    fn verify_read_capability(&self, path: &str, expires: i64, signature: &str) -> bool;

    async fn health_check(&self) -> StorageResult<()>;
}

/// Reject paths that could escape the store namespace.
pub fn validate_object_path(path: &str) -> StorageResult<()> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    if path
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_path() {
        assert!(validate_object_path("documents/u1/1700000000000_a.pdf").is_ok());
        assert!(validate_object_path("").is_err());
        assert!(validate_object_path("/etc/passwd").is_err());
        assert!(validate_object_path("documents/../secrets").is_err());
        assert!(validate_object_path("documents//a").is_err());
        assert!(validate_object_path("documents\\a").is_err());
        assert!(validate_object_path("documents/./a").is_err());
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = StorageError::from_io(
            "a/b",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = StorageError::from_io(
            "a/b",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(err.provider_code().as_deref(), Some("PermissionDenied"));
    }
}
