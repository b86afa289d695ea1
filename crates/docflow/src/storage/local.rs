//! Filesystem-backed object store
//!
//! Layout under the configured root:
//! ```text
//! {root}/
//! ├── objects/documents/{owner}/{millis}_{unique}_{file}        blob bytes
//! └── meta/documents/{owner}/{millis}_{unique}_{file}.json      content type, size
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    validate_object_path, Capability, CapabilitySigner, ObjectStore, StorageError, StorageResult,
    StoredObject,
};

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    size: u64,
    private: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    signer: CapabilitySigner,
}

impl LocalObjectStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, signer: CapabilitySigner) -> StorageResult<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(StorageError::Config(
                "object store root directory is not set".to_string(),
            ));
        }
        for dir in ["objects", "meta"] {
            std::fs::create_dir_all(root.join(dir)).map_err(|e| {
                StorageError::Config(format!(
                    "cannot create object store directory {}: {}",
                    root.join(dir).display(),
                    e
                ))
            })?;
        }
        tracing::info!(root = %root.display(), "local object store opened");
        Ok(Self { root, signer })
    }

    fn data_path(&self, path: &str) -> PathBuf {
        self.root.join("objects").join(path)
    }

    fn meta_path(&self, path: &str) -> PathBuf {
        self.root.join("meta").join(format!("{}.json", path))
    }
}

async fn ensure_parent(file: &Path, path: &str) -> StorageResult<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io(path, e))?;
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_object_path(path)?;
        let data_path = self.data_path(path);
        let meta_path = self.meta_path(path);
        ensure_parent(&data_path, path).await?;
        ensure_parent(&meta_path, path).await?;

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            private: true,
            created_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec(&meta).map_err(|e| StorageError::Provider {
            code: None,
            message: e.to_string(),
        })?;

        // The blob only becomes visible under its final name once fully
        // written. Linking instead of renaming refuses to replace an existing
        // object.
        let mut partial = data_path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| StorageError::from_io(path, e))?;
        let linked = tokio::fs::hard_link(&partial, &data_path).await;
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            tracing::warn!(path, "failed to remove partial object: {}", e);
        }
        linked.map_err(|e| StorageError::from_io(path, e))?;

        if let Err(e) = tokio::fs::write(&meta_path, meta_json).await {
            if let Err(cleanup) = tokio::fs::remove_file(&data_path).await {
                tracing::warn!(path, "failed to remove object after metadata error: {}", cleanup);
            }
            return Err(StorageError::from_io(path, e));
        }

        tracing::debug!(path, size = meta.size, "object written");
        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<StoredObject> {
        validate_object_path(path)?;
        let bytes = tokio::fs::read(self.data_path(path))
            .await
            .map_err(|e| StorageError::from_io(path, e))?;

        let content_type = match tokio::fs::read(self.meta_path(path)).await {
            Ok(raw) => serde_json::from_slice::<ObjectMeta>(&raw)
                .map(|m| m.content_type)
                .ok(),
            Err(_) => None,
        }
        .unwrap_or_else(|| {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string()
        });

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    async fn delete(&self, path: &str, ignore_missing: bool) -> StorageResult<()> {
        validate_object_path(path)?;
        match tokio::fs::remove_file(self.data_path(path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && ignore_missing => {
                tracing::debug!(path, "object already absent");
            }
            Err(e) => return Err(StorageError::from_io(path, e)),
        }
        if let Err(e) = tokio::fs::remove_file(self.meta_path(path)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path, "failed to remove object metadata: {}", e);
            }
        }
        Ok(())
    }

    async fn mint_read_capability(&self, path: &str, ttl: Duration) -> StorageResult<Capability> {
        validate_object_path(path)?;
        self.signer.mint(path, ttl)
    }

    fn verify_read_capability(&self, path: &str, expires: i64, signature: &str) -> bool {
        validate_object_path(path).is_ok() && self.signer.verify(path, expires, signature)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = tokio::fs::metadata(self.root.join("objects"))
            .await
            .map_err(|e| StorageError::Config(format!("object store root unavailable: {}", e)))?;
        if !meta.is_dir() {
            return Err(StorageError::Config(
                "object store root is not a directory".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, LocalObjectStore) {
        let dir = TempDir::new().unwrap();
        let signer = CapabilitySigner::new("secret", "http://localhost:8080").unwrap();
        let store = LocalObjectStore::new(dir.path(), signer).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_keeps_content_type() {
        let (_dir, store) = open();
        store
            .put("documents/u1/1_a.bin", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();

        let obj = store.get("documents/u1/1_a.bin").await.unwrap();
        assert_eq!(obj.bytes, b"hello");
        assert_eq!(obj.content_type, "text/plain");
        assert!(!store.data_path("documents/u1/1_a.bin.partial").exists());
    }

    #[tokio::test]
    async fn test_put_never_replaces_an_object() {
        let (_dir, store) = open();
        store
            .put("documents/u1/1_a.bin", b"first".to_vec(), "text/plain")
            .await
            .unwrap();

        let err = store
            .put("documents/u1/1_a.bin", b"second".to_vec(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let obj = store.get("documents/u1/1_a.bin").await.unwrap();
        assert_eq!(obj.bytes, b"first");
        assert_eq!(obj.content_type, "text/plain");
        assert!(!store.data_path("documents/u1/1_a.bin.partial").exists());
    }

    #[tokio::test]
    async fn test_failed_put_leaves_no_metadata() {
        let (_dir, store) = open();
        store
            .put("documents/u1/1_a.bin", b"first".to_vec(), "text/plain")
            .await
            .unwrap();
        std::fs::remove_file(store.meta_path("documents/u1/1_a.bin")).unwrap();

        assert!(store
            .put("documents/u1/1_a.bin", b"second".to_vec(), "application/pdf")
            .await
            .is_err());
        assert!(!store.meta_path("documents/u1/1_a.bin").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_object() {
        let (_dir, store) = open();
        assert!(store.delete("documents/u1/nope", true).await.is_ok());
        let err = store.delete("documents/u1/nope", false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_meta() {
        let (_dir, store) = open();
        store
            .put("documents/u1/2_b.pdf", vec![1, 2, 3], "application/pdf")
            .await
            .unwrap();
        store.delete("documents/u1/2_b.pdf", true).await.unwrap();
        assert!(!store.data_path("documents/u1/2_b.pdf").exists());
        assert!(!store.meta_path("documents/u1/2_b.pdf").exists());
        assert!(store.get("documents/u1/2_b.pdf").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (_dir, store) = open();
        let err = store
            .put("../outside", vec![0], "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, store) = open();
        assert!(store.health_check().await.is_ok());
    }

    #[test]
    fn test_empty_root_is_config_error() {
        let signer = CapabilitySigner::new("secret", "http://localhost").unwrap();
        let err = LocalObjectStore::new("", signer).unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
