//! In-memory object store with call counters and fault switches for tests

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;

use super::{
    validate_object_path, Capability, CapabilitySigner, ObjectStore, StorageError, StorageResult,
    StoredObject,
};

pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    signer: CapabilitySigner,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    mints: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    fail_mints: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(signer: CapabilitySigner) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            signer,
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            mints: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_mints: AtomicBool::new(false),
        }
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects().contains_key(path)
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Drop an object behind the adapter's back (out-of-band removal)
    pub fn remove_out_of_band(&self, path: &str) -> bool {
        self.objects().remove(path).is_some()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn mint_count(&self) -> usize {
        self.mints.load(Ordering::SeqCst)
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mints(&self, fail: bool) {
        self.fail_mints.store(fail, Ordering::SeqCst);
    }

    fn injected(code: &str) -> StorageError {
        StorageError::Provider {
            code: Some(code.to_string()),
            message: format!("injected {} failure", code.to_lowercase()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        validate_object_path(path)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Self::injected("PUT"));
        }
        match self.objects().entry(path.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(path.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                });
                Ok(())
            }
        }
    }

    async fn get(&self, path: &str) -> StorageResult<StoredObject> {
        self.object(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str, ignore_missing: bool) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::injected("DELETE"));
        }
        match self.objects().remove(path) {
            Some(_) => Ok(()),
            None if ignore_missing => Ok(()),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    async fn mint_read_capability(&self, path: &str, ttl: Duration) -> StorageResult<Capability> {
        self.mints.fetch_add(1, Ordering::SeqCst);
        if self.fail_mints.load(Ordering::SeqCst) {
            return Err(Self::injected("MINT"));
        }
        self.signer.mint(path, ttl)
    }

    fn verify_read_capability(&self, path: &str, expires: i64, signature: &str) -> bool {
        self.signer.verify(path, expires, signature)
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
