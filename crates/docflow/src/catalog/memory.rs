//! In-memory catalog
//!
//! Every write happens under one lock, so a share batch is applied in full or
//! not at all. Counters and fault switches let tests observe store traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{new_record_id, CatalogError, CatalogResult, CatalogStore, ShareBatch};
use crate::models::{Assignment, Document, Employee};

#[derive(Default)]
struct Collections {
    documents: HashMap<String, Document>,
    employees: HashMap<String, Employee>,
    assignments: Vec<Assignment>,
}

#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<Collections>,
    document_inserts: AtomicUsize,
    commits: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_commits: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Collections> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a directory record
    pub fn put_employee(&self, employee: Employee) {
        self.state()
            .employees
            .insert(employee.id.clone(), employee);
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.state().documents.get(id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.state().documents.len()
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.state().assignments.clone()
    }

    pub fn assignments_for_document(&self, document_id: &str) -> Vec<Assignment> {
        self.state()
            .assignments
            .iter()
            .filter(|a| a.related_document_id == document_id)
            .cloned()
            .collect()
    }

    pub fn document_insert_count(&self) -> usize {
        self.document_inserts.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn injected(what: &str) -> CatalogError {
        CatalogError::Provider {
            code: Some("UNAVAILABLE".to_string()),
            message: format!("injected {} failure", what),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn insert_document(&self, mut doc: Document) -> CatalogResult<String> {
        self.document_inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Self::injected("insert"));
        }
        let id = new_record_id();
        doc.id = Some(id.clone());
        self.state().documents.insert(id.clone(), doc);
        Ok(id)
    }

    async fn get_document(&self, id: &str) -> CatalogResult<Option<Document>> {
        Ok(self.document(id))
    }

    async fn list_documents_by_owner(
        &self,
        owner_uid: &str,
        limit: i64,
    ) -> CatalogResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .state()
            .documents
            .values()
            .filter(|d| d.owner_uid == owner_uid)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(docs)
    }

    async fn delete_document(&self, id: &str) -> CatalogResult<bool> {
        Ok(self.state().documents.remove(id).is_some())
    }

    async fn get_employee(&self, id: &str) -> CatalogResult<Option<Employee>> {
        Ok(self.state().employees.get(id).cloned())
    }

    async fn commit_share(&self, batch: ShareBatch) -> CatalogResult<Vec<String>> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(Self::injected("commit"));
        }

        let mut state = self.state();
        let current = state
            .documents
            .get(&batch.document_id)
            .map(|d| d.revision)
            .ok_or_else(|| CatalogError::DocumentGone(batch.document_id.clone()))?;
        if let Some(expected) = batch.expected_revision {
            if expected != current {
                return Err(CatalogError::RevisionMismatch { expected, current });
            }
        }

        let mut ids = Vec::with_capacity(batch.assignments.len());
        for mut assignment in batch.assignments {
            let id = new_record_id();
            assignment.id = Some(id.clone());
            state.assignments.push(assignment);
            ids.push(id);
        }
        if let Some(doc) = state.documents.get_mut(&batch.document_id) {
            batch.sharing.apply(doc);
        }
        Ok(ids)
    }

    async fn ping(&self) -> CatalogResult<()> {
        Ok(())
    }
}
