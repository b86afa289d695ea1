//! MongoDB catalog

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::options::FindOptions;
use mongodb::ClientSession;

use super::{new_record_id, CatalogError, CatalogResult, CatalogStore, ShareBatch};
use crate::db::{collections, MongoDb};
use crate::models::{Assignment, Document, Employee};

#[derive(Clone)]
pub struct MongoCatalog {
    db: MongoDb,
}

impl MongoCatalog {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    fn documents(&self) -> mongodb::Collection<Document> {
        self.db.collection(collections::DOCUMENTS)
    }

    /// Writes of one share batch, run inside the caller's transaction
    async fn write_share(
        &self,
        session: &mut ClientSession,
        batch: &ShareBatch,
    ) -> CatalogResult<Vec<String>> {
        let docs = self.documents();
        let mut filter = doc! { "_id": &batch.document_id };
        match batch.expected_revision {
            // Records written before revisions existed have no field at all
            Some(0) => {
                filter.insert("revision", doc! { "$in": [0_i64, Bson::Null] });
            }
            Some(rev) => {
                filter.insert("revision", rev);
            }
            None => {}
        }

        let update = doc! {
            "$set": {
                "sharedWith": batch.sharing.shared_with.clone(),
                "sharedDepartment": &batch.sharing.shared_department,
                "sharedAt": bson::DateTime::from_chrono(batch.sharing.shared_at),
                "sharedBy": &batch.sharing.shared_by,
            },
            "$inc": { "revision": 1_i64 },
        };
        let result = docs
            .update_one_with_session(filter, update, None, session)
            .await?;

        if result.matched_count == 0 {
            let current = docs
                .find_one_with_session(doc! { "_id": &batch.document_id }, None, session)
                .await?;
            return Err(match current {
                None => CatalogError::DocumentGone(batch.document_id.clone()),
                Some(d) => CatalogError::RevisionMismatch {
                    expected: batch.expected_revision.unwrap_or_default(),
                    current: d.revision,
                },
            });
        }

        let mut ids = Vec::with_capacity(batch.assignments.len());
        let assignments: Vec<Assignment> = batch
            .assignments
            .iter()
            .cloned()
            .map(|mut a| {
                let id = new_record_id();
                ids.push(id.clone());
                a.id = Some(id);
                a
            })
            .collect();

        self.db
            .collection::<Assignment>(collections::ASSIGNMENTS)
            .insert_many_with_session(assignments, None, session)
            .await?;

        Ok(ids)
    }
}

#[async_trait]
impl CatalogStore for MongoCatalog {
    async fn insert_document(&self, mut doc: Document) -> CatalogResult<String> {
        let id = new_record_id();
        doc.id = Some(id.clone());
        self.documents().insert_one(&doc, None).await?;
        Ok(id)
    }

    async fn get_document(&self, id: &str) -> CatalogResult<Option<Document>> {
        Ok(self.documents().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_documents_by_owner(
        &self,
        owner_uid: &str,
        limit: i64,
    ) -> CatalogResult<Vec<Document>> {
        let options = FindOptions::builder()
            .limit(limit)
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self
            .documents()
            .find(doc! { "ownerUid": owner_uid }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_document(&self, id: &str) -> CatalogResult<bool> {
        let result = self
            .documents()
            .delete_one(doc! { "_id": id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn get_employee(&self, id: &str) -> CatalogResult<Option<Employee>> {
        Ok(self
            .db
            .collection::<Employee>(collections::EMPLOYEES)
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn commit_share(&self, batch: ShareBatch) -> CatalogResult<Vec<String>> {
        let mut session = self.db.client().start_session(None).await?;
        session.start_transaction(None).await?;

        match self.write_share(&mut session, &batch).await {
            Ok(ids) => {
                session.commit_transaction().await?;
                Ok(ids)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(
                        document_id = %batch.document_id,
                        "failed to abort share transaction: {}",
                        abort_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn ping(&self) -> CatalogResult<()> {
        Ok(self.db.ping().await?)
    }
}
