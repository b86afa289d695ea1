//! MongoDB database connection and configuration

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};

/// MongoDB database wrapper
#[derive(Clone)]
pub struct MongoDb {
    client: Client,
    db: Database,
}

impl MongoDb {
    /// Connect to MongoDB
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        let db = client.database(db_name);

        // Test connection
        db.run_command(doc! { "ping": 1 }, None).await?;
        tracing::info!("Connected to MongoDB: {}", db_name);

        let instance = Self { client, db };

        // Ensure indexes exist
        instance.ensure_indexes().await?;

        Ok(instance)
    }

    /// Client handle, needed to open sessions for transactions
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get collection
    pub fn collection<T>(&self, name: &str) -> mongodb::Collection<T> {
        self.db.collection(name)
    }

    /// Ping the database to check connection
    pub async fn ping(&self) -> mongodb::error::Result<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    /// Ensure all required indexes exist
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        tracing::info!("Ensuring MongoDB indexes...");

        self.create_indexes(
            collections::DOCUMENTS,
            vec![
                IndexModel::builder().keys(doc! { "ownerUid": 1 }).build(),
                IndexModel::builder()
                    .keys(doc! { "ownerUid": 1, "createdAt": -1 })
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "createdAt": -1 })
                    .build(),
                // One document per blob
                IndexModel::builder()
                    .keys(doc! { "storagePath": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            ],
        )
        .await?;

        self.create_indexes(
            collections::ASSIGNMENTS,
            vec![
                IndexModel::builder()
                    .keys(doc! { "assignedTo": 1 })
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "relatedDocumentId": 1 })
                    .build(),
            ],
        )
        .await?;

        self.create_indexes(
            collections::EMPLOYEES,
            vec![IndexModel::builder()
                .keys(doc! { "departmentKey": 1 })
                .build()],
        )
        .await?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    async fn create_indexes(
        &self,
        collection: &str,
        indexes: Vec<IndexModel>,
    ) -> anyhow::Result<()> {
        let coll = self.db.collection::<mongodb::bson::Document>(collection);
        coll.create_indexes(indexes, None).await?;
        Ok(())
    }
}

/// Collection names
pub mod collections {
    pub const DOCUMENTS: &str = "documents";
    pub const EMPLOYEES: &str = "employees";
    /// Assignments share the collection the task tracker reads
    pub const ASSIGNMENTS: &str = "projects";
}
