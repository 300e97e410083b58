//! MongoDB document backend.

use std::sync::Arc;

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::{Connector, DocumentCollection, DocumentConnection};
use crate::cache::CacheRecord;
use crate::config::{ConnectionConfig, MONGODB_DRIVER};
use crate::error::{CacheError, Result};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE
    )
}

/// MongoDB connection wrapper.
#[derive(Debug, Clone)]
pub struct MongoConnection {
    client: Client,
    db: mongodb::Database,
}

impl MongoConnection {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if the URI is invalid or the server does not answer a ping.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB database {}", db_name);

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Get a reference to the underlying MongoDB client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }
}

#[async_trait]
impl DocumentConnection for MongoConnection {
    fn driver_name(&self) -> &str {
        MONGODB_DRIVER
    }

    async fn collection(&self, name: &str) -> Result<Arc<dyn DocumentCollection>> {
        let collection = MongoCollection {
            inner: self.db.collection(name),
        };
        collection.ensure_key_index().await?;
        Ok(Arc::new(collection))
    }
}

/// Cache collection stored in MongoDB.
#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: Collection<CacheRecord>,
}

impl MongoCollection {
    /// Creates the unique index on `key` if it does not exist yet.
    pub async fn ensure_key_index(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "key": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.inner.create_index(index).await?;
        debug!("Unique key index ensured on {}", self.inner.name());
        Ok(())
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    async fn find(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.inner.find_one(doc! { "key": key }).await?)
    }

    async fn insert(&self, record: &CacheRecord) -> Result<()> {
        match self.inner.insert_one(record).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(CacheError::DuplicateKey(record.key.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, record: &CacheRecord) -> Result<bool> {
        let result = self
            .inner
            .replace_one(doc! { "key": record.key.as_str() }, record)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        Ok(self.inner.delete_one(doc! { "key": key }).await?.deleted_count)
    }

    async fn drop_collection(&self) -> Result<()> {
        self.inner.drop().await?;
        // Dropping removes indexes too
        self.ensure_key_index().await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        // Whole seconds, matching CacheRecord::is_expired_at
        let cutoff = bson::DateTime::from_millis(now.timestamp() * 1000);
        let result = self
            .inner
            .delete_many(doc! { "expiration": { "$lte": cutoff } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.count_documents(doc! {}).await?)
    }
}

/// Connector opening MongoDB connections from their configured URI.
#[derive(Debug, Default, Clone, Copy)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(
        &self,
        name: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentConnection>> {
        info!("Opening MongoDB connection: {}", name);
        let connection = MongoConnection::connect(&config.uri, &config.database).await?;
        Ok(Arc::new(connection))
    }
}
