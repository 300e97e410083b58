//! Backend Module
//!
//! Contract the cache store needs from a document database, plus the
//! in-memory and MongoDB implementations of it.

mod memory;
mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache::CacheRecord;
use crate::config::ConnectionConfig;
use crate::error::Result;

pub use memory::{MemoryCollection, MemoryConnection, MemoryConnector};
pub use mongo::{MongoCollection, MongoConnection, MongoConnector};

/// Handle to one collection of cache records, addressed by the `key` field.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Returns the first record whose `key` equals `key`.
    async fn find(&self, key: &str) -> Result<Option<CacheRecord>>;

    /// Inserts a new record.
    ///
    /// Fails with `CacheError::DuplicateKey` when a record with the same key exists.
    async fn insert(&self, record: &CacheRecord) -> Result<()>;

    /// Replaces the record with the same key. Returns whether one matched.
    async fn update(&self, record: &CacheRecord) -> Result<bool>;

    /// Deletes the record with this key, returning how many were removed.
    async fn delete(&self, key: &str) -> Result<u64>;

    /// Drops the whole collection.
    async fn drop_collection(&self) -> Result<()>;

    /// Deletes every record expired at `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Number of physically present records.
    async fn count(&self) -> Result<u64>;
}

/// An open document-database connection.
#[async_trait]
pub trait DocumentConnection: Send + Sync {
    /// Identifier of the underlying driver.
    fn driver_name(&self) -> &str;

    /// Returns a handle to the named collection.
    async fn collection(&self, name: &str) -> Result<Arc<dyn DocumentCollection>>;
}

/// Opens named connections from their configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        name: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentConnection>>;
}
