//! In-process document backend.
//!
//! Keeps each collection in a HashMap keyed by record key, which gives the
//! same one-record-per-key guarantee as a unique index.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Connector, DocumentCollection, DocumentConnection};
use crate::cache::CacheRecord;
use crate::config::ConnectionConfig;
use crate::error::{CacheError, Result};

/// One in-memory collection.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    records: RwLock<HashMap<String, CacheRecord>>,
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn insert(&self, record: &CacheRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.key) {
            return Err(CacheError::DuplicateKey(record.key.clone()));
        }
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &CacheRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        Ok(self.records.write().await.remove(key).map_or(0, |_| 1))
    }

    async fn drop_collection(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok((before - records.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}

/// In-memory connection; collections are created on first use.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnection {
    collections: Arc<RwLock<HashMap<String, Arc<MemoryCollection>>>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentConnection for MemoryConnection {
    fn driver_name(&self) -> &str {
        "memory"
    }

    async fn collection(&self, name: &str) -> Result<Arc<dyn DocumentCollection>> {
        let mut collections = self.collections.write().await;
        let collection: Arc<dyn DocumentCollection> = collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating in-memory collection: {}", name);
                Arc::new(MemoryCollection::default())
            })
            .clone();
        Ok(collection)
    }
}

/// Connector that hands out a fresh in-memory connection per name.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryConnector;

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        name: &str,
        _config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentConnection>> {
        debug!("Opening in-memory connection: {}", name);
        Ok(Arc::new(MemoryConnection::new()))
    }
}
