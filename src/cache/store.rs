//! Cache Store Module
//!
//! Key-value cache over a single document collection: key prefixing,
//! expiration checks, and the insert-vs-update decision on write.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::backend::{DocumentCollection, DocumentConnection};
use crate::cache::{CacheRecord, Clock, SystemClock, ValueCodec};
use crate::error::{CacheError, Result};

/// TTL used by `forever`, in minutes (about ten years).
pub const FOREVER_MINUTES: u64 = 5_256_000;

// == Cache Store ==
/// Cache store bound to one collection of a document-database connection.
///
/// Holds no mutable state of its own; concurrent callers share the
/// connection and rely on the backend's per-document atomicity.
pub struct CacheStore {
    /// Connection the collection belongs to
    connection: Arc<dyn DocumentConnection>,
    /// Backing collection handle
    collection: Arc<dyn DocumentCollection>,
    /// Optional encode/decode step for stored values
    codec: Option<Arc<dyn ValueCodec>>,
    collection_name: String,
    /// Prepended to every caller-supplied key
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store over `collection_name` on the given connection.
    ///
    /// # Arguments
    /// * `connection` - Open document-database connection
    /// * `collection_name` - Name of the backing collection
    /// * `prefix` - String prepended to every key
    pub async fn new(
        connection: Arc<dyn DocumentConnection>,
        collection_name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let collection_name = collection_name.into();
        let collection = connection.collection(&collection_name).await?;

        Ok(Self {
            connection,
            collection,
            codec: None,
            collection_name,
            prefix: prefix.into(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Applies `codec` to every value written and read.
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replaces the wall clock, mostly for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn expiration_after(&self, minutes: u64) -> Result<DateTime<Utc>> {
        let now = self.clock.now().timestamp();
        i64::try_from(minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .and_then(|secs| now.checked_add(secs))
            .and_then(|at| DateTime::from_timestamp(at, 0))
            .ok_or_else(|| {
                CacheError::InvalidRequest(format!("TTL of {} minutes is out of range", minutes))
            })
    }

    // == Get ==
    /// Retrieves and deserializes a value by key.
    ///
    /// Returns `None` for a missing key. An expired record is deleted and
    /// also reported as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Retrieves the decoded JSON text stored under `key`.
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let full_key = self.full_key(key);

        let Some(record) = self.collection.find(&full_key).await? else {
            return Ok(None);
        };

        if record.is_expired_at(self.clock.now()) {
            debug!("Key {} expired, removing", full_key);
            self.forget_full(&full_key).await?;
            return Ok(None);
        }

        match &self.codec {
            Some(codec) => codec.decode(record.value).map(Some),
            None => Ok(Some(record.value)),
        }
    }

    // == Put ==
    /// Stores a value for `minutes` minutes, replacing any existing record.
    ///
    /// A zero TTL writes a record that is already expired.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T, minutes: u64) -> Result<()> {
        let full_key = self.full_key(key);

        let mut encoded = serde_json::to_string(value)?;
        if let Some(codec) = &self.codec {
            encoded = codec.encode(encoded)?;
        }

        let record = CacheRecord::new(full_key, encoded, self.expiration_after(minutes)?);

        match self.collection.find(&record.key).await? {
            Some(_) => {
                if !self.collection.update(&record).await? {
                    // Removed between find and update
                    self.insert_or_update(&record).await?;
                }
            }
            None => self.insert_or_update(&record).await?,
        }

        debug!("Stored {} until {}", record.key, record.expiration);
        Ok(())
    }

    /// Inserts `record`; a concurrent writer that inserted first turns this
    /// into an update of its record.
    async fn insert_or_update(&self, record: &CacheRecord) -> Result<()> {
        match self.collection.insert(record).await {
            Err(CacheError::DuplicateKey(key)) => {
                debug!("Insert conflict on {}, retrying as update", key);
                self.collection.update(record).await?;
                Ok(())
            }
            other => other,
        }
    }

    // == Forever ==
    /// Stores a value with a TTL of `FOREVER_MINUTES`.
    pub async fn forever<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.put(key, value, FOREVER_MINUTES).await
    }

    // == Forget ==
    /// Removes a key. Absent keys are a no-op.
    pub async fn forget(&self, key: &str) -> Result<()> {
        self.forget_full(&self.full_key(key)).await
    }

    async fn forget_full(&self, full_key: &str) -> Result<()> {
        let removed = self.collection.delete(full_key).await?;
        if removed > 0 {
            debug!("Removed {}", full_key);
        }
        Ok(())
    }

    // == Flush ==
    /// Drops the entire backing collection, every prefix included.
    pub async fn flush(&self) -> Result<()> {
        self.collection.drop_collection().await?;
        info!("Flushed cache collection {}", self.collection_name);
        Ok(())
    }

    // == Increment / Decrement ==
    /// Always fails: stored values are opaque payloads.
    pub fn increment(&self, _key: &str, _amount: i64) -> Result<i64> {
        Err(CacheError::UnsupportedOperation("increment"))
    }

    /// Always fails: stored values are opaque payloads.
    pub fn decrement(&self, _key: &str, _amount: i64) -> Result<i64> {
        Err(CacheError::UnsupportedOperation("decrement"))
    }

    // == Cleanup Expired ==
    /// Removes every expired record in the collection.
    ///
    /// Returns the number of records removed.
    pub async fn prune_expired(&self) -> Result<u64> {
        self.collection.delete_expired(self.clock.now()).await
    }

    /// Number of records physically present in the collection.
    pub async fn count(&self) -> Result<u64> {
        self.collection.count().await
    }

    // == Accessors ==
    pub fn connection(&self) -> &Arc<dyn DocumentConnection> {
        &self.connection
    }

    pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }

    pub fn codec(&self) -> Option<&Arc<dyn ValueCodec>> {
        self.codec.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("driver", &self.connection.driver_name())
            .field("collection", &self.collection_name)
            .field("prefix", &self.prefix)
            .field("codec", &self.codec)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryConnection;
    use crate::cache::ManualClock;

    /// Reverses the serialized text so stored payloads differ from plain JSON.
    #[derive(Debug)]
    struct ReverseCodec;

    impl ValueCodec for ReverseCodec {
        fn encode(&self, plain: String) -> Result<String> {
            Ok(plain.chars().rev().collect())
        }

        fn decode(&self, stored: String) -> Result<String> {
            Ok(stored.chars().rev().collect())
        }
    }

    async fn store_at(
        connection: &MemoryConnection,
        prefix: &str,
        clock: &Arc<ManualClock>,
    ) -> CacheStore {
        CacheStore::new(Arc::new(connection.clone()), "cache", prefix)
            .await
            .unwrap()
            .with_clock(clock.clone())
    }

    #[tokio::test]
    async fn test_store_put_and_get() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("key1", "value1", 10).await.unwrap();
        let value: Option<String> = store.get("key1").await.unwrap();

        assert_eq!(value.as_deref(), Some("value1"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        let value: Option<String> = store.get("nonexistent").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_session_expiration_scenario() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("session:42", "payload", 1).await.unwrap();

        clock.set(1030);
        let value: Option<String> = store.get("session:42").await.unwrap();
        assert_eq!(value.as_deref(), Some("payload"));

        clock.set(1061);
        let value: Option<String> = store.get("session:42").await.unwrap();
        assert!(value.is_none());
        assert!(store.collection().find("session:42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_at_exact_boundary() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("k", &1, 1).await.unwrap();

        clock.set(1059);
        assert_eq!(store.get::<i32>("k").await.unwrap(), Some(1));

        clock.set(1060);
        assert_eq!(store.get::<i32>("k").await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_record_is_deleted_under_prefix() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "app:", &clock).await;

        store.put("k", "v", 1).await.unwrap();
        clock.advance(120);

        assert!(store.get::<String>("k").await.unwrap().is_none());
        assert!(store.collection().find("app:k").await.unwrap().is_none());
        assert!(store.get::<String>("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forever_scenario() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.forever("flag", &true).await.unwrap();
        assert_eq!(store.get::<bool>("flag").await.unwrap(), Some(true));

        let record = store.collection().find("flag").await.unwrap().unwrap();
        assert_eq!(record.expiration.timestamp(), 1000 + 315_360_000);
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("key1", "value1", 1).await.unwrap();
        store.put("key1", "value2", 5).await.unwrap();

        assert_eq!(store.get::<String>("key1").await.unwrap().as_deref(), Some("value2"));
        assert_eq!(store.count().await.unwrap(), 1);

        let record = store.collection().find("key1").await.unwrap().unwrap();
        assert_eq!(record.expiration.timestamp(), 1300);
    }

    #[tokio::test]
    async fn test_store_forget() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "p:", &clock).await;

        store.put("key1", "value1", 1).await.unwrap();
        store.forget("key1").await.unwrap();

        assert!(store.get::<String>("key1").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_forget_is_idempotent() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.forget("missing").await.unwrap();
        store.forget("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_prefix_isolation() {
        let clock = Arc::new(ManualClock::at(1000));
        let connection = MemoryConnection::new();
        let p1 = store_at(&connection, "p1", &clock).await;
        let p2 = store_at(&connection, "p2", &clock).await;

        p1.put("a", "one", 10).await.unwrap();
        p2.put("a", "two", 10).await.unwrap();

        assert_eq!(p1.get::<String>("a").await.unwrap().as_deref(), Some("one"));
        assert_eq!(p2.get::<String>("a").await.unwrap().as_deref(), Some("two"));
        assert_eq!(p1.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_flush_is_collection_wide() {
        let clock = Arc::new(ManualClock::at(1000));
        let connection = MemoryConnection::new();
        let p1 = store_at(&connection, "p1", &clock).await;
        let p2 = store_at(&connection, "p2", &clock).await;

        p1.put("a", "one", 10).await.unwrap();
        p2.put("b", "two", 10).await.unwrap();
        p1.flush().await.unwrap();

        assert!(p2.get::<String>("b").await.unwrap().is_none());
        assert_eq!(p2.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_and_decrement_unsupported() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;
        store.put("counter", &1, 10).await.unwrap();

        for key in ["counter", "missing"] {
            assert!(matches!(
                store.increment(key, 1),
                Err(CacheError::UnsupportedOperation("increment"))
            ));
            assert!(matches!(
                store.decrement(key, 1),
                Err(CacheError::UnsupportedOperation("decrement"))
            ));
        }
        assert_eq!(store.get::<i32>("counter").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_codec_applied_on_write_and_read() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock)
            .await
            .with_codec(Arc::new(ReverseCodec));

        store.put("k", "abc", 10).await.unwrap();

        let record = store.collection().find("k").await.unwrap().unwrap();
        assert_eq!(record.value, "\"cba\"");
        assert_eq!(store.get::<String>("k").await.unwrap().as_deref(), Some("abc"));
        assert!(store.codec().is_some());
    }

    #[tokio::test]
    async fn test_structured_values() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Session {
            user_id: u64,
            roles: Vec<String>,
        }

        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;
        let session = Session {
            user_id: 42,
            roles: vec!["admin".to_string()],
        };

        store.put("session", &session, 10).await.unwrap();
        assert_eq!(store.get::<Session>("session").await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_wrong_type_is_serialization_error() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("k", "text", 10).await.unwrap();
        assert!(matches!(
            store.get::<u64>("k").await,
            Err(CacheError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_already_expired() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("k", "v", 0).await.unwrap();
        assert!(store.get::<String>("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_out_of_range() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        let result = store.put("k", "v", u64::MAX).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_expired() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "", &clock).await;

        store.put("short", "v", 1).await.unwrap();
        store.put("long", "v", 10).await.unwrap();
        clock.advance(60);

        assert_eq!(store.prune_expired().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_leave_one_record() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = Arc::new(store_at(&MemoryConnection::new(), "", &clock).await);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.put("contended", &i, 10).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 1);
        let value: Option<i32> = store.get("contended").await.unwrap();
        assert!(matches!(value, Some(v) if (0..32).contains(&v)));
    }

    #[tokio::test]
    async fn test_accessors() {
        let clock = Arc::new(ManualClock::at(1000));
        let store = store_at(&MemoryConnection::new(), "app:", &clock).await;

        assert_eq!(store.prefix(), "app:");
        assert_eq!(store.collection_name(), "cache");
        assert_eq!(store.connection().driver_name(), "memory");
        assert!(store.codec().is_none());
    }
}
