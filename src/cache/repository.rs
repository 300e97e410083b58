//! Cache Repository Module
//!
//! Cloneable handle over a `CacheStore` with the convenience operations
//! callers expect from a cache (`has`, `pull`, `add`, `remember`, ...).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheStore;
use crate::error::Result;

/// Shared cache handle returned by the manager.
#[derive(Debug, Clone)]
pub struct Repository {
    store: Arc<CacheStore>,
}

impl Repository {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The underlying store, for backend introspection.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.store.get(key).await
    }

    /// Like `get`, falling back to `default` when the key is absent.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.store.get(key).await?.unwrap_or(default))
    }

    /// True when a live, non-null value is stored under `key`.
    pub async fn has(&self, key: &str) -> Result<bool> {
        let value: Option<serde_json::Value> = self.store.get(key).await?;
        Ok(value.is_some_and(|v| !v.is_null()))
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T, minutes: u64) -> Result<()> {
        self.store.put(key, value, minutes).await
    }

    pub async fn forever<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.store.forever(key, value).await
    }

    pub async fn forget(&self, key: &str) -> Result<()> {
        self.store.forget(key).await
    }

    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    pub fn increment(&self, key: &str, amount: i64) -> Result<i64> {
        self.store.increment(key, amount)
    }

    pub fn decrement(&self, key: &str, amount: i64) -> Result<i64> {
        self.store.decrement(key, amount)
    }

    // == Pull ==
    /// Retrieves a value and removes it from the cache.
    pub async fn pull<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value = self.store.get(key).await?;
        self.store.forget(key).await?;
        Ok(value)
    }

    // == Add ==
    /// Stores a value only if the key holds nothing yet.
    ///
    /// Returns whether the value was written. Check-then-put, so two
    /// concurrent callers may both succeed.
    pub async fn add<T: Serialize + ?Sized>(&self, key: &str, value: &T, minutes: u64) -> Result<bool> {
        if self.has(key).await? {
            return Ok(false);
        }
        self.store.put(key, value, minutes).await?;
        Ok(true)
    }

    // == Remember ==
    /// Returns the cached value, or computes, stores and returns it.
    pub async fn remember<T, F, Fut>(&self, key: &str, minutes: u64, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(value) = self.store.get(key).await? {
            return Ok(value);
        }
        let value = compute().await;
        self.store.put(key, &value, minutes).await?;
        Ok(value)
    }

    /// `remember` with the `forever` TTL.
    pub async fn remember_forever<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(value) = self.store.get(key).await? {
            return Ok(value);
        }
        let value = compute().await;
        self.store.forever(key, &value).await?;
        Ok(value)
    }

    // == Many ==
    /// Retrieves several keys; absent or expired ones map to `None`.
    pub async fn many<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<HashMap<String, Option<T>>> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            values.insert((*key).to_string(), self.store.get(key).await?);
        }
        Ok(values)
    }

    /// Stores every pair with the same TTL.
    pub async fn put_many<'a, T, I>(&self, values: I, minutes: u64) -> Result<()>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = (&'a str, &'a T)>,
    {
        for (key, value) in values {
            self.store.put(key, value, minutes).await?;
        }
        Ok(())
    }
}
