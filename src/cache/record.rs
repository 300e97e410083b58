//! Cache Record Module
//!
//! Defines the document stored for each live cache entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Record ==
/// One document per live cache entry.
///
/// `key` always carries the store prefix. `expiration` is persisted as a
/// native BSON date so the backend can filter on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Prefixed cache key, unique within the collection
    pub key: String,
    /// Serialized (and possibly encoded) payload
    pub value: String,
    /// Absolute time after which the record is dead
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expiration: DateTime<Utc>,
}

impl CacheRecord {
    // == Constructor ==
    pub fn new(key: impl Into<String>, value: impl Into<String>, expiration: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expiration,
        }
    }

    // == Is Expired ==
    /// Checks if the record is dead at `now`.
    ///
    /// Compared in whole epoch seconds: a record is expired once
    /// `now >= expiration`, so the boundary second itself is already dead.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expiration.timestamp()
    }

    /// Remaining lifetime in seconds at `now`, 0 once expired.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> u64 {
        (self.expiration.timestamp() - now.timestamp()).max(0) as u64
    }
}
