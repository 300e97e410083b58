//! Mongo Cache - A key-value cache store backed by a document database
//!
//! Provides get/put/forever/forget/flush over a MongoDB collection with
//! time-based expiration, and a manager that builds stores from configuration.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStore, Repository};
pub use config::Config;
pub use error::{CacheError, ConfigError};
pub use manager::{CacheManager, MongodbDriver};
pub use tasks::spawn_cleanup_task;
