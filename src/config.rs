//! Configuration Module
//!
//! Handles loading cache, database connection and server settings from
//! environment variables or a JSON document.

use std::collections::HashMap;
use std::env;

use serde::Deserialize;

use crate::error::Result;

/// Driver identifier of the document-database connection and cache driver.
pub const MONGODB_DRIVER: &str = "mongodb";

/// Cache configuration (`cache.*` options).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Default cache driver identifier
    pub driver: String,
    /// Name of the database connection backing the cache
    pub connection: Option<String>,
    /// Name of the backing collection
    pub table: String,
    /// String prepended to every logical key
    pub prefix: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            driver: MONGODB_DRIVER.to_string(),
            connection: None,
            table: "cache".to_string(),
            prefix: String::new(),
        }
    }
}

/// A single named database connection (`database.connections.<name>`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Driver type of the connection, e.g. `mongodb`
    pub driver: String,
    /// Connection string
    #[serde(default)]
    pub uri: String,
    /// Database name on the server
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "cache".to_string()
}

impl ConnectionConfig {
    /// Creates a MongoDB connection entry.
    pub fn mongodb(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver: MONGODB_DRIVER.to_string(),
            uri: uri.into(),
            database: database.into(),
        }
    }
}

/// Database configuration (`database.*` options).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Configured connections keyed by name
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Application configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheSettings,
    pub database: DatabaseSettings,
    /// HTTP admin server port
    pub server_port: u16,
    /// Expired-record sweep interval in seconds, 0 disables it
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DRIVER` - Default cache driver (default: mongodb)
    /// - `CACHE_CONNECTION` - Connection backing the cache (no default)
    /// - `CACHE_TABLE` - Backing collection name (default: cache)
    /// - `CACHE_PREFIX` - Key prefix (default: empty)
    /// - `MONGODB_URI` - When set, registers a MongoDB connection
    /// - `MONGODB_CONNECTION` - Name of that connection (default: mongodb)
    /// - `MONGODB_DATABASE` - Database of that connection (default: cache)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = CacheSettings::default();
        let cache = CacheSettings {
            driver: env::var("CACHE_DRIVER").unwrap_or(defaults.driver),
            connection: env::var("CACHE_CONNECTION")
                .ok()
                .filter(|v| !v.is_empty()),
            table: env::var("CACHE_TABLE").unwrap_or(defaults.table),
            prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.prefix),
        };

        let mut database = DatabaseSettings::default();
        if let Ok(uri) = env::var("MONGODB_URI") {
            let name = env::var("MONGODB_CONNECTION").unwrap_or_else(|_| MONGODB_DRIVER.to_string());
            let db_name = env::var("MONGODB_DATABASE").unwrap_or_else(|_| default_database());
            database
                .connections
                .insert(name, ConnectionConfig::mongodb(uri, db_name));
        }

        Self {
            cache,
            database,
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }

    /// Parses a Config from a JSON document; missing sections take defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Registers a named database connection.
    pub fn with_connection(mut self, name: impl Into<String>, connection: ConnectionConfig) -> Self {
        self.database.connections.insert(name.into(), connection);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            database: DatabaseSettings::default(),
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}
