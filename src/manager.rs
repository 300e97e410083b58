//! Cache Manager Module
//!
//! Registry of cache driver factories, resolved lazily by name, and the
//! MongoDB driver that turns configuration into a ready `CacheStore`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::{Connector, DocumentConnection};
use crate::cache::{CacheStore, Repository, ValueCodec};
use crate::config::{Config, ConnectionConfig, MONGODB_DRIVER};
use crate::error::{ConfigError, Result};

/// Builds a cache store for one driver name.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, config: &Config) -> Result<CacheStore>;
}

// == MongoDB Driver ==
/// Factory for the `mongodb` cache driver.
///
/// Validates `cache.connection`, opens (or reuses) that connection through
/// its connector and binds a store to `cache.table` with `cache.prefix`.
pub struct MongodbDriver {
    connector: Arc<dyn Connector>,
    /// Opened connections, keyed by connection name
    connections: Mutex<HashMap<String, Arc<dyn DocumentConnection>>>,
    codec: Option<Arc<dyn ValueCodec>>,
}

impl MongodbDriver {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: Mutex::new(HashMap::new()),
            codec: None,
        }
    }

    /// Stores created by this driver apply `codec` to their values.
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Resolves `cache.connection` to a configured MongoDB connection.
    ///
    /// # Errors
    /// - `MissingConnection` when `cache.connection` is unset
    /// - `UnknownConnection` when it is not in `database.connections`
    /// - `WrongDriver` when that connection does not use the mongodb driver
    pub fn resolve_connection(
        config: &Config,
    ) -> std::result::Result<(&str, &ConnectionConfig), ConfigError> {
        let name = config
            .cache
            .connection
            .as_deref()
            .ok_or(ConfigError::MissingConnection)?;

        let connection = config
            .database
            .connections
            .get(name)
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))?;

        if connection.driver != MONGODB_DRIVER {
            return Err(ConfigError::WrongDriver {
                connection: name.to_string(),
                expected: MONGODB_DRIVER.to_string(),
                found: connection.driver.clone(),
            });
        }

        Ok((name, connection))
    }

    async fn connection(
        &self,
        name: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentConnection>> {
        let mut connections = self.connections.lock().await;
        if let Some(existing) = connections.get(name) {
            debug!("Reusing connection: {}", name);
            return Ok(Arc::clone(existing));
        }

        let connection = self.connector.connect(name, config).await?;
        connections.insert(name.to_string(), Arc::clone(&connection));
        Ok(connection)
    }

    /// Validates the configuration and builds a store bound to it.
    pub async fn create_store(&self, config: &Config) -> Result<CacheStore> {
        let (name, connection_config) = Self::resolve_connection(config)?;
        let connection = self.connection(name, connection_config).await?;

        let mut store =
            CacheStore::new(connection, config.cache.table.clone(), config.cache.prefix.clone())
                .await?;
        if let Some(codec) = &self.codec {
            store = store.with_codec(Arc::clone(codec));
        }

        info!(
            "Cache store ready: connection={}, collection={}, prefix={:?}",
            name, config.cache.table, config.cache.prefix
        );
        Ok(store)
    }
}

#[async_trait]
impl DriverFactory for MongodbDriver {
    async fn create(&self, config: &Config) -> Result<CacheStore> {
        self.create_store(config).await
    }
}

// == Cache Manager ==
/// Resolves cache drivers by name and hands out shared repositories.
///
/// Drivers are created on first resolution and reused afterwards.
pub struct CacheManager {
    config: Config,
    factories: HashMap<String, Arc<dyn DriverFactory>>,
    /// Repositories already built, keyed by driver name
    resolved: Mutex<HashMap<String, Repository>>,
}

impl CacheManager {
    /// Creates a manager with no drivers registered.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factories: HashMap::new(),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a manager with the `mongodb` driver registered.
    pub fn with_mongodb(config: Config, connector: Arc<dyn Connector>) -> Self {
        let mut manager = Self::new(config);
        manager.extend(MONGODB_DRIVER, Arc::new(MongodbDriver::new(connector)));
        manager
    }

    /// Registers `factory` under `driver`, replacing any previous one.
    pub fn extend(&mut self, driver: impl Into<String>, factory: Arc<dyn DriverFactory>) -> &mut Self {
        self.factories.insert(driver.into(), factory);
        self
    }

    /// The configured default driver (`cache.driver`).
    pub fn default_driver_name(&self) -> &str {
        &self.config.cache.driver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the repository for `driver`, or the default driver when `None`.
    ///
    /// # Errors
    /// `ConfigError::UnsupportedDriver` for an unregistered name; otherwise
    /// whatever the driver's factory reports.
    pub async fn driver(&self, driver: Option<&str>) -> Result<Repository> {
        let name = driver.unwrap_or_else(|| self.default_driver_name());

        let mut resolved = self.resolved.lock().await;
        if let Some(repository) = resolved.get(name) {
            return Ok(repository.clone());
        }

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnsupportedDriver(name.to_string()))?;

        debug!("Creating cache driver: {}", name);
        let repository = Repository::new(factory.create(&self.config).await?);
        resolved.insert(name.to_string(), repository.clone());
        Ok(repository)
    }

    /// Repository of the default driver.
    pub async fn store(&self) -> Result<Repository> {
        self.driver(None).await
    }
}
