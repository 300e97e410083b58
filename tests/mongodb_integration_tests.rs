//! Integration Tests against a live MongoDB server
//!
//! Ignored by default. Run with
//! `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.

use std::sync::Arc;

use mongo_cache::backend::MongoConnector;
use mongo_cache::config::ConnectionConfig;
use mongo_cache::{CacheError, CacheManager, Config, ConfigError};

fn mongodb_config(prefix: &str) -> Option<Config> {
    let uri = std::env::var("MONGODB_URI").ok()?;
    let mut config =
        Config::default().with_connection("mongo", ConnectionConfig::mongodb(uri, "mongo_cache_test"));
    config.cache.connection = Some("mongo".to_string());
    config.cache.table = "cache_it".to_string();
    config.cache.prefix = prefix.to_string();
    Some(config)
}

#[tokio::test]
#[ignore]
async fn test_mongodb_round_trip() {
    let Some(config) = mongodb_config("it:") else {
        return;
    };
    let manager = CacheManager::with_mongodb(config, Arc::new(MongoConnector));
    let cache = manager.store().await.unwrap();
    cache.flush().await.unwrap();

    cache.put("k", "v1", 1).await.unwrap();
    cache.put("k", "v2", 1).await.unwrap();
    assert_eq!(cache.get::<String>("k").await.unwrap().as_deref(), Some("v2"));
    assert_eq!(cache.store().count().await.unwrap(), 1);

    let record = cache.store().collection().find("it:k").await.unwrap().unwrap();
    assert_eq!(record.value, "\"v2\"");

    cache.forget("k").await.unwrap();
    cache.forget("k").await.unwrap();
    assert!(cache.get::<String>("k").await.unwrap().is_none());

    cache.put("zero", &1, 0).await.unwrap();
    assert!(cache.get::<i32>("zero").await.unwrap().is_none());
    assert_eq!(cache.store().count().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_mongodb_unique_key_index() {
    let Some(config) = mongodb_config("uniq:") else {
        return;
    };
    let manager = CacheManager::with_mongodb(config, Arc::new(MongoConnector));
    let cache = manager.store().await.unwrap();
    cache.flush().await.unwrap();

    cache.put("k", "v", 1).await.unwrap();
    let record = cache.store().collection().find("uniq:k").await.unwrap().unwrap();
    let duplicate = cache.store().collection().insert(&record).await;
    assert!(matches!(duplicate, Err(CacheError::DuplicateKey(_))));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.put("race", &i, 1).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(cache.store().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_wrong_driver_never_connects() {
    let mut config = Config::default().with_connection(
        "mongo",
        ConnectionConfig {
            driver: "sqlite".to_string(),
            uri: "mongodb://unreachable.invalid".to_string(),
            database: "x".to_string(),
        },
    );
    config.cache.connection = Some("mongo".to_string());

    let manager = CacheManager::with_mongodb(config, Arc::new(MongoConnector));
    let result = manager.store().await;
    assert!(matches!(
        result,
        Err(CacheError::Configuration(ConfigError::WrongDriver { .. }))
    ));
}
