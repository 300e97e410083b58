//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Configuration Error Enum ==
/// Problems found while resolving the cache configuration into a store.
///
/// Raised before any store exists; each variant names the offending value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `cache.connection` is not set
    #[error("Cache connection is not defined.")]
    MissingConnection,

    /// `cache.connection` names a connection absent from `database.connections`
    #[error("Database connection [{0}] is not defined.")]
    UnknownConnection(String),

    /// The named connection uses another driver
    #[error("Database connection [{connection}] should use the {expected} driver, found {found}.")]
    WrongDriver {
        connection: String,
        expected: String,
        found: String,
    },

    /// No factory is registered under the requested driver name
    #[error("Cache driver [{0}] is not supported.")]
    UnsupportedDriver(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid cache configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Operation the store cannot perform on opaque values
    #[error("{0} operations are not supported by this driver")]
    UnsupportedOperation(&'static str),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found (HTTP surface only, the store reports absence as `None`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A record with this key already exists in the collection
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Value codec failed to encode or decode
    #[error("Codec error: {0}")]
    Codec(String),

    /// Value could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// MongoDB driver failure, propagated as-is
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::UnsupportedOperation(_) => StatusCode::NOT_IMPLEMENTED,
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Mongo(_) | CacheError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Configuration(_)
            | CacheError::DuplicateKey(_)
            | CacheError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
