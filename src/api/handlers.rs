//! API Handlers
//!
//! HTTP request handlers for each cache admin endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::Repository;
use crate::error::{CacheError, Result};
use crate::models::requests::validate_key;
use crate::models::{
    DeleteResponse, FlushResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
///
/// The repository is a cheap clone over a shared store; the store itself
/// holds no lock, concurrency is left to the backend.
#[derive(Clone)]
pub struct AppState {
    pub cache: Repository,
}

impl AppState {
    /// Creates a new AppState over the given repository.
    pub fn new(cache: Repository) -> Self {
        Self { cache }
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /set
///
/// Stores a value for `minutes`, or forever when no TTL is given.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    match req.minutes {
        Some(minutes) => state.cache.put(&req.key, &req.value, minutes).await?,
        None => state.cache.forever(&req.key, &req.value).await?,
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Missing and expired keys both answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;

    let value: Option<Value> = state.cache.get(&key).await?;
    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Forgetting an absent key still succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;
    state.cache.forget(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /flush
///
/// Drops the whole backing collection, not only this prefix.
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    state.cache.flush().await?;

    Ok(Json(FlushResponse::new(state.cache.store().collection_name())))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let store = state.cache.store();

    Ok(Json(StatsResponse {
        collection: store.collection_name().to_string(),
        prefix: store.prefix().to_string(),
        records: store.count().await?,
    }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
