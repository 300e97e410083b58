//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value, with or without TTL
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Forget a key
//! - `POST /flush` - Drop the backing collection
//! - `GET /stats` - Collection statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
