//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expired-record sweep: removes dead records at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
