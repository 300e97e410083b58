//! Expired-Record Sweep Task
//!
//! Background task that periodically deletes expired records from the
//! backing collection. Reads still delete expired records lazily; this only
//! reclaims records nobody reads again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Repository;

/// Spawns a background task that periodically prunes expired records.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Backend failures are logged and the next sweep retried.
///
/// # Arguments
/// * `cache` - Repository whose collection is swept
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = manager.store().await?;
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Repository, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expired-record sweep with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.store().prune_expired().await {
                Ok(0) => debug!("Sweep: no expired records found"),
                Ok(removed) => info!("Sweep: removed {} expired records", removed),
                Err(e) => warn!("Sweep failed: {}", e),
            }
        }
    })
}
