//! Expired-Item Sweep Task
//!
//! Background task that periodically deletes expired rows from the cache table.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::DistributedCache;

/// Spawns a background task that periodically evicts expired cache items.
///
/// The task runs in an infinite loop, sleeping for `interval` between sweeps.
/// A failed sweep is logged and retried on the next tick.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(DistributedCache::new(store, Arc::new(SystemClock), default_sliding));
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(1800));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: Arc<DistributedCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expired-item sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            match cache.evict_expired().await {
                Ok(0) => debug!("Sweep: no expired items found"),
                Ok(removed) => info!("Sweep: removed {} expired items", removed),
                Err(err) => warn!("Sweep failed: {}", err),
            }
        }
    })
}
