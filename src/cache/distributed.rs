//! Distributed Cache Module
//!
//! The caller-facing cache: validates keys and values, resolves entry options
//! against the clock and sequences fetch-then-refresh on reads.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{
    CacheStats, EntryOptions, SqlCacheStore, StatsRecorder, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::clock::Clock;
use crate::error::{CacheError, Result};

// == Distributed Cache ==
/// Cache facade over a [`SqlCacheStore`].
///
/// Each operation reads the clock exactly once and passes that instant to
/// every statement it issues.
#[derive(Debug)]
pub struct DistributedCache {
    store: Arc<SqlCacheStore>,
    clock: Arc<dyn Clock>,
    default_sliding: Duration,
    stats: StatsRecorder,
}

impl DistributedCache {
    // == Constructor ==
    /// Creates a cache.
    ///
    /// # Arguments
    /// * `store` - Backing store
    /// * `clock` - Source of the current time
    /// * `default_sliding` - Sliding window for entries set without any expiration
    pub fn new(store: Arc<SqlCacheStore>, clock: Arc<dyn Clock>, default_sliding: Duration) -> Self {
        Self {
            store,
            clock,
            default_sliding,
            stats: StatsRecorder::new(),
        }
    }

    pub fn store(&self) -> &SqlCacheStore {
        &self.store
    }

    // == Get ==
    /// Returns the value for `key` and renews its sliding window.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let now = self.clock.now();

        let value = self.store.get(key, now).await?;
        match value {
            Some(_) => {
                self.stats.record_hit();
                if self.store.refresh(key, now).await? {
                    self.stats.record_refresh();
                }
            }
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    /// Returns the value for `key` without touching its expiry.
    pub async fn get_without_refresh(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let value = self.store.get(key, self.clock.now()).await?;
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    // == Set ==
    /// Stores `value` under `key` with the expiration described by `options`.
    ///
    /// Overwrites any existing entry, including its expiration policy.
    pub async fn set(&self, key: &str, value: &[u8], options: &EntryOptions) -> Result<()> {
        validate_key(key)?;
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let now = self.clock.now();
        let policy = options.resolve(now, self.default_sliding)?;
        self.store.set(key, value, policy, now).await
    }

    // == Refresh ==
    /// Renews the sliding window of `key` without reading it.
    pub async fn refresh(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        if self.store.refresh(key, self.clock.now()).await? {
            self.stats.record_refresh();
        }
        Ok(())
    }

    // == Remove ==
    /// Removes `key`. Removing a missing key succeeds.
    pub async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let removed = self.store.remove(key).await?;
        if !removed {
            debug!("Remove of absent key {}", key);
        }
        Ok(())
    }

    // == Evict Expired ==
    /// Removes every expired entry. Returns the number of rows removed.
    pub async fn evict_expired(&self) -> Result<u64> {
        let removed = self.store.evict_expired(self.clock.now()).await?;
        self.stats.record_evictions(removed);
        Ok(removed)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
