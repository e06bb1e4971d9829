//! Cache Module
//!
//! Expiring key-value storage on a relational table: the row model and
//! expiration algorithm, the SQL store, and the caller-facing facade.

mod distributed;
mod item;
mod options;
mod queries;
mod stats;
mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public types
pub use distributed::DistributedCache;
pub use item::{from_millis, CacheItem, ExpirationPolicy, MAX_SLIDING_EXPIRATION_SECONDS};
pub use options::EntryOptions;
pub use queries::SqlQueries;
pub use stats::{CacheStats, StatsRecorder};
pub use store::{SqlCacheStore, TableInfo, MAX_UPSERT_ATTEMPTS, REQUIRED_COLUMNS};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
