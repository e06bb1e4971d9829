//! SQL Cache - A durable key-value cache on a relational table
//!
//! Provides get/set/refresh/remove over a single table with sliding and
//! absolute expiration, plus a periodic sweep of expired rows.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{DistributedCache, EntryOptions, SqlCacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, StoreConfig, UpsertStrategy};
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
