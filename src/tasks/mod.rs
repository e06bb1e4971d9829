//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expired-item sweep: deletes expired rows at the configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
