//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Upsert Strategy ==
/// How create-or-update guarantees a single row per key under concurrent
/// writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpsertStrategy {
    /// One `INSERT ... ON CONFLICT DO UPDATE` statement
    #[default]
    Native,
    /// `INSERT`, falling back to `UPDATE` on a uniqueness conflict
    InsertOrUpdate,
}

impl FromStr for UpsertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(UpsertStrategy::Native),
            "insert-or-update" => Ok(UpsertStrategy::InsertOrUpdate),
            other => Err(format!("Unknown upsert strategy: {}", other)),
        }
    }
}

// == Store Config ==
/// Table identity and write strategy handed to the store at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database schema holding the table (`main` for the primary SQLite file)
    pub schema_name: String,
    /// Cache table name
    pub table_name: String,
    /// Create-or-update strategy
    pub upsert_strategy: UpsertStrategy,
}

impl StoreConfig {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            upsert_strategy: UpsertStrategy::default(),
        }
    }

    pub fn with_upsert_strategy(mut self, strategy: UpsertStrategy) -> Self {
        self.upsert_strategy = strategy;
        self
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// sqlx connection URL of the backing database
    pub database_url: String,
    /// Schema holding the cache table
    pub schema_name: String,
    /// Cache table name
    pub table_name: String,
    /// Sliding window in seconds for entries set without any expiration
    pub default_sliding_expiration: u64,
    /// Expired-item sweep interval in seconds
    pub sweep_interval: u64,
    /// Connection pool size
    pub max_connections: u32,
    /// Create-or-update strategy
    pub upsert_strategy: UpsertStrategy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DATABASE_URL` - Backing database (default: sqlite://cache.db?mode=rwc)
    /// - `CACHE_SCHEMA_NAME` - Schema name (default: main)
    /// - `CACHE_TABLE_NAME` - Table name (default: CACHEITEMS)
    /// - `DEFAULT_SLIDING_EXPIRATION` - Default sliding window in seconds (default: 1200)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 1800)
    /// - `MAX_CONNECTIONS` - Pool size (default: 5)
    /// - `UPSERT_STRATEGY` - `native` or `insert-or-update` (default: native)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("CACHE_DATABASE_URL").unwrap_or(defaults.database_url),
            schema_name: env::var("CACHE_SCHEMA_NAME").unwrap_or(defaults.schema_name),
            table_name: env::var("CACHE_TABLE_NAME").unwrap_or(defaults.table_name),
            default_sliding_expiration: parse_env("DEFAULT_SLIDING_EXPIRATION")
                .unwrap_or(defaults.default_sliding_expiration),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            max_connections: parse_env("MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            upsert_strategy: parse_env("UPSERT_STRATEGY").unwrap_or(defaults.upsert_strategy),
        }
    }

    /// The table identity and strategy for the store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.schema_name, &self.table_name)
            .with_upsert_strategy(self.upsert_strategy)
    }

    pub fn default_sliding(&self) -> Duration {
        Duration::from_secs(self.default_sliding_expiration)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://cache.db?mode=rwc".to_string(),
            schema_name: "main".to_string(),
            table_name: "CACHEITEMS".to_string(),
            default_sliding_expiration: 1200,
            sweep_interval: 1800,
            max_connections: 5,
            upsert_strategy: UpsertStrategy::Native,
        }
    }
}
