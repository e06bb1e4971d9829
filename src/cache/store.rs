//! Cache Store Module
//!
//! The expiring cache store: five operations over one relational table plus
//! the startup schema probe. The store keeps no state between calls; every
//! guarantee comes from single-statement atomicity in the database.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::cache::queries::SqlQueries;
use crate::cache::{from_millis, CacheItem, ExpirationPolicy};
use crate::config::{StoreConfig, UpsertStrategy};
use crate::error::{CacheError, Result};

/// Insert attempts made by [`UpsertStrategy::InsertOrUpdate`] before giving up.
pub const MAX_UPSERT_ATTEMPTS: usize = 3;

/// Columns the cache table must expose, matched case-sensitively.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "ID",
    "VALUE",
    "EXPIRESATTIME",
    "SLIDINGEXPIRATIONINSECONDS",
    "ABSOLUTEEXPIRATION",
];

// == Table Info ==
/// Result of the schema probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    /// Schema that owns the table
    pub schema: String,
    /// Table name
    pub name: String,
    /// Object type reported by the database
    pub table_type: String,
}

#[derive(Debug, FromRow)]
struct CacheItemRow {
    #[sqlx(rename = "ID")]
    id: String,
    #[sqlx(rename = "VALUE")]
    value: Vec<u8>,
    #[sqlx(rename = "EXPIRESATTIME")]
    expires_at_time: i64,
    #[sqlx(rename = "SLIDINGEXPIRATIONINSECONDS")]
    sliding_expiration_in_seconds: Option<i64>,
    #[sqlx(rename = "ABSOLUTEEXPIRATION")]
    absolute_expiration: Option<i64>,
}

impl CacheItemRow {
    fn into_item(self) -> Result<CacheItem> {
        Ok(CacheItem {
            id: self.id,
            value: self.value,
            expires_at_time: from_millis(self.expires_at_time)?,
            sliding_expiration_in_seconds: self.sliding_expiration_in_seconds,
            absolute_expiration: self.absolute_expiration.map(from_millis).transpose()?,
        })
    }
}

/// Bound parameters of a full-row write.
struct RowParams<'a> {
    id: &'a str,
    value: &'a [u8],
    expires_at_time: i64,
    sliding_expiration_in_seconds: Option<i64>,
    absolute_expiration: Option<i64>,
}

// == SQL Cache Store ==
/// Expiring key-value store backed by a SQLite table.
#[derive(Debug, Clone)]
pub struct SqlCacheStore {
    pool: SqlitePool,
    queries: SqlQueries,
    config: StoreConfig,
}

impl SqlCacheStore {
    // == Constructor ==
    /// Creates a store over `config`'s table. The table identity is resolved
    /// once here and kept for the lifetime of the store.
    pub fn new(pool: SqlitePool, config: StoreConfig) -> Self {
        Self {
            queries: SqlQueries::new(&config),
            pool,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // == Get ==
    /// Returns the value of `id` if it exists and has not expired at `now`.
    ///
    /// Expired rows that the sweep has not removed yet are reported as absent.
    /// Never changes the row's expiry.
    pub async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>> {
        let value = sqlx::query_scalar::<_, Vec<u8>>(&self.queries.get_cache_item)
            .bind(id)
            .bind(now.timestamp_millis())
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    // == Get Item ==
    /// Reads the full row for `id`, expired or not.
    pub async fn get_item(&self, id: &str) -> Result<Option<CacheItem>> {
        let row = sqlx::query_as::<_, CacheItemRow>(&self.queries.get_cache_item_row)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CacheItemRow::into_item).transpose()
    }

    // == Refresh ==
    /// Slides the expiry of `id` as one conditional update.
    ///
    /// Returns true if a row was extended. Missing, expired, non-sliding and
    /// already-capped rows are left untouched.
    pub async fn refresh(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(&self.queries.refresh_cache_item)
            .bind(id)
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // == Set ==
    /// Creates or replaces `id` with `value` and a fresh expiry under `policy`.
    ///
    /// Afterwards exactly one row exists for `id`, even when several callers
    /// race to create the same key.
    pub async fn set(
        &self,
        id: &str,
        value: &[u8],
        policy: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let row = RowParams {
            id,
            value,
            expires_at_time: policy.initial_expiry(now)?.timestamp_millis(),
            sliding_expiration_in_seconds: policy.sliding_expiration_in_seconds(),
            absolute_expiration: policy.absolute_expiration().map(|at| at.timestamp_millis()),
        };

        match self.config.upsert_strategy {
            UpsertStrategy::Native => {
                self.write_row(&self.queries.upsert_cache_item, &row).await?;
                Ok(())
            }
            UpsertStrategy::InsertOrUpdate => self.insert_or_update(&row).await,
        }
    }

    async fn insert_or_update(&self, row: &RowParams<'_>) -> Result<()> {
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            match self.write_row(&self.queries.insert_cache_item, row).await {
                Ok(_) => return Ok(()),
                Err(err) if err.is_constraint_violation() => {
                    debug!("Key {} already present, updating (attempt {})", row.id, attempt);
                    if self.write_row(&self.queries.update_cache_item, row).await? > 0 {
                        return Ok(());
                    }
                    // Deleted between the insert and the update; insert again.
                }
                Err(err) => return Err(err),
            }
        }

        Err(CacheError::ConstraintViolation(format!(
            "Key {} could not be written after {} attempts",
            row.id, MAX_UPSERT_ATTEMPTS
        )))
    }

    async fn write_row(&self, sql: &str, row: &RowParams<'_>) -> Result<u64> {
        let result = sqlx::query(sql)
            .bind(row.id)
            .bind(row.value)
            .bind(row.expires_at_time)
            .bind(row.sliding_expiration_in_seconds)
            .bind(row.absolute_expiration)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // == Remove ==
    /// Deletes `id` regardless of its remaining life.
    ///
    /// Returns true if a row was removed; removing a missing key is not an error.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(&self.queries.delete_cache_item)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // == Evict Expired ==
    /// Deletes every row that expired before `now`, using `now` as the single
    /// comparison point for the whole statement.
    ///
    /// Returns the number of rows removed.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(&self.queries.delete_expired_cache_items)
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // == Table Info ==
    /// Looks up the configured table in its schema's catalog.
    ///
    /// # Errors
    /// `SchemaMismatch` if no such table exists.
    pub async fn table_info(&self) -> Result<TableInfo> {
        let found = sqlx::query_as::<_, (String, String)>(&self.queries.table_info)
            .bind(&self.config.table_name)
            .fetch_optional(&self.pool)
            .await?;

        match found {
            Some((name, table_type)) => Ok(TableInfo {
                schema: self.config.schema_name.clone(),
                name,
                table_type,
            }),
            None => Err(CacheError::SchemaMismatch(format!(
                "Table {}.{} not found",
                self.config.schema_name, self.config.table_name
            ))),
        }
    }

    // == Verify Table ==
    /// Fails fast if the configured table is missing or lacks a cache column.
    pub async fn verify_table(&self) -> Result<TableInfo> {
        let info = self.table_info().await?;

        let columns = sqlx::query_scalar::<_, String>(&self.queries.table_columns)
            .bind(&self.config.table_name)
            .bind(&self.config.schema_name)
            .fetch_all(&self.pool)
            .await?;

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !columns.iter().any(|c| c == required))
            .collect();

        if !missing.is_empty() {
            return Err(CacheError::SchemaMismatch(format!(
                "Table {}.{} is missing columns: {}",
                info.schema,
                info.name,
                missing.join(", ")
            )));
        }

        info!("Cache table {}.{} verified", info.schema, info.name);
        Ok(info)
    }
}
