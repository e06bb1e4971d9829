//! SQL Statements Module
//!
//! Renders every statement the store issues against the configured table.
//! Table identity is fixed at construction; all values are bound as numbered
//! parameters. Timestamps are Unix milliseconds, sliding windows are whole
//! seconds scaled to milliseconds inside the statement.

use crate::config::StoreConfig;

/// Column list shared by every statement that reads or writes a whole row.
const COLUMNS: &str = r#""ID", "VALUE", "EXPIRESATTIME", "SLIDINGEXPIRATIONINSECONDS", "ABSOLUTEEXPIRATION""#;

// == SQL Queries ==
/// The statements for one cache table.
#[derive(Debug, Clone)]
pub struct SqlQueries {
    /// `?1` = Id, `?2` = UtcNow
    pub get_cache_item: String,
    /// `?1` = Id
    pub get_cache_item_row: String,
    /// `?1` = Id, `?2` = UtcNow
    pub refresh_cache_item: String,
    /// `?1..?5` = Id, Value, ExpiresAtTime, SlidingExpirationInSeconds, AbsoluteExpiration
    pub upsert_cache_item: String,
    /// Same parameters as `upsert_cache_item`
    pub insert_cache_item: String,
    /// Same parameters as `upsert_cache_item`
    pub update_cache_item: String,
    /// `?1` = Id
    pub delete_cache_item: String,
    /// `?1` = UtcNow
    pub delete_expired_cache_items: String,
    /// `?1` = table name
    pub table_info: String,
    /// `?1` = table name, `?2` = schema name
    pub table_columns: String,
}

impl SqlQueries {
    pub fn new(config: &StoreConfig) -> Self {
        let table = format!(
            "{}.{}",
            delimit_identifier(&config.schema_name),
            delimit_identifier(&config.table_name)
        );

        Self {
            get_cache_item: format!(
                r#"SELECT "VALUE"
FROM {table}
WHERE "ID" = ?1
  AND ?2 <= "EXPIRESATTIME""#
            ),
            get_cache_item_row: format!(
                r#"SELECT {COLUMNS}
FROM {table}
WHERE "ID" = ?1"#
            ),
            refresh_cache_item: format!(
                r#"UPDATE {table}
SET "EXPIRESATTIME" =
        (CASE
             WHEN "ABSOLUTEEXPIRATION" - ?2 <= "SLIDINGEXPIRATIONINSECONDS" * 1000
                 THEN "ABSOLUTEEXPIRATION"
             ELSE ?2 + "SLIDINGEXPIRATIONINSECONDS" * 1000
         END)
WHERE "ID" = ?1
  AND ?2 <= "EXPIRESATTIME"
  AND "SLIDINGEXPIRATIONINSECONDS" IS NOT NULL
  AND ("ABSOLUTEEXPIRATION" IS NULL OR "ABSOLUTEEXPIRATION" != "EXPIRESATTIME")"#
            ),
            upsert_cache_item: format!(
                r#"INSERT INTO {table} ({COLUMNS})
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT ("ID") DO UPDATE
SET "VALUE"                      = excluded."VALUE",
    "EXPIRESATTIME"              = excluded."EXPIRESATTIME",
    "SLIDINGEXPIRATIONINSECONDS" = excluded."SLIDINGEXPIRATIONINSECONDS",
    "ABSOLUTEEXPIRATION"         = excluded."ABSOLUTEEXPIRATION""#
            ),
            insert_cache_item: format!(
                r#"INSERT INTO {table} ({COLUMNS})
VALUES (?1, ?2, ?3, ?4, ?5)"#
            ),
            update_cache_item: format!(
                r#"UPDATE {table}
SET "VALUE"                      = ?2,
    "EXPIRESATTIME"              = ?3,
    "SLIDINGEXPIRATIONINSECONDS" = ?4,
    "ABSOLUTEEXPIRATION"         = ?5
WHERE "ID" = ?1"#
            ),
            delete_cache_item: format!(
                r#"DELETE
FROM {table}
WHERE "ID" = ?1"#
            ),
            delete_expired_cache_items: format!(
                r#"DELETE
FROM {table}
WHERE ?1 > "EXPIRESATTIME""#
            ),
            table_info: format!(
                r#"SELECT "name", "type"
FROM {}."sqlite_master"
WHERE "type" = 'table'
  AND "name" = ?1"#,
                delimit_identifier(&config.schema_name)
            ),
            table_columns: r#"SELECT "name" FROM pragma_table_info(?1, ?2)"#.to_string(),
        }
    }
}

/// Quotes an identifier, doubling any embedded quote.
fn delimit_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
