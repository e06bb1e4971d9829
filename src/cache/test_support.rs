//! Shared fixtures for store and facade tests.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::TempDir;

use crate::cache::SqlCacheStore;
use crate::config::{StoreConfig, UpsertStrategy};

/// Instant `secs` seconds past the Unix epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub async fn create_table(pool: &SqlitePool) {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "CACHEITEMS" (
            "ID"                         TEXT    NOT NULL PRIMARY KEY,
            "VALUE"                      BLOB    NOT NULL,
            "EXPIRESATTIME"              INTEGER NOT NULL,
            "SLIDINGEXPIRATIONINSECONDS" INTEGER NULL,
            "ABSOLUTEEXPIRATION"         INTEGER NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS "Index_ExpiresAtTime" ON "CACHEITEMS" ("EXPIRESATTIME")"#,
    )
    .execute(pool)
    .await
    .unwrap();
}

/// A store over a fresh file-backed database. Keep the `TempDir` alive for
/// the duration of the test.
pub async fn setup_store(strategy: UpsertStrategy) -> (SqlCacheStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cache.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .unwrap();
    create_table(&pool).await;

    let config = StoreConfig::new("main", "CACHEITEMS").with_upsert_strategy(strategy);
    (SqlCacheStore::new(pool, config), temp_dir)
}
