//! Shared setup for integration tests.

use chrono::{DateTime, Utc};
use sql_cache::{SqlCacheStore, StoreConfig, UpsertStrategy};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::TempDir;

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub async fn create_pool(max_connections: u32) -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cache.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&db_url)
        .await
        .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE "CACHEITEMS" (
            "ID"                         TEXT    NOT NULL PRIMARY KEY,
            "VALUE"                      BLOB    NOT NULL,
            "EXPIRESATTIME"              INTEGER NOT NULL,
            "SLIDINGEXPIRATIONINSECONDS" INTEGER NULL,
            "ABSOLUTEEXPIRATION"         INTEGER NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    (pool, temp_dir)
}

pub async fn create_store(strategy: UpsertStrategy) -> (SqlCacheStore, TempDir) {
    let (pool, temp_dir) = create_pool(5).await;
    let config = StoreConfig::new("main", "CACHEITEMS").with_upsert_strategy(strategy);
    (SqlCacheStore::new(pool, config), temp_dir)
}
