//! Integration Tests for the Expiring Cache Store
//!
//! Exercises the public store and facade against a file-backed SQLite table.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{at, create_pool, create_store};
use sql_cache::cache::ExpirationPolicy;
use sql_cache::{
    CacheError, DistributedCache, EntryOptions, ManualClock, SqlCacheStore, StoreConfig,
    UpsertStrategy,
};

// == End-to-End Scenario ==

#[tokio::test]
async fn test_sliding_item_lifecycle() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;

    store
        .set("k", b"v", ExpirationPolicy::sliding(30).unwrap(), at(0))
        .await
        .unwrap();

    assert_eq!(store.get("k", at(10)).await.unwrap().as_deref(), Some(&b"v"[..]));
    assert!(store.refresh("k", at(10)).await.unwrap());

    let item = store.get_item("k").await.unwrap().unwrap();
    assert_eq!(item.expires_at_time, at(40));

    assert_eq!(store.get("k", at(35)).await.unwrap().as_deref(), Some(&b"v"[..]));

    assert_eq!(store.evict_expired(at(41)).await.unwrap(), 1);
    assert!(store.get("k", at(41)).await.unwrap().is_none());
    assert!(store.get_item("k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_facade_lifecycle_with_manual_clock() {
    let (store, _dir) = create_store(UpsertStrategy::InsertOrUpdate).await;
    let clock = Arc::new(ManualClock::at_secs(0));
    let cache = DistributedCache::new(Arc::new(store), clock.clone(), Duration::from_secs(1200));

    let options = EntryOptions::new().with_sliding_expiration(Duration::from_secs(30));
    cache.set("k", b"v", &options).await.unwrap();

    // get renews the window: expiry 10 + 30
    clock.set(at(10));
    assert!(cache.get("k").await.unwrap().is_some());

    clock.set(at(35));
    assert!(cache.get_without_refresh("k").await.unwrap().is_some());

    clock.set(at(41));
    assert_eq!(cache.evict_expired().await.unwrap(), 1);
    assert!(cache.get("k").await.unwrap().is_none());

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
}

// == Expiration Properties ==

#[tokio::test]
async fn test_non_sliding_item_never_moves() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;
    store
        .set("k", b"v", ExpirationPolicy::absolute(at(100)), at(0))
        .await
        .unwrap();

    for t in [0, 10, 50, 99, 100] {
        assert!(!store.refresh("k", at(t)).await.unwrap());
    }

    let item = store.get_item("k").await.unwrap().unwrap();
    assert_eq!(item.expires_at_time, at(100));
    assert_eq!(item.absolute_expiration, Some(at(100)));
}

#[tokio::test]
async fn test_ceiling_snap_and_idempotence() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;
    let policy = ExpirationPolicy::sliding_with_ceiling(30, at(100)).unwrap();
    store.set("k", b"v", policy, at(0)).await.unwrap();

    // Far from the ceiling: plain slide
    assert!(store.refresh("k", at(25)).await.unwrap());
    assert_eq!(store.get_item("k").await.unwrap().unwrap().expires_at_time, at(55));

    assert!(store.refresh("k", at(50)).await.unwrap());
    assert_eq!(store.get_item("k").await.unwrap().unwrap().expires_at_time, at(80));

    // Within one window of the ceiling: snap
    assert!(store.refresh("k", at(75)).await.unwrap());
    assert_eq!(store.get_item("k").await.unwrap().unwrap().expires_at_time, at(100));

    // Snapped: further refreshes are no-ops
    assert!(!store.refresh("k", at(80)).await.unwrap());
    assert!(!store.refresh("k", at(99)).await.unwrap());
    assert_eq!(store.get_item("k").await.unwrap().unwrap().expires_at_time, at(100));
}

#[tokio::test]
async fn test_upsert_replaces_value_and_policy() {
    for strategy in [UpsertStrategy::Native, UpsertStrategy::InsertOrUpdate] {
        let (store, _dir) = create_store(strategy).await;

        store
            .set("k", b"v1", ExpirationPolicy::absolute(at(100)), at(0))
            .await
            .unwrap();
        store
            .set("k", b"v2", ExpirationPolicy::sliding(30).unwrap(), at(20))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "CACHEITEMS" WHERE "ID" = 'k'"#)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let item = store.get_item("k").await.unwrap().unwrap();
        assert_eq!(item.value, b"v2");
        assert_eq!(item.expires_at_time, at(50));
        assert_eq!(item.sliding_expiration_in_seconds, Some(30));
        assert_eq!(item.absolute_expiration, None);
    }
}

#[tokio::test]
async fn test_sweep_precision() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;
    for (key, expiry) in [("past", 5), ("edge", 10), ("future", 20)] {
        store
            .set(key, b"v", ExpirationPolicy::absolute(at(expiry)), at(0))
            .await
            .unwrap();
    }

    assert_eq!(store.evict_expired(at(10)).await.unwrap(), 1);

    assert!(store.get_item("past").await.unwrap().is_none());
    assert!(store.get_item("edge").await.unwrap().is_some());
    assert!(store.get_item("future").await.unwrap().is_some());
}

#[tokio::test]
async fn test_refreshed_item_survives_sweep() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;
    store
        .set("k", b"v", ExpirationPolicy::sliding(10).unwrap(), at(0))
        .await
        .unwrap();

    assert!(store.refresh("k", at(9)).await.unwrap());
    assert_eq!(store.evict_expired(at(15)).await.unwrap(), 0);
    assert!(store.get("k", at(15)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_remove_missing_key() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;

    assert!(!store.remove("ghost").await.unwrap());
    assert!(store.get("ghost", at(0)).await.unwrap().is_none());
}

// == Concurrency ==

#[tokio::test]
async fn test_concurrent_set_on_new_key_leaves_one_row() {
    for strategy in [UpsertStrategy::Native, UpsertStrategy::InsertOrUpdate] {
        let (store, _dir) = create_store(strategy).await;
        let store = Arc::new(store);

        let mut handles = vec![];
        for i in 0..8u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let policy = ExpirationPolicy::sliding(60).unwrap();
                store.set("contended", &[i], policy, at(0)).await
            }));
        }
        for handle in handles {
            handle.await.expect("task should not panic").unwrap();
        }

        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "CACHEITEMS""#)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1, "{:?} should leave a single row", strategy);

        let value = store.get("contended", at(0)).await.unwrap().unwrap();
        assert_eq!(value.len(), 1);
        assert!(value[0] < 8);
    }
}

#[tokio::test]
async fn test_concurrent_refresh_and_sweep() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;
    let store = Arc::new(store);
    for i in 0..20 {
        store
            .set(&format!("k{}", i), b"v", ExpirationPolicy::sliding(10).unwrap(), at(0))
            .await
            .unwrap();
    }

    let refresher = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..20 {
                store.refresh(&format!("k{}", i), at(10)).await.unwrap();
            }
        })
    };
    let sweeper = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.evict_expired(at(10)).await.unwrap() })
    };

    refresher.await.unwrap();
    // Nothing is strictly past its expiry at t=10
    assert_eq!(sweeper.await.unwrap(), 0);

    for i in 0..20 {
        let item = store.get_item(&format!("k{}", i)).await.unwrap().unwrap();
        assert_eq!(item.expires_at_time, at(20));
    }
}

// == Schema Probe ==

#[tokio::test]
async fn test_verify_table() {
    let (store, _dir) = create_store(UpsertStrategy::Native).await;

    let info = store.verify_table().await.unwrap();
    assert_eq!(info.schema, "main");
    assert_eq!(info.name, "CACHEITEMS");
}

#[tokio::test]
async fn test_verify_missing_table_fails_fast() {
    let (pool, _dir) = create_pool(1).await;
    let store = SqlCacheStore::new(pool, StoreConfig::new("main", "ELSEWHERE"));

    let result = store.verify_table().await;
    assert!(matches!(result, Err(CacheError::SchemaMismatch(_))));
}

#[tokio::test]
async fn test_verify_unknown_schema_is_backend_error() {
    let (pool, _dir) = create_pool(1).await;
    let store = SqlCacheStore::new(pool, StoreConfig::new("nowhere", "CACHEITEMS"));

    let result = store.verify_table().await;
    assert!(matches!(result, Err(CacheError::BackendUnavailable(_))));
}
