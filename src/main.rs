//! SQL Cache - sweeper daemon
//!
//! Verifies the cache table and deletes expired rows on a fixed interval until
//! shut down.

use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sql_cache::{spawn_sweep_task, Config, DistributedCache, SqlCacheStore, SystemClock};

/// Main entry point for the cache sweeper.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the database pool
/// 4. Verify the cache table before any cache operation
/// 5. Start the background sweep task
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sql_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SQL cache sweeper");

    let config = Config::from_env();
    info!(
        "Configuration loaded: table={}.{}, default_sliding={}s, sweep_interval={}s, upsert={:?}",
        config.schema_name,
        config.table_name,
        config.default_sliding_expiration,
        config.sweep_interval,
        config.upsert_strategy
    );

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url))?;
    info!("Database connected: {}", config.database_url);

    let store = SqlCacheStore::new(pool.clone(), config.store_config());
    let table = store
        .verify_table()
        .await
        .context("Cache table check failed")?;
    info!("Using table {} ({})", table.name, table.table_type);

    let cache = Arc::new(DistributedCache::new(
        Arc::new(store),
        Arc::new(SystemClock),
        config.default_sliding(),
    ));

    let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_period());
    info!("Background sweep task started");

    shutdown_signal().await;
    sweep_handle.abort();
    warn!("Sweep task aborted");

    match serde_json::to_string(&cache.stats()) {
        Ok(stats) => info!("Final stats: {}", stats),
        Err(err) => warn!("Could not render stats: {}", err),
    }

    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
