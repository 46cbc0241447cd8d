//! Slotcache host process
//!
//! Runs a cache configured from the environment and periodically logs its
//! statistics until interrupted.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotcache::{Cache, Config};

/// Interval between statistics reports
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Main entry point for the cache host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and start its background loops
/// 4. Report statistics until SIGINT/SIGTERM
/// 5. Close the cache, waiting for the loops to exit
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting slotcache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: evict_strategy={}, threshold={} bytes, command_timeout={:?}, max_concurrency={}",
        config.evict_strategy,
        config.db_bytes_evict_threshold,
        config.command_timeout,
        config.max_concurrency
    );

    let cache = Cache::new(config);
    cache.ping().await.context("cache did not answer ping")?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut report = tokio::time::interval(REPORT_INTERVAL);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = report.tick() => match cache.stats().await {
                Ok(stats) => info!("Cache stats: {}", serde_json::to_string(&stats)?),
                Err(err) => warn!("Failed to collect stats: {}", err),
            },
        }
    }

    cache.close().await;
    info!("Shutdown complete");

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .context("failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
            result
        }
        result = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
            result
        }
    }
}
