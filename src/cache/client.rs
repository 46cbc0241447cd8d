//! Cache Facade
//!
//! The public operation surface. Owns the engine and the background loops
//! started alongside it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::engine::Engine;
use crate::cache::stats::{CacheStats, Metrics};
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    DeleteResponse, ExpireResponse, GetResponse, PersistResponse, SetResponse, TtlResponse,
};
use crate::slot::Slot;
use crate::tasks::{spawn_eviction_task, spawn_expiration_task};

// == Cache ==
/// Handle to a running cache.
///
/// Every operation waits at most `command_timeout` for its shard; a
/// deadline miss surfaces as [`Cause::Canceled`](crate::Cause::Canceled).
/// Dropping the handle stops the background loops without waiting for them;
/// use [`Cache::close`] to wait for their exit.
#[derive(Debug)]
pub struct Cache {
    engine: Arc<Engine>,
    config: Config,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache and starts its background loops.
    ///
    /// Zero config values are replaced by their defaults. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Panics
    /// If the config selects the unimplemented TTL eviction strategy with a
    /// positive byte threshold.
    pub fn new(config: Config) -> Self {
        let config = config.with_defaults();
        let engine = Arc::new(Engine::new(config.max_concurrency, config.command_timeout));
        let cancel = CancellationToken::new();

        let mut tasks = vec![spawn_expiration_task(
            engine.clone(),
            config.expiration_frequency,
            cancel.clone(),
        )];
        if let Some(handle) = spawn_eviction_task(engine.clone(), &config, cancel.clone()) {
            tasks.push(handle);
        }

        info!(
            "Cache initialized: shards={}, evict_strategy={}, threshold={} bytes, max_concurrency={}",
            engine.storage().len(),
            config.evict_strategy,
            config.db_bytes_evict_threshold,
            config.max_concurrency
        );

        Self {
            engine,
            config,
            cancel,
            tasks,
        }
    }

    /// The effective configuration, with defaults applied.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Background loop counters.
    pub fn metrics(&self) -> &Metrics {
        self.engine.metrics()
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// A zero `ttl` stores the key without expiry. The response carries the
    /// replaced value if the key was live.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> Result<SetResponse> {
        self.engine
            .set(key, value.into(), ttl)
            .await
            .map(SetResponse::from)
    }

    // == Get ==
    pub async fn get(&self, key: &str) -> Result<GetResponse> {
        self.engine.get(key).await.map(GetResponse::from)
    }

    // == Delete ==
    pub async fn delete(&self, key: &str) -> Result<DeleteResponse> {
        self.engine.delete(key).await.map(DeleteResponse::from)
    }

    // == Expire ==
    /// Sets a new TTL on a live key. A zero `ttl` expires it immediately.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<ExpireResponse> {
        self.engine.expire(key, ttl).await.map(ExpireResponse::from)
    }

    // == Persist ==
    /// Removes the TTL from a live key.
    pub async fn persist(&self, key: &str) -> Result<PersistResponse> {
        self.engine.persist(key).await.map(PersistResponse::from)
    }

    // == TTL ==
    /// Remaining time to live of a key; zero if it never expires.
    pub async fn ttl(&self, key: &str) -> Result<TtlResponse> {
        self.engine.ttl(key).await.map(TtlResponse::from)
    }

    // == Stats ==
    /// Statistics summed over all shards.
    pub async fn stats(&self) -> Result<CacheStats> {
        self.engine.stats().await
    }

    /// Total bytes of stored values.
    pub async fn db_size(&self) -> Result<i64> {
        Ok(self.stats().await?.db_size_in_bytes)
    }

    // == Ping ==
    /// Round-trips a no-op command through the dispatcher.
    pub async fn ping(&self) -> Result<()> {
        self.engine.ping(Slot::default()).await
    }

    // == Close ==
    /// Stops the background loops and waits for them to exit.
    ///
    /// Commands already dispatched to a shard still complete.
    pub async fn close(mut self) {
        self.cancel.cancel();

        for handle in std::mem::take(&mut self.tasks) {
            if let Err(err) = handle.await {
                warn!("Background task ended abnormally: {}", err);
            }
        }

        info!("Cache closed");
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
