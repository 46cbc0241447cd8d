//! Engine Module
//!
//! Turns operations into commands, routes them through [`CacheStorage`] and
//! waits for each result under the configured command timeout. Shared by the
//! public facade and the background loops, so all of them compete for the
//! same shards and the same worker pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::cache::command::{Command, ShardStats, TtlResult, ValueResult};
use crate::cache::entry::expires_at;
use crate::cache::response::{ResponsePool, ResponsePools, Responder, WaitError};
use crate::cache::stats::{CacheStats, Metrics};
use crate::cache::storage::CacheStorage;
use crate::error::{CacheError, Result};
use crate::slot::{slot_of, Slot};

// == Engine ==
#[derive(Debug)]
pub struct Engine {
    storage: Arc<CacheStorage>,
    pools: ResponsePools,
    metrics: Metrics,
    command_timeout: Duration,
}

impl Engine {
    pub fn new(max_concurrency: usize, command_timeout: Duration) -> Self {
        Self {
            storage: Arc::new(CacheStorage::new(max_concurrency)),
            pools: ResponsePools::default(),
            metrics: Metrics::default(),
            command_timeout,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub(crate) fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    // == Call ==
    /// Dispatches one command and waits for its result.
    ///
    /// On success the rendezvous goes back to `pool`. On timeout it is
    /// abandoned, and the shard still finishes the command.
    async fn call<T>(
        &self,
        pool: &ResponsePool<T>,
        slot: Slot,
        build: impl FnOnce(Responder<T>) -> Command,
    ) -> Result<T> {
        let response = pool.acquire();
        let command = build(response.responder());
        let op = command.name();

        self.storage.dispatch(slot, command);

        response
            .wait(self.command_timeout)
            .await
            .map_err(|err| match err {
                WaitError::Elapsed => CacheError::Canceled {
                    op,
                    slot,
                    timeout: self.command_timeout,
                },
                WaitError::Dropped => CacheError::Dropped { op, slot },
            })
    }

    // == Keyed Operations ==
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<ValueResult> {
        let expires_at = expires_at(Instant::now(), ttl);
        self.call(&self.pools.value, slot_of(key), |resp| Command::Set {
            key: key.to_string(),
            value,
            expires_at,
            resp,
        })
        .await
    }

    pub async fn get(&self, key: &str) -> Result<ValueResult> {
        self.call(&self.pools.value, slot_of(key), |resp| Command::Get {
            key: key.to_string(),
            resp,
        })
        .await
    }

    pub async fn delete(&self, key: &str) -> Result<ValueResult> {
        self.call(&self.pools.value, slot_of(key), |resp| Command::Delete {
            key: key.to_string(),
            resp,
        })
        .await
    }

    /// Expires `key` after `ttl`. A zero TTL expires it immediately; a TTL
    /// past the clock's range leaves it without expiry.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<ValueResult> {
        let expires_at = Instant::now().checked_add(ttl);
        self.call(&self.pools.value, slot_of(key), |resp| Command::Expire {
            key: key.to_string(),
            expires_at,
            resp,
        })
        .await
    }

    pub async fn persist(&self, key: &str) -> Result<ValueResult> {
        self.call(&self.pools.value, slot_of(key), |resp| Command::Persist {
            key: key.to_string(),
            resp,
        })
        .await
    }

    pub async fn ttl(&self, key: &str) -> Result<TtlResult> {
        self.call(&self.pools.ttl, slot_of(key), |resp| Command::Ttl {
            key: key.to_string(),
            resp,
        })
        .await
    }

    // == Slot Operations ==
    pub async fn ping(&self, slot: Slot) -> Result<()> {
        self.call(&self.pools.ack, slot, |resp| Command::Ping { resp })
            .await
    }

    pub async fn shard_stats(&self, slot: Slot) -> Result<ShardStats> {
        self.call(&self.pools.stats, slot, |resp| Command::Stats { resp })
            .await
    }

    /// Purges expired keys from one shard. Returns how many were removed.
    pub async fn delete_expired(&self, slot: Slot) -> Result<usize> {
        self.call(&self.pools.count, slot, |resp| Command::DeleteExpired { resp })
            .await
    }

    pub async fn delete_lru(&self, slot: Slot) -> Result<ValueResult> {
        self.call(&self.pools.value, slot, |resp| Command::DeleteLru { resp })
            .await
    }

    // == Fan-out Operations ==
    /// Sums the statistics of every shard.
    ///
    /// All shards are queried concurrently. The first failure is returned
    /// without waiting for the rest; commands already dispatched still run.
    pub async fn stats(self: &Arc<Self>) -> Result<CacheStats> {
        let mut tasks = JoinSet::new();
        for slot in Slot::all() {
            let engine = Arc::clone(self);
            tasks.spawn(async move { engine.shard_stats(slot).await });
        }

        let mut stats = CacheStats::new();
        while let Some(joined) = tasks.join_next().await {
            stats.merge(&joined??);
        }
        stats.background_errors = self.metrics.background_errors();

        Ok(stats)
    }

    /// Evicts the least recently used key of every shard.
    ///
    /// Each shard picks its own oldest key, so this approximates a global
    /// LRU rather than implementing one. Returns how many keys were removed.
    pub async fn delete_lru_all(self: &Arc<Self>) -> Result<usize> {
        let mut tasks = JoinSet::new();
        for slot in Slot::all() {
            let engine = Arc::clone(self);
            tasks.spawn(async move { engine.delete_lru(slot).await });
        }

        let mut evicted = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined??.exists {
                evicted += 1;
            }
        }

        Ok(evicted)
    }
}
