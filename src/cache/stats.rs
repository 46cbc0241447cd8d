//! Cache Statistics Module
//!
//! Aggregates per-shard counters into cache-wide statistics, and tracks
//! background loop activity.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::command::ShardStats;

// == Cache Stats ==
/// Cache-wide statistics, summed over every shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total bytes of values held across all shards
    pub db_size_in_bytes: i64,
    /// Keys held across all shards, including expired keys not yet purged
    pub keys: usize,
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads that found nothing live
    pub misses: u64,
    /// Number of keys removed by LRU eviction
    pub evictions: u64,
    /// Number of expired keys purged
    pub expirations: u64,
    /// Number of failed background loop iterations
    pub background_errors: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Merge ==
    /// Adds one shard's counters into the totals.
    pub fn merge(&mut self, shard: &ShardStats) {
        self.db_size_in_bytes += shard.size_in_bytes;
        self.keys += shard.keys;
        self.hits += shard.hits;
        self.misses += shard.misses;
        self.evictions += shard.evictions;
        self.expirations += shard.expirations;
    }
}

// == Metrics ==
/// Counters updated by the background loops.
#[derive(Debug, Default)]
pub struct Metrics {
    background_errors: AtomicU64,
    expiration_sweeps: AtomicU64,
    eviction_rounds: AtomicU64,
}

impl Metrics {
    pub fn record_background_error(&self) {
        self.background_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration_sweep(&self) {
        self.expiration_sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction_round(&self) {
        self.eviction_rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn background_errors(&self) -> u64 {
        self.background_errors.load(Ordering::Relaxed)
    }

    pub fn expiration_sweeps(&self) -> u64 {
        self.expiration_sweeps.load(Ordering::Relaxed)
    }

    pub fn eviction_rounds(&self) -> u64 {
        self.eviction_rounds.load(Ordering::Relaxed)
    }
}
