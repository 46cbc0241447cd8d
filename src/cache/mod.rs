//! Cache Module
//!
//! Sharded in-memory storage with TTL expiration and LRU eviction. Keys map
//! to one of `MAX_SLOT` shards; every operation travels to its shard as a
//! command and comes back through a pooled response.

mod client;
mod command;
mod engine;
mod entry;
mod response;
mod shard;
mod stats;
mod storage;


// Re-export public types
pub use client::Cache;
pub use command::{ShardStats, TtlResult, ValueResult};
pub use engine::Engine;
pub use stats::{CacheStats, Metrics};
