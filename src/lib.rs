//! Slotcache - An embeddable sharded in-memory cache
//!
//! Keys are spread over 16384 hash slots, each with its own lock, and
//! support per-key TTL expiration and byte-budgeted LRU eviction.
//!
//! ```ignore
//! let cache = Cache::new(Config::default());
//! cache.set("greeting", "hello", Duration::ZERO).await?;
//! assert!(cache.get("greeting").await?.exists);
//! cache.close().await;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod slot;
pub mod tasks;

pub use cache::{Cache, CacheStats};
pub use config::{Config, EvictStrategy};
pub use error::{CacheError, Cause, Result};
pub use models::{
    DeleteResponse, ExpireResponse, GetResponse, PersistResponse, SetResponse, TtlResponse,
};
pub use slot::{slot_of, Range, Slot, MAX_SLOT};
