//! Background Tasks Module
//!
//! Control loops started with the cache and stopped when it closes.
//!
//! # Tasks
//! - Expiration sweeper: purges expired entries from one slot per tick
//! - Eviction controller: evicts LRU keys while over the byte threshold

mod eviction;
mod expiration;

pub use eviction::spawn_eviction_task;
pub use expiration::spawn_expiration_task;
