//! Command Module
//!
//! The closed set of operations a shard can execute. Each command carries the
//! responder its typed result is written to.

use std::time::Duration;

use tokio::time::Instant;

use crate::cache::response::Responder;

// == Result Payloads ==
/// Value lookup result shared by Set, Get, Delete, Expire, Persist and DeleteLru.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueResult {
    /// Previous, current or deleted value depending on the command
    pub value: Option<Vec<u8>>,
    /// Whether the key existed and was live
    pub exists: bool,
}

impl ValueResult {
    pub fn found(value: Vec<u8>) -> Self {
        Self {
            value: Some(value),
            exists: true,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Result of a Ttl command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlResult {
    /// Remaining time to live, zero if the key never expires
    pub ttl: Duration,
    /// Whether the key existed and was live
    pub exists: bool,
}

/// Per-shard counters reported by a Stats command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Sum of value lengths currently held
    pub size_in_bytes: i64,
    /// Keys currently held, expired or not
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
    /// Keys removed by LRU eviction
    pub evictions: u64,
    /// Expired keys purged, lazily or by a sweep
    pub expirations: u64,
}

// == Command ==
/// A unit of work dispatched to the shard owning its key.
#[derive(Debug)]
pub enum Command {
    Set {
        key: String,
        value: Vec<u8>,
        expires_at: Option<Instant>,
        resp: Responder<ValueResult>,
    },
    Get {
        key: String,
        resp: Responder<ValueResult>,
    },
    Delete {
        key: String,
        resp: Responder<ValueResult>,
    },
    /// `expires_at` of None means the deadline is beyond the clock's range.
    Expire {
        key: String,
        expires_at: Option<Instant>,
        resp: Responder<ValueResult>,
    },
    Persist {
        key: String,
        resp: Responder<ValueResult>,
    },
    Ttl {
        key: String,
        resp: Responder<TtlResult>,
    },
    Stats {
        resp: Responder<ShardStats>,
    },
    /// Purges every expired key; responds with how many were removed.
    DeleteExpired {
        resp: Responder<usize>,
    },
    /// Removes the shard's least recently used key.
    DeleteLru {
        resp: Responder<ValueResult>,
    },
    Ping {
        resp: Responder<()>,
    },
}

impl Command {
    /// Short operation name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Delete { .. } => "delete",
            Command::Expire { .. } => "expire",
            Command::Persist { .. } => "persist",
            Command::Ttl { .. } => "ttl",
            Command::Stats { .. } => "stats",
            Command::DeleteExpired { .. } => "delete_expired",
            Command::DeleteLru { .. } => "delete_lru",
            Command::Ping { .. } => "ping",
        }
    }
}
