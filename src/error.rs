//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Every failure carries a
//! machine-checkable [`Cause`]; the human-readable message is only formatted
//! when the error is displayed.

use std::time::Duration;

use thiserror::Error;

use crate::slot::Slot;

// == Cause ==
/// Machine-checkable reason for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    /// Any failure other than a deadline expiring.
    Internal,
    /// The command deadline elapsed before the shard produced a result.
    Canceled,
}

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Command deadline elapsed. The shard may still complete the work.
    #[error("{op} on slot {slot} did not complete within {timeout:?}")]
    Canceled {
        op: &'static str,
        slot: Slot,
        timeout: Duration,
    },

    /// The shard side went away without producing a result.
    #[error("{op} on slot {slot} ended without a result")]
    Dropped { op: &'static str, slot: Slot },

    /// A fan-out task panicked or was aborted.
    #[error("fan-out task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl CacheError {
    /// Returns the machine-checkable cause of this error.
    pub fn cause(&self) -> Cause {
        match self {
            CacheError::Canceled { .. } => Cause::Canceled,
            CacheError::Dropped { .. } | CacheError::TaskFailed(_) => Cause::Internal,
        }
    }

    /// True if the command deadline elapsed.
    pub fn is_canceled(&self) -> bool {
        self.cause() == Cause::Canceled
    }
}

// == Config Error Enum ==
/// Errors raised while reading configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Eviction strategy name not recognized
    #[error("invalid eviction strategy: {0}")]
    InvalidStrategy(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
