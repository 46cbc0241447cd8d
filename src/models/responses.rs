//! Response types returned by the cache facade
//!
//! Each public operation returns one of these on success.

use std::time::Duration;

use serde::Serialize;

use crate::cache::{TtlResult, ValueResult};

/// Result of [`Cache::set`](crate::Cache::set)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetResponse {
    /// Value replaced by this write, if the key was live
    pub previous_value: Option<Vec<u8>>,
    /// Whether the key previously existed and was live
    pub exists: bool,
}

impl From<ValueResult> for SetResponse {
    fn from(result: ValueResult) -> Self {
        Self {
            previous_value: result.value,
            exists: result.exists,
        }
    }
}

/// Result of [`Cache::get`](crate::Cache::get)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetResponse {
    /// The stored value
    pub value: Option<Vec<u8>>,
    /// Whether the key was found live
    pub exists: bool,
}

impl From<ValueResult> for GetResponse {
    fn from(result: ValueResult) -> Self {
        Self {
            value: result.value,
            exists: result.exists,
        }
    }
}

/// Result of [`Cache::delete`](crate::Cache::delete)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteResponse {
    /// The removed value, if the key was live
    pub deleted_value: Option<Vec<u8>>,
    /// Whether the key existed and was live
    pub exists: bool,
}

impl From<ValueResult> for DeleteResponse {
    fn from(result: ValueResult) -> Self {
        Self {
            deleted_value: result.value,
            exists: result.exists,
        }
    }
}

/// Result of [`Cache::expire`](crate::Cache::expire)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpireResponse {
    pub exists: bool,
}

impl From<ValueResult> for ExpireResponse {
    fn from(result: ValueResult) -> Self {
        Self {
            exists: result.exists,
        }
    }
}

/// Result of [`Cache::persist`](crate::Cache::persist)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistResponse {
    pub exists: bool,
}

impl From<ValueResult> for PersistResponse {
    fn from(result: ValueResult) -> Self {
        Self {
            exists: result.exists,
        }
    }
}

/// Result of [`Cache::ttl`](crate::Cache::ttl)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TtlResponse {
    /// Remaining time to live, zero if the key never expires
    pub ttl: Duration,
    pub exists: bool,
}

impl From<TtlResult> for TtlResponse {
    fn from(result: TtlResult) -> Self {
        Self {
            ttl: result.ttl,
            exists: result.exists,
        }
    }
}
