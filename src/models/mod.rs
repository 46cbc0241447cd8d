//! Response models for the cache facade
//!
//! Plain result types returned by each public operation.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    DeleteResponse, ExpireResponse, GetResponse, PersistResponse, SetResponse, TtlResponse,
};
