//! TTL Map - An in-memory key/value map with access-based expiry
//!
//! Entries that are neither read nor written within the TTL are evicted by a
//! background sweeper, in time proportional to the number of expirations.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use cache::TtlMap;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
