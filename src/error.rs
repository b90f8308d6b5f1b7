//! Error types for the TTL map
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the TTL map.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The sweeper is already running for this map
    #[error("Sweeper already running")]
    AlreadyRunning,

    /// The sweep interval was zero
    #[error("Invalid sweep interval: must be greater than zero")]
    InvalidInterval,

    /// No tokio runtime is available to host the sweeper
    #[error("No async runtime available to run the sweeper")]
    NoRuntime,

    /// Snapshot payload could not be parsed
    #[error("Failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    /// Snapshot could not be serialized
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the TTL map.
pub type Result<T> = std::result::Result<T, CacheError>;
