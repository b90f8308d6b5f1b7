//! Configuration Module
//!
//! Handles loading the map configuration from environment variables.

use std::env;

/// TTL map configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Initial capacity hint for the entry table
    pub initial_capacity: usize,
    /// Time-to-live in seconds for entries that are not accessed
    pub ttl_seconds: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTL_MAP_CAPACITY` - Initial capacity hint (default: 0)
    /// - `TTL_MAP_TTL_SECONDS` - TTL in seconds (default: 300)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            initial_capacity: env::var("TTL_MAP_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.initial_capacity),
            ttl_seconds: env::var("TTL_MAP_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl_seconds),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            ttl_seconds: 300,
        }
    }
}
