//! TTL Map Module
//!
//! Thread-safe map with access-based TTL eviction. Every operation, including
//! the sweeper's ticks, is serialized by one mutex around the store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::cache::{CacheStats, TtlStore};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::Sweeper;

// == TTL Map ==
/// In-memory key/value map whose entries expire once left untouched for
/// longer than the TTL.
///
/// Both `put` and `get` count as an access. Expired entries are removed by a
/// background sweeper running every TTL/2 on the tokio runtime.
///
/// # Example
/// ```ignore
/// let map = TtlMap::new(0, 60);
/// map.put("session", "token".to_string());
/// assert_eq!(map.get("session").as_deref(), Some("token"));
/// map.stop();
/// ```
#[derive(Debug)]
pub struct TtlMap<V> {
    pub(crate) store: Arc<Mutex<TtlStore<V>>>,
    /// Lifecycle state of the sweeper, None when it was never started
    pub(crate) sweeper: Mutex<Option<Sweeper>>,
}

impl<V> TtlMap<V>
where
    V: Clone + PartialEq + Send + 'static,
{
    // == Constructor ==
    /// Creates a map and starts its sweeper at half the TTL.
    ///
    /// A sweeper that cannot start (zero TTL, no tokio runtime) is logged and
    /// the map is returned without one; use [`start_sweeper`](Self::start_sweeper)
    /// to observe the error directly.
    ///
    /// # Arguments
    /// * `capacity` - Initial capacity hint for the entry table
    /// * `ttl_seconds` - Idle time in seconds after which an entry expires
    pub fn new(capacity: usize, ttl_seconds: u64) -> Self {
        let ttl = Duration::from_secs(ttl_seconds);
        let map = Self::without_sweeper(capacity, ttl);
        if let Err(err) = map.start_sweeper(sweep_interval(ttl)) {
            warn!("TTL sweeper not started: {}", err);
        }
        map
    }

    /// Creates a map from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.initial_capacity, config.ttl_seconds)
    }

    /// Creates a map whose sweeper is stopped.
    pub fn without_sweeper(capacity: usize, ttl: Duration) -> Self {
        Self {
            store: Arc::new(Mutex::new(TtlStore::new(capacity, ttl))),
            sweeper: Mutex::new(None),
        }
    }

    // == Put ==
    /// Stores a value under `key`, marking it as accessed now.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.lock_store().put(key, value);
    }

    // == Get ==
    /// Returns the value under `key` and marks it as accessed now.
    ///
    /// Absent and already-expired keys both return None.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock_store().get(key)
    }

    // == Length ==
    /// Returns the current number of live entries.
    pub fn len(&self) -> usize {
        self.lock_store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_store().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.lock_store().ttl()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock_store().stats()
    }

    /// Runs one sweep immediately, returning the number of evicted entries.
    pub fn sweep_now(&self) -> usize {
        self.lock_store().sweep_at(Utc::now())
    }

    /// Checks that the entry table and the staleness index agree.
    pub fn is_consistent(&self) -> bool {
        self.lock_store().is_consistent()
    }

    // == Sweeper Lifecycle ==
    /// Starts the background sweeper.
    ///
    /// # Errors
    /// - `AlreadyRunning` if a sweeper is active; it keeps running untouched
    /// - `InvalidInterval` if `interval` is zero
    /// - `NoRuntime` if called outside a tokio runtime
    pub fn start_sweeper(&self, interval: Duration) -> Result<()> {
        let mut slot = self.lock_sweeper();
        if slot.as_ref().is_some_and(|sweeper| sweeper.is_running()) {
            return Err(CacheError::AlreadyRunning);
        }
        *slot = Some(Sweeper::spawn(Arc::downgrade(&self.store), interval)?);
        Ok(())
    }

    /// Returns true while a sweeper is running.
    pub fn is_running(&self) -> bool {
        self.lock_sweeper()
            .as_ref()
            .is_some_and(|sweeper| sweeper.is_running())
    }

    // == Stop ==
    /// Stops the sweeper. Idempotent, and safe on a map that never had one.
    ///
    /// Entries stay in place; they just stop expiring.
    pub fn stop(&self) {
        if let Some(sweeper) = self.lock_sweeper().take() {
            sweeper.stop();
        }
    }

    // == Internals ==

    pub(crate) fn lock_store(&self) -> MutexGuard<'_, TtlStore<V>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_sweeper(&self) -> MutexGuard<'_, Option<Sweeper>> {
        self.sweeper.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sweep interval for a TTL: half of it.
pub(crate) fn sweep_interval(ttl: Duration) -> Duration {
    ttl / 2
}
