//! TTL Sweeper Task
//!
//! Background task that periodically evicts expired entries from a store.
//! One sweeper runs per map; it only ever touches the entries that have
//! actually expired, never the whole table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::TtlStore;
use crate::error::{CacheError, Result};

// == Sweeper ==
/// Handle to a running sweeper task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Sweeper {
    stopped: Arc<AtomicBool>,
    interval: Duration,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns a sweeper over `store` on the current tokio runtime.
    ///
    /// The task keeps only a weak reference and exits on its own once the
    /// store is dropped.
    ///
    /// # Errors
    /// - `InvalidInterval` if `interval` is zero
    /// - `NoRuntime` if called outside a tokio runtime
    pub fn spawn<V>(store: Weak<Mutex<TtlStore<V>>>, interval: Duration) -> Result<Self>
    where
        V: Clone + PartialEq + Send + 'static,
    {
        if interval.is_zero() {
            return Err(CacheError::InvalidInterval);
        }
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();

        let handle = runtime.spawn(async move {
            info!("Starting TTL sweeper with interval of {:?}", interval);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                let Some(shared) = store.upgrade() else {
                    debug!("TTL sweeper: store dropped, exiting");
                    break;
                };

                let removed = sweep_expired(&shared, &flag);
                if removed > 0 {
                    info!("TTL sweep: removed {} expired entries", removed);
                } else {
                    debug!("TTL sweep: no expired entries found");
                }
            }
        });

        Ok(Self {
            stopped,
            interval,
            handle,
        })
    }

    /// Returns true until [`stop`](Self::stop) is called.
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // == Stop ==
    /// Stops the sweeper. Idempotent.
    ///
    /// A tick already holding the lock finishes its current eviction and
    /// then exits; no further ticks run.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.handle.abort();
            info!("TTL sweeper stopped");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

// == Sweep Tick ==
/// Runs one sweep tick: evicts entries older than `now - ttl` under the
/// store lock, checking `stopped` before each eviction.
fn sweep_expired<V>(store: &Mutex<TtlStore<V>>, stopped: &AtomicBool) -> usize
where
    V: Clone + PartialEq,
{
    let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(cutoff) = guard.begin_sweep(Utc::now()) else {
        return 0;
    };

    let mut removed = 0;
    while !stopped.load(Ordering::Acquire) {
        match guard.expire_one(cutoff) {
            Some(_) => removed += 1,
            None => break,
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_store(ttl_secs: u64) -> Arc<Mutex<TtlStore<String>>> {
        Arc::new(Mutex::new(TtlStore::new(0, Duration::from_secs(ttl_secs))))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let store = shared_store(1);
        store
            .lock()
            .unwrap()
            .put("expire_soon", "value".to_string());

        let sweeper = Sweeper::spawn(Arc::downgrade(&store), Duration::from_millis(500)).unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(store.lock().unwrap().len(), 0, "Expired entry should have been swept");
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let store = shared_store(3600);
        store
            .lock()
            .unwrap()
            .put("long_lived", "value".to_string());

        let sweeper = Sweeper::spawn(Arc::downgrade(&store), Duration::from_millis(200)).unwrap();

        tokio::time::sleep(Duration::from_millis(700)).await;

        let value = store.lock().unwrap().get("long_lived");
        assert_eq!(value.as_deref(), Some("value"));
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_rejects_zero_interval() {
        let store = shared_store(1);

        let result = Sweeper::spawn(Arc::downgrade(&store), Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidInterval)));
    }

    #[test]
    fn test_sweeper_requires_runtime() {
        let store = shared_store(1);

        let result = Sweeper::spawn(Arc::downgrade(&store), Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_stopped_sweeper_leaves_entries() {
        let store = shared_store(1);
        store.lock().unwrap().put("key", "value".to_string());

        let sweeper = Sweeper::spawn(Arc::downgrade(&store), Duration::from_millis(500)).unwrap();
        sweeper.stop();
        sweeper.stop();
        assert!(!sweeper.is_running());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(store.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sweep_tick_honours_stop_flag() {
        let store = shared_store(0);
        {
            let mut guard = store.lock().unwrap();
            let past = Utc::now() - chrono::Duration::seconds(5);
            guard.put_at("a", "1".to_string(), past);
            guard.put_at("b", "2".to_string(), past);
        }

        let stopped = AtomicBool::new(true);
        assert_eq!(sweep_expired(&store, &stopped), 0);

        let running = AtomicBool::new(false);
        assert_eq!(sweep_expired(&store, &running), 2);
        assert!(store.lock().unwrap().is_empty());
        assert_eq!(store.lock().unwrap().stats().sweeps, 2);
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_store_dropped() {
        let store = shared_store(1);
        let sweeper = Sweeper::spawn(Arc::downgrade(&store), Duration::from_millis(50)).unwrap();

        drop(store);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(sweeper.handle.is_finished());
    }
}
