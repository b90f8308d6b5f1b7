//! Snapshot Codec Module
//!
//! Saves a map to the JSON snapshot document and restores it, rebuilding the
//! staleness index in bulk from the recovered timestamps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::map::sweep_interval;
use crate::cache::{TtlMap, TtlStore};
use crate::error::{CacheError, Result};
use crate::models::{EntrySnapshot, NodeSnapshot, Snapshot};
use crate::tasks::Sweeper;

impl<V> TtlMap<V>
where
    V: Clone + PartialEq + Send + Serialize + 'static,
{
    // == Encode ==
    /// Serializes every live entry and the TTL into a snapshot document.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let store = self.lock_store();
        let entries: HashMap<String, EntrySnapshot<&V>> = store
            .records()
            .map(|(key, value, time)| {
                let entry = EntrySnapshot {
                    value,
                    heap_node: NodeSnapshot {
                        time,
                        key: key.to_string(),
                    },
                };
                (key.to_string(), entry)
            })
            .collect();

        let snapshot = Snapshot {
            entries: Some(entries),
            ttl_seconds: Some(store.ttl().as_secs()),
        };
        serde_json::to_vec(&snapshot).map_err(CacheError::Encode)
    }
}

impl<V> TtlMap<V>
where
    V: Clone + PartialEq + Send + DeserializeOwned + 'static,
{
    // == Decode ==
    /// Replaces the contents of this map with a snapshot and restarts the
    /// sweeper with the recovered TTL.
    ///
    /// Empty payloads (`""`, `{}`, `null`) are a no-op. On any error the
    /// map is left exactly as it was, old sweeper included.
    ///
    /// # Errors
    /// - `Decode` if the payload is not a valid snapshot
    /// - `InvalidInterval` if the recovered TTL is zero
    /// - `NoRuntime` if called outside a tokio runtime
    pub fn decode(&self, bytes: &[u8]) -> Result<()> {
        let Some(restored) = parse_snapshot(bytes)? else {
            return Ok(());
        };
        let ttl = restored.ttl();
        let count = restored.len();

        let mut slot = self.lock_sweeper();
        // The replacement must exist before anything live is touched.
        let next = Sweeper::spawn(Arc::downgrade(&self.store), sweep_interval(ttl))?;
        if let Some(previous) = slot.replace(next) {
            previous.stop();
        }
        *self.lock_store() = restored;
        info!("Restored {} entries from snapshot (ttl={}s)", count, ttl.as_secs());
        Ok(())
    }

    // == Restore ==
    /// Builds a fresh map from a snapshot.
    ///
    /// An empty payload yields an empty map with no TTL and no sweeper.
    /// Like [`new`](Self::new), a sweeper that cannot start is logged and the
    /// restored map is returned without one.
    pub fn restore(bytes: &[u8]) -> Result<Self> {
        let Some(restored) = parse_snapshot(bytes)? else {
            return Ok(Self::without_sweeper(0, Duration::ZERO));
        };
        let ttl = restored.ttl();
        info!("Restored {} entries from snapshot (ttl={}s)", restored.len(), ttl.as_secs());

        let map = Self {
            store: Arc::new(Mutex::new(restored)),
            sweeper: Mutex::new(None),
        };
        if let Err(err) = map.start_sweeper(sweep_interval(ttl)) {
            warn!("TTL sweeper not started after restore: {}", err);
        }
        Ok(map)
    }
}

/// Parses a snapshot into a detached store. Blank payloads yield None.
fn parse_snapshot<V>(bytes: &[u8]) -> Result<Option<TtlStore<V>>>
where
    V: Clone + PartialEq + DeserializeOwned,
{
    let payload = bytes.trim_ascii();
    if payload.is_empty() || payload == b"{}" {
        return Ok(None);
    }

    let snapshot: Option<Snapshot<V>> =
        serde_json::from_slice(payload).map_err(CacheError::Decode)?;
    let Some(snapshot) = snapshot.filter(|s| !s.is_blank()) else {
        return Ok(None);
    };

    let ttl = Duration::from_secs(snapshot.ttl_seconds.unwrap_or(0));
    if sweep_interval(ttl).is_zero() {
        return Err(CacheError::InvalidInterval);
    }

    let records: HashMap<String, _> = snapshot
        .entries
        .unwrap_or_default()
        .into_iter()
        .map(|(key, entry)| (key, (entry.value, entry.heap_node.time)))
        .collect();
    Ok(Some(TtlStore::from_records(records, ttl)))
}
