//! Cache Store Module
//!
//! Entry table paired with the staleness index. Not synchronized: callers
//! hold it behind a single lock (see [`TtlMap`](crate::cache::TtlMap)).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, CacheStats, NodeRef, StalenessIndex, StalenessNode};

// == TTL Store ==
/// Entry table and staleness index kept in 1:1 correspondence.
#[derive(Debug)]
pub struct TtlStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Last-access ordering of the entries
    index: StalenessIndex,
    /// Entries untouched for longer than this are expired
    ttl: Duration,
    stats: CacheStats,
}

impl<V> TtlStore<V>
where
    V: Clone + PartialEq,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `capacity` - Initial capacity hint for the entry table
    /// * `ttl` - Idle time after which an entry is eligible for removal
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            index: StalenessIndex::with_capacity(capacity),
            ttl,
            stats: CacheStats::new(),
        }
    }

    /// Rebuilds a store from recovered `(value, last access)` records.
    pub(crate) fn from_records(records: HashMap<String, (V, DateTime<Utc>)>, ttl: Duration) -> Self {
        let mut values = Vec::with_capacity(records.len());
        let mut nodes = Vec::with_capacity(records.len());
        for (key, (value, timestamp)) in records {
            nodes.push(StalenessNode::new(timestamp, key.clone()));
            values.push((key, value));
        }

        let (index, refs) = StalenessIndex::from_nodes(nodes);
        let entries: HashMap<String, CacheEntry<V>> = values
            .into_iter()
            .zip(refs)
            .map(|((key, value), node_ref)| (key, CacheEntry::new(value, node_ref)))
            .collect();

        let mut stats = CacheStats::new();
        stats.set_total_entries(entries.len());
        Self {
            entries,
            index,
            ttl,
            stats,
        }
    }

    // == Put ==
    /// Stores a value, stamping its last access with the current time.
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        self.put_at(key, value, Utc::now());
    }

    /// Stores a value as of `now`.
    ///
    /// An identical value only refreshes the existing node. A new or
    /// different value replaces both the entry and its node.
    pub fn put_at(&mut self, key: impl Into<String>, value: V, now: DateTime<Utc>) {
        let key = key.into();

        if let Some(entry) = self.entries.get(&key) {
            if entry.value == value {
                let node_ref = entry.staleness_ref;
                self.touch(node_ref, now);
                self.stats.record_refresh();
                return;
            }
        }

        if let Some(previous) = self.entries.remove(&key) {
            self.index.remove(previous.staleness_ref);
        }
        let node_ref = self.index.insert(StalenessNode::new(now, key.clone()));
        self.entries.insert(key, CacheEntry::new(value, node_ref));
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a value and refreshes its last access to the current time.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Retrieves a value as of `now`. Absent keys count as misses.
    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) => {
                let value = entry.value.clone();
                let node_ref = entry.staleness_ref;
                self.touch(node_ref, now);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Sweep ==
    /// Returns the instant before which entries are expired, or None when the
    /// TTL reaches past the representable range.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl).ok()?;
        now.checked_sub_signed(ttl)
    }

    /// Counts a sweep run and returns its cutoff.
    pub fn begin_sweep(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.stats.record_sweep();
        self.cutoff(now)
    }

    /// Removes the least recently touched entry if it is older than `cutoff`.
    ///
    /// Returns the evicted key.
    pub fn expire_one(&mut self, cutoff: DateTime<Utc>) -> Option<String> {
        if self.index.peek_min()?.timestamp >= cutoff {
            return None;
        }

        let node = self.index.pop_min()?;
        self.entries.remove(&node.key);
        self.stats.record_expiration();
        self.stats.set_total_entries(self.entries.len());
        Some(node.key)
    }

    /// Removes every entry last touched before `now - ttl`.
    ///
    /// Work is proportional to the number of expired entries. Returns the
    /// number of entries removed.
    pub fn sweep_at(&mut self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = self.begin_sweep(now) else {
            return 0;
        };

        let mut removed = 0;
        while self.expire_one(cutoff).is_some() {
            removed += 1;
        }
        removed
    }

    // == Accessors ==

    /// Returns the least recently touched node.
    pub fn oldest(&self) -> Option<&StalenessNode> {
        self.index.peek_min()
    }

    /// Returns the last-access instant of `key` without refreshing it.
    pub fn last_access(&self, key: &str) -> Option<DateTime<Utc>> {
        let entry = self.entries.get(key)?;
        self.index.get(entry.staleness_ref).map(|node| node.timestamp)
    }

    /// Iterates `(key, value, last access)` for every live entry.
    pub(crate) fn records(&self) -> impl Iterator<Item = (&str, &V, DateTime<Utc>)> + '_ {
        self.entries.iter().filter_map(|(key, entry)| {
            self.index
                .get(entry.staleness_ref)
                .map(|node| (key.as_str(), &entry.value, node.timestamp))
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Consistency ==
    /// Checks that the entry table and the staleness index agree.
    ///
    /// Every entry must own exactly one node carrying its key, the index must
    /// hold no other nodes, and heap order must hold.
    pub fn is_consistent(&self) -> bool {
        let sizes_match = self.entries.len() == self.index.len();
        let refs_match = self.entries.iter().all(|(key, entry)| {
            self.index
                .get(entry.staleness_ref)
                .is_some_and(|node| &node.key == key)
        });
        sizes_match && refs_match && self.index.is_heap_ordered()
    }

    // Timestamps only move forward, even if the wall clock steps back.
    fn touch(&mut self, node_ref: NodeRef, now: DateTime<Utc>) {
        let is_newer = self
            .index
            .get(node_ref)
            .is_some_and(|node| now > node.timestamp);
        if is_newer {
            self.index.refresh(node_ref, now);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const TTL: Duration = Duration::from_secs(10);

    fn at(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        base + ChronoDuration::seconds(secs)
    }

    #[test]
    fn test_store_new() {
        let store: TtlStore<String> = TtlStore::new(16, TTL);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert!(store.oldest().is_none());
        assert_eq!(store.ttl(), TTL);
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = TtlStore::new(0, TTL);

        store.put("key1", "value1".to_string());

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store: TtlStore<String> = TtlStore::new(0, TTL);

        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite_replaces_node() {
        let base = Utc::now();
        let mut store = TtlStore::new(0, TTL);

        store.put_at("key1", 1, base);
        let first_ref = store.entries["key1"].staleness_ref;
        store.put_at("key1", 2, at(base, 1));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_at("key1", at(base, 2)), Some(2));
        assert_eq!(store.index.len(), 1);
        assert!(store.index.get(first_ref).is_some_and(|n| n.key == "key1"));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_same_value_refreshes_in_place() {
        let base = Utc::now();
        let mut store = TtlStore::new(0, TTL);

        store.put_at("key1", 7, base);
        let node_ref = store.entries["key1"].staleness_ref;
        store.put_at("key1", 7, at(base, 5));

        assert_eq!(store.entries["key1"].staleness_ref, node_ref);
        assert_eq!(store.last_access("key1"), Some(at(base, 5)));
        assert_eq!(store.stats().refreshes, 1);
    }

    #[test]
    fn test_store_get_refreshes_last_access() {
        let base = Utc::now();
        let mut store = TtlStore::new(0, TTL);

        store.put_at("a", 1, base);
        store.put_at("b", 2, at(base, 1));
        assert_eq!(store.oldest().unwrap().key, "a");

        store.get_at("a", at(base, 2));
        assert_eq!(store.oldest().unwrap().key, "b");
        assert_eq!(store.last_access("a"), Some(at(base, 2)));
    }

    #[test]
    fn test_store_timestamps_never_move_backwards() {
        let base = Utc::now();
        let mut store = TtlStore::new(0, TTL);

        store.put_at("key1", 1, at(base, 5));
        store.get_at("key1", base);
        store.put_at("key1", 1, at(base, 2));

        assert_eq!(store.last_access("key1"), Some(at(base, 5)));
    }

    #[test]
    fn test_store_sweep_removes_only_expired() {
        let base = Utc::now();
        let mut store = TtlStore::new(0, TTL);

        store.put_at("old", 1, base);
        store.put_at("older", 2, at(base, -5));
        store.put_at("fresh", 3, at(base, 8));

        let removed = store.sweep_at(at(base, 12));

        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_at("fresh", at(base, 12)), Some(3));
        let stats = store.stats();
        assert_eq!(stats.expirations, 2);
        assert_eq!(stats.sweeps, 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_sweep_keeps_entry_at_cutoff() {
        let base = Utc::now();
        let mut store = TtlStore::new(0, TTL);

        store.put_at("edge", 1, base);

        assert_eq!(store.sweep_at(at(base, 10)), 0);
        assert_eq!(store.sweep_at(at(base, 11)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_sweep_with_unrepresentable_ttl() {
        let mut store = TtlStore::new(0, Duration::from_secs(u64::MAX));

        store.put("key1", 1);

        assert_eq!(store.sweep_at(Utc::now()), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_from_records() {
        let base = Utc::now();
        let mut records = HashMap::new();
        records.insert("a".to_string(), (1, at(base, 3)));
        records.insert("b".to_string(), (2, at(base, 1)));
        records.insert("c".to_string(), (3, at(base, 2)));

        let store = TtlStore::from_records(records, TTL);

        assert_eq!(store.len(), 3);
        assert_eq!(store.oldest().unwrap().key, "b");
        assert_eq!(store.last_access("a"), Some(at(base, 3)));
        assert_eq!(store.stats().total_entries, 3);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_stats() {
        let mut store = TtlStore::new(0, TTL);

        store.put("key1", "value1".to_string());
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
