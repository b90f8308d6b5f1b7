//! Cache Statistics Module
//!
//! Counters describing how a map is used and how fast it expires.

use serde::Serialize;

// == Cache Stats ==
/// Activity counters of a single map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Gets that found their key
    pub hits: u64,
    /// Gets for absent keys (never stored or already expired)
    pub misses: u64,
    /// In-place last-access refreshes: hits plus puts of an identical value
    pub refreshes: u64,
    /// Sweep runs, whether or not they removed anything
    pub sweeps: u64,
    /// Entries removed because they outlived the TTL
    pub expirations: u64,
    /// Current number of entries in the map
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of gets that found their key, 0.0 before any get.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Average number of entries expired per sweep run.
    pub fn expirations_per_sweep(&self) -> f64 {
        if self.sweeps == 0 {
            0.0
        } else {
            self.expirations as f64 / self.sweeps as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
        self.refreshes += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_refresh(&mut self) {
        self.refreshes += 1;
    }

    pub(crate) fn record_sweep(&mut self) {
        self.sweeps += 1;
    }

    pub(crate) fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub(crate) fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.expirations_per_sweep(), 0.0);
    }

    #[test]
    fn test_hits_count_as_refreshes() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_refresh();

        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.refreshes, 4);
    }

    #[test]
    fn test_expirations_per_sweep() {
        let mut stats = CacheStats::new();
        stats.record_sweep();
        stats.record_sweep();
        stats.record_expiration();
        stats.record_expiration();
        stats.record_expiration();

        assert_eq!(stats.expirations_per_sweep(), 1.5);
    }

    #[test]
    fn test_serializes_counters() {
        let mut stats = CacheStats::new();
        stats.record_miss();
        stats.record_sweep();
        stats.set_total_entries(4);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["misses"], 1);
        assert_eq!(json["sweeps"], 1);
        assert_eq!(json["total_entries"], 4);
    }
}
