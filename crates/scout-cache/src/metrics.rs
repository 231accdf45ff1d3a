//! Cache hit/miss accounting.
//!
//! Counters live in an explicit [`CacheMetrics`] value owned by whoever
//! builds the cache (one per orchestrator), never in process globals. They
//! only ever increase.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic cache counters.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    corrupt_reads: AtomicU64,
}

impl CacheMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a lookup that returned an entry.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup that returned nothing.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an entry that could not be decoded.
    pub fn record_corrupt(&self) {
        self.corrupt_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Total hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total corrupt reads.
    pub fn corrupt_reads(&self) -> u64 {
        self.corrupt_reads.load(Ordering::Relaxed)
    }

    /// Snapshot into a [`CacheStats`] with the given live entry count.
    pub fn snapshot(&self, entries: u64) -> CacheStats {
        let hits = self.hits();
        let misses = self.misses();
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            entries,
            corrupt_reads: self.corrupt_reads(),
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned an entry.
    pub hits: u64,
    /// Lookups that returned nothing (including corrupt and failed reads).
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0.0 before any lookup.
    pub hit_rate: f64,
    /// Live entries in the search namespace.
    pub entries: u64,
    /// Entries discarded because they could not be decoded.
    pub corrupt_reads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_lookups_hit_rate() {
        let stats = CacheMetrics::new().snapshot(0);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_hit_rate() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_miss();
        metrics.record_miss();
        metrics.record_corrupt();

        let stats = metrics.snapshot(7);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 3);
        assert!((stats.hit_rate - 0.25).abs() < f64::EPSILON);
        assert_eq!(stats.entries, 7);
        assert_eq!(stats.corrupt_reads, 1);
    }
}
