//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, inserts and evictions by path.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for a key that was not cached
    pub misses: u64,
    /// Number of puts that created a new entry
    pub inserts: u64,
    /// Number of puts that replaced the value of an existing entry
    pub updates: u64,
    /// Evictions resolved from the hint queue
    pub fast_evictions: u64,
    /// Evictions resolved by the ranked scan
    pub ranked_evictions: u64,
    /// Capacity breaches where no entry could be evicted
    pub missed_evictions: u64,
    /// Number of times the hint queue was re-sorted
    pub hint_resorts: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of entries removed by either eviction path.
    pub fn evictions(&self) -> u64 {
        self.fast_evictions + self.ranked_evictions
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by all threads using a cache.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    fast_evictions: AtomicU64,
    ranked_evictions: AtomicU64,
    missed_evictions: AtomicU64,
    hint_resorts: AtomicU64,
}

impl StatsRecorder {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fast_eviction(&self) {
        self.fast_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ranked_eviction(&self) {
        self.ranked_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missed_eviction(&self) {
        self.missed_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hint_resort(&self) {
        self.hint_resorts.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads every counter. Counters are read one at a time, so a snapshot
    /// taken under load is not a consistent cut.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            fast_evictions: self.fast_evictions.load(Ordering::Relaxed),
            ranked_evictions: self.ranked_evictions.load(Ordering::Relaxed),
            missed_evictions: self.missed_evictions.load(Ordering::Relaxed),
            hint_resorts: self.hint_resorts.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions(), 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let recorder = StatsRecorder::default();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_miss();

        let stats = recorder.snapshot(3);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.total_entries, 3);
    }

    #[test]
    fn test_evictions_sum_both_paths() {
        let recorder = StatsRecorder::default();
        recorder.record_fast_eviction();
        recorder.record_fast_eviction();
        recorder.record_ranked_eviction();
        recorder.record_missed_eviction();

        let stats = recorder.snapshot(0);
        assert_eq!(stats.evictions(), 3);
        assert_eq!(stats.missed_evictions, 1);
    }

    #[test]
    fn test_stats_serialize() {
        let recorder = StatsRecorder::default();
        recorder.record_insert();
        recorder.record_update();

        let json = serde_json::to_value(recorder.snapshot(1)).unwrap();
        assert_eq!(json["inserts"], 1);
        assert_eq!(json["updates"], 1);
        assert_eq!(json["total_entries"], 1);
    }
}
