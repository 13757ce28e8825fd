//! Cache Entry Module
//!
//! Defines the ranking record kept for every live key, and the frozen copies
//! used while sorting.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// == Cache Entry ==
/// Ranking metadata for a single cached key.
///
/// Equality and hashing delegate to the key only; `inserted_at`, `sequence`
/// and the usage counter never take part in identity.
///
/// A live entry is shared through an `Arc` between the store and the hint
/// queue. A snapshot is a detached copy with a frozen counter that points
/// back at the live entry it was taken from.
pub struct CacheEntry<K> {
    /// The cached key
    key: K,
    /// Monotonic creation time, set once
    inserted_at: Instant,
    /// Per-cache insertion counter, breaks ties between equal instants
    sequence: u64,
    /// Number of hits recorded while a usage-sensitive policy was active
    usage: AtomicU64,
    /// Live entry this snapshot was copied from; `None` on live entries
    source: Option<Arc<CacheEntry<K>>>,
}

impl<K> CacheEntry<K> {
    // == Constructor ==
    /// Creates a live entry with a zero usage count.
    ///
    /// # Arguments
    /// * `key` - The key being cached
    /// * `sequence` - Insertion order assigned by the owning cache
    pub fn new(key: K, sequence: u64) -> Self {
        Self {
            key,
            inserted_at: Instant::now(),
            sequence,
            usage: AtomicU64::new(0),
            source: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current usage count. On a snapshot this value never changes.
    pub fn usage_count(&self) -> u64 {
        self.usage.load(Ordering::Relaxed)
    }

    /// Time elapsed since the entry was inserted.
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    pub fn is_snapshot(&self) -> bool {
        self.source.is_some()
    }

    pub(crate) fn record_hit(&self) {
        self.usage.fetch_add(1, Ordering::Relaxed);
    }

    // == Restore ==
    /// Consumes a snapshot and yields the live entry it was copied from.
    ///
    /// Returns `None` for an entry that is not a snapshot.
    pub(crate) fn restore(self) -> Option<Arc<CacheEntry<K>>> {
        self.source
    }
}

impl<K: Clone> CacheEntry<K> {
    // == Snapshot ==
    /// Copies the ranking fields of a live entry as they are right now.
    ///
    /// Comparators only ever see these copies, so a counter bumped by
    /// another thread mid-sort cannot make two comparisons disagree.
    pub(crate) fn snapshot(live: &Arc<CacheEntry<K>>) -> CacheEntry<K> {
        CacheEntry {
            key: live.key.clone(),
            inserted_at: live.inserted_at,
            sequence: live.sequence,
            usage: AtomicU64::new(live.usage_count()),
            source: Some(Arc::clone(live)),
        }
    }
}

impl<K: PartialEq> PartialEq for CacheEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq> Eq for CacheEntry<K> {}

impl<K: Hash> Hash for CacheEntry<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<K: fmt::Debug> fmt::Debug for CacheEntry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("age", &self.age())
            .field("sequence", &self.sequence)
            .field("usage", &self.usage_count())
            .field("snapshot", &self.is_snapshot())
            .finish()
    }
}
