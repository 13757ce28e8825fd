//! Hint Queue Module
//!
//! Approximate FIFO of recently inserted entries, consulted before paying
//! for a full ranked scan.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheEntry, Ranking};

const NEVER_RANKED: u64 = u64::MAX;

// == Hint Queue ==
/// Tracks insertion order of entries for the fast eviction path.
///
/// Entries are stored in a VecDeque where:
/// - Front = Next eviction candidate
/// - Back = Most recently inserted
///
/// The queue is never a source of truth. It may still hold entries that
/// were evicted through the ranked path, or that belong to a previous
/// incarnation of a key. The lock is only held for single push/pop steps,
/// never across a sort.
#[derive(Debug)]
pub struct HintQueue<K> {
    /// Candidate order
    order: Mutex<VecDeque<Arc<CacheEntry<K>>>>,
    /// Bumped whenever the queue may have drifted from ranked order
    disturbances: AtomicU64,
    /// Value of `disturbances` observed when the last re-sort started
    ranked_at: AtomicU64,
    /// Cleared once a re-sort leaves the queue in usage or custom order
    insertion_ordered: AtomicBool,
    /// Set while one thread is re-sorting
    resorting: AtomicBool,
}

impl<K> HintQueue<K> {
    // == Constructor ==
    /// Creates a new empty hint queue.
    pub fn new() -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
            disturbances: AtomicU64::new(0),
            ranked_at: AtomicU64::new(NEVER_RANKED),
            insertion_ordered: AtomicBool::new(true),
            resorting: AtomicBool::new(false),
        }
    }

    // == Push ==
    /// Appends a freshly inserted entry at the back.
    pub fn push(&self, entry: Arc<CacheEntry<K>>) {
        self.order.lock().push_back(entry);
        self.disturb();
    }

    // == Pop ==
    /// Removes and returns the front candidate.
    ///
    /// Returns None if the queue is empty.
    pub fn pop(&self) -> Option<Arc<CacheEntry<K>>> {
        self.order.lock().pop_front()
    }

    // == Requeue ==
    /// Puts hints that were popped but not used back at the front, keeping
    /// their relative order.
    pub fn requeue_front(&self, hints: Vec<Arc<CacheEntry<K>>>) {
        if hints.is_empty() {
            return;
        }
        let mut order = self.order.lock();
        for hint in hints.into_iter().rev() {
            order.push_front(hint);
        }
    }

    // == Disturb ==
    /// Records that ranking fields changed since the last re-sort.
    pub fn disturb(&self) {
        self.disturbances.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns true if the queue was re-sorted and nothing has been pushed
    /// or hit since the re-sort began.
    pub fn is_rank_ordered(&self) -> bool {
        self.drift() == 0
    }

    /// Returns true if the queue still holds hints in the order they were
    /// pushed, or was last re-sorted by a ranking that follows that order.
    pub fn is_insertion_ordered(&self) -> bool {
        self.insertion_ordered.load(Ordering::Acquire)
    }

    /// Number of disturbances since the last re-sort began.
    pub fn drift(&self) -> u64 {
        self.disturbances
            .load(Ordering::Acquire)
            .wrapping_sub(self.ranked_at.load(Ordering::Acquire))
    }

    // == Length ==
    /// Returns the number of queued hints, stale ones included.
    pub fn len(&self) -> usize {
        self.order.lock().len()
    }
}

impl<K: Clone> HintQueue<K> {
    // == Resort ==
    /// Reorders the queue by `ranking`, dropping hints `retain` rejects.
    ///
    /// The current contents are taken out under the lock, ranked without it,
    /// and put back in front of anything pushed meanwhile. Returns the
    /// number of hints kept, or None if another thread is already
    /// re-sorting.
    pub fn try_resort<F>(&self, ranking: &Ranking<K>, retain: F) -> Option<usize>
    where
        F: FnMut(&Arc<CacheEntry<K>>) -> bool,
    {
        if self
            .resorting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _release = ResortGuard(&self.resorting);
        Some(self.resort(ranking, retain))
    }

    fn resort<F>(&self, ranking: &Ranking<K>, mut retain: F) -> usize
    where
        F: FnMut(&Arc<CacheEntry<K>>) -> bool,
    {
        let started_at = self.disturbances.load(Ordering::Acquire);
        let taken = std::mem::take(&mut *self.order.lock());

        let mut ranked: VecDeque<_> = ranking
            .rank(taken.into_iter().filter(|e| retain(e)))
            .into();
        let kept = ranked.len();

        {
            let mut order = self.order.lock();
            ranked.append(&mut order);
            *order = ranked;
        }

        self.insertion_ordered
            .store(ranking.follows_insertion_order(), Ordering::Release);
        self.ranked_at.store(started_at, Ordering::Release);
        kept
    }
}

/// Clears the re-sort flag even if a comparator panics mid-sort.
struct ResortGuard<'a>(&'a AtomicBool);

impl Drop for ResortGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<K> Default for HintQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, sequence: u64) -> Arc<CacheEntry<String>> {
        Arc::new(CacheEntry::new(key.to_string(), sequence))
    }

    #[test]
    fn test_hints_new() {
        let hints: HintQueue<String> = HintQueue::new();
        assert_eq!(hints.len(), 0);
        assert!(!hints.is_rank_ordered());
    }

    #[test]
    fn test_hints_fifo_order() {
        let hints = HintQueue::new();

        hints.push(entry("key1", 0));
        hints.push(entry("key2", 1));
        hints.push(entry("key3", 2));

        assert_eq!(hints.len(), 3);
        assert_eq!(hints.pop().unwrap().key(), "key1");
        assert_eq!(hints.pop().unwrap().key(), "key2");
        assert_eq!(hints.pop().unwrap().key(), "key3");
        assert!(hints.pop().is_none());
        assert_eq!(hints.len(), 0);
    }

    #[test]
    fn test_resort_by_usage() {
        let hints = HintQueue::new();
        let a = entry("a", 0);
        let b = entry("b", 1);
        a.record_hit();

        hints.push(Arc::clone(&a));
        hints.push(Arc::clone(&b));

        let kept = hints.try_resort(&Ranking::LeastUsed, |_| true);
        assert_eq!(kept, Some(2));
        assert!(hints.is_rank_ordered());

        assert_eq!(hints.pop().unwrap().key(), "b");
        assert_eq!(hints.pop().unwrap().key(), "a");
    }

    #[test]
    fn test_resort_drops_rejected_hints() {
        let hints = HintQueue::new();
        hints.push(entry("stale", 0));
        hints.push(entry("live", 1));

        let kept = hints.try_resort(&Ranking::Oldest, |e| e.key() != "stale");
        assert_eq!(kept, Some(1));
        assert_eq!(hints.len(), 1);
        assert_eq!(hints.pop().unwrap().key(), "live");
    }

    #[test]
    fn test_push_or_hit_after_resort_disorders() {
        let hints = HintQueue::new();
        hints.push(entry("a", 0));
        hints.try_resort(&Ranking::LeastUsed, |_| true);
        assert!(hints.is_rank_ordered());

        hints.push(entry("b", 1));
        assert!(!hints.is_rank_ordered());
        assert_eq!(hints.drift(), 1);

        hints.try_resort(&Ranking::LeastUsed, |_| true);
        hints.disturb();
        assert!(!hints.is_rank_ordered());
    }

    #[test]
    fn test_resort_tracks_insertion_order() {
        let hints = HintQueue::new();
        hints.push(entry("a", 0));
        assert!(hints.is_insertion_ordered());

        hints.try_resort(&Ranking::LeastUsed, |_| true);
        assert!(!hints.is_insertion_ordered());

        // pushes alone never restore insertion order
        hints.push(entry("b", 1));
        assert!(!hints.is_insertion_ordered());

        hints.try_resort(&Ranking::Oldest, |_| true);
        assert!(hints.is_insertion_ordered());
    }

    #[test]
    fn test_requeue_front_keeps_order() {
        let hints = HintQueue::new();
        hints.push(entry("c", 2));

        hints.requeue_front(vec![entry("a", 0), entry("b", 1)]);

        assert_eq!(hints.pop().unwrap().key(), "a");
        assert_eq!(hints.pop().unwrap().key(), "b");
        assert_eq!(hints.pop().unwrap().key(), "c");
    }

    #[test]
    fn test_resort_flag_released_after_panic() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let hints = HintQueue::new();
        hints.push(entry("a", 0));
        hints.push(entry("b", 1));

        let faulty: Ranking<String> =
            Ranking::Custom(Arc::new(
                |_: &CacheEntry<String>, _: &CacheEntry<String>| -> std::cmp::Ordering {
                    panic!("comparator fault")
                },
            ));
        let result = catch_unwind(AssertUnwindSafe(|| hints.try_resort(&faulty, |_| true)));
        assert!(result.is_err());

        assert!(hints.try_resort(&Ranking::Oldest, |_| true).is_some());
    }
}
