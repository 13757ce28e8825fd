//! Cache Store Module
//!
//! Main cache engine combining a sharded concurrent map with a hint queue
//! and a swappable eviction ranking.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::cache::key::{self, CacheKey};
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, HintQueue, PolicyKind, Ranking};
use crate::config::{CacheConfig, DEFAULT_CAPACITY};
use crate::error::Result;

/// Hints popped per put before falling back to the ranked scan.
const FAST_EVICTION_ATTEMPTS: usize = 2;

/// Hint queue length, as a multiple of capacity, that forces a re-sort.
const HINT_LIMIT_FACTOR: usize = 2;

/// Value stored under a key, alongside the entry used to rank it.
struct Slot<K, V> {
    entry: Arc<CacheEntry<K>>,
    value: V,
}

// == Capped Cache ==
/// Bounded concurrent cache with a pluggable eviction policy.
///
/// The capacity is a soft bound. Every put that takes the cache over
/// capacity attempts one eviction, but concurrent puts may each overshoot
/// before their evictions land, and two threads may evict two entries for
/// one breach. Under concurrent hits the victim follows the policy on a
/// best-effort basis only.
///
/// ```
/// use capped_cache::{CappedCache, EvictionPolicy};
///
/// let cache = CappedCache::new(EvictionPolicy::Oldest, 2);
/// cache.put("a".to_string(), 1).unwrap();
/// cache.put("b".to_string(), 2).unwrap();
/// cache.put("c".to_string(), 3).unwrap();
///
/// assert_eq!(cache.get(&"a".to_string()).unwrap(), None);
/// assert_eq!(cache.len(), 2);
/// ```
pub struct CappedCache<K, V> {
    /// Key-value storage
    entries: DashMap<K, Slot<K, V>>,
    /// Insertion-order candidates for the fast eviction path
    hints: HintQueue<K>,
    /// Active ranking, swapped atomically by `set_comparator`
    ranking: ArcSwap<Ranking<K>>,
    /// Activity counters
    stats: StatsRecorder,
    /// Soft bound on live entries
    capacity: usize,
    /// Live-entry count above which hits re-sort the hint queue
    concurrency_hint: usize,
    /// Entries younger than this are never evicted
    grace_period: Option<Duration>,
    /// Source of per-entry insertion sequence numbers
    sequence: AtomicU64,
}

impl<K: CacheKey, V: Clone> CappedCache<K, V> {
    // == Constructor ==
    /// Creates a cache with default sizing hints.
    ///
    /// # Arguments
    /// * `policy` - Built-in eviction ranking
    /// * `capacity` - Soft bound on the number of entries
    pub fn new(policy: EvictionPolicy, capacity: usize) -> Self {
        Self::build(CacheConfig::new(policy, capacity))
    }

    /// Creates a cache from a validated config.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity_and_shard_amount(
                config.store_slots(),
                config.store_shards(),
            ),
            hints: HintQueue::new(),
            ranking: ArcSwap::from_pointee(Ranking::from(config.policy)),
            stats: StatsRecorder::default(),
            capacity: config.capacity,
            concurrency_hint: config.concurrency_hint,
            grace_period: config.grace_period,
            sequence: AtomicU64::new(0),
        }
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// A hit under a usage-sensitive policy bumps the entry's usage count.
    /// A miss has no side effect besides the miss counter.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        key::validate(key)?;

        let (value, entry) = match self.entries.get(key) {
            Some(slot) => (slot.value.clone(), Arc::clone(&slot.entry)),
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
        };
        self.stats.record_hit();

        let ranking = self.ranking.load_full();
        if ranking.is_usage_sensitive() {
            entry.record_hit();
            self.hints.disturb();
            self.maintain_hints(&ranking);
        }

        Ok(Some(value))
    }

    // == Put ==
    /// Stores `value` under `key`, returning the value it replaced.
    ///
    /// Replacing the value of a live key keeps its entry (insertion time and
    /// usage count) and never evicts. Inserting a new key may evict one
    /// other entry when the cache goes over capacity.
    pub fn put(&self, key: K, value: V) -> Result<Option<V>> {
        key::validate(&key)?;

        let inserted = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let previous = std::mem::replace(&mut occupied.get_mut().value, value);
                self.stats.record_update();
                return Ok(Some(previous));
            }
            Entry::Vacant(vacant) => {
                let entry = Arc::new(CacheEntry::new(vacant.key().clone(), self.next_sequence()));
                vacant.insert(Slot {
                    entry: Arc::clone(&entry),
                    value,
                });
                entry
            }
        };
        self.stats.record_insert();

        let ranking = self.ranking.load_full();
        // The new entry itself is never a fast-path candidate, so a ranked
        // queue stays usable past the push below.
        let hints_trusted = if ranking.follows_insertion_order() {
            self.hints.is_insertion_ordered()
        } else {
            self.hints.is_rank_ordered()
        };
        self.hints.push(Arc::clone(&inserted));

        if self.entries.len() > self.capacity {
            self.enforce_capacity(&ranking, &inserted, hints_trusted);
        }
        if self.hints.len() > self.capacity.saturating_mul(HINT_LIMIT_FACTOR) {
            self.resort_hints(&ranking);
        }
        Ok(None)
    }

    // == Set Comparator ==
    /// Installs a custom ranking. Entries comparing `Less` are evicted first.
    ///
    /// Only evictions that happen after this call are affected. A panic
    /// raised by the comparator propagates out of the `put` or `get` that
    /// triggered the ranking.
    pub fn set_comparator<F>(&self, comparator: F)
    where
        F: Fn(&CacheEntry<K>, &CacheEntry<K>) -> CmpOrdering + Send + Sync + 'static,
    {
        self.install(Ranking::Custom(Arc::new(comparator)));
    }

    /// Switches back to a built-in ranking.
    pub fn set_policy(&self, policy: EvictionPolicy) {
        self.install(Ranking::from(policy));
    }

    fn install(&self, ranking: Ranking<K>) {
        info!(policy = ?ranking, "Eviction policy replaced");
        let ranking = Arc::new(ranking);
        self.ranking.store(Arc::clone(&ranking));
        self.hints.disturb();

        // Ordering by insertion never calls into caller code, so the queue
        // can be put back in that order right away.
        if ranking.follows_insertion_order() && !self.hints.is_insertion_ordered() {
            self.resort_hints(&ranking);
        }
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.ranking.load().kind()
    }

    // == Read-only accessors ==
    /// Returns true if `key` is cached. Does not count as a hit.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Usage count of the live entry for `key`.
    pub fn usage_count(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|slot| slot.entry.usage_count())
    }

    /// Live keys in eviction order under the active policy, most evictable
    /// first.
    pub fn ranked_keys(&self) -> Vec<K> {
        let ranking = self.ranking.load_full();
        ranking
            .rank(self.live_entries())
            .into_iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
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

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Capacity Enforcement ==
    fn enforce_capacity(
        &self,
        ranking: &Ranking<K>,
        inserted: &Arc<CacheEntry<K>>,
        hints_trusted: bool,
    ) {
        if hints_trusted {
            if let Some(victim) = self.evict_from_hints(inserted) {
                debug!(key = ?victim.key(), "Evicted entry from hint queue");
                self.stats.record_fast_eviction();
                return;
            }
        }

        if let Some(victim) = self.evict_ranked(ranking) {
            debug!(key = ?victim.key(), "Evicted entry by ranked scan");
            self.stats.record_ranked_eviction();
            return;
        }

        debug!(
            len = self.entries.len(),
            capacity = self.capacity,
            "No entry could be evicted, tolerating overshoot"
        );
        self.stats.record_missed_eviction();
    }

    /// Pops up to [`FAST_EVICTION_ATTEMPTS`] hints and removes the first one
    /// still live. The just-inserted entry does not use up an attempt.
    fn evict_from_hints(&self, inserted: &Arc<CacheEntry<K>>) -> Option<Arc<CacheEntry<K>>> {
        let mut set_aside = Vec::new();
        let mut attempts = 0;
        let mut victim = None;

        while attempts < FAST_EVICTION_ATTEMPTS {
            let Some(hint) = self.hints.pop() else {
                break;
            };
            if Arc::ptr_eq(&hint, inserted) {
                set_aside.push(hint);
                continue;
            }
            attempts += 1;
            if self.is_protected(&hint) {
                set_aside.push(hint);
                continue;
            }
            if self.remove_entry(&hint) {
                victim = Some(hint);
                break;
            }
            trace!(key = ?hint.key(), "Discarded stale hint");
        }

        self.hints.requeue_front(set_aside);
        victim
    }

    /// Ranks a snapshot of every live entry and removes the first candidate
    /// still present.
    fn evict_ranked(&self, ranking: &Ranking<K>) -> Option<Arc<CacheEntry<K>>> {
        ranking
            .rank(self.live_entries())
            .into_iter()
            .filter(|candidate| !self.is_protected(candidate))
            .find(|candidate| self.remove_entry(candidate))
    }

    /// Re-sorts the hint queue once it has drifted far enough.
    fn maintain_hints(&self, ranking: &Ranking<K>) {
        let threshold = self.concurrency_hint;
        if self.entries.len() <= threshold || self.hints.drift() < threshold as u64 {
            return;
        }
        self.resort_hints(ranking);
    }

    /// Re-sorts the hint queue by `ranking`, dropping hints whose entry is
    /// gone. Skipped if another thread is already re-sorting.
    fn resort_hints(&self, ranking: &Ranking<K>) {
        if let Some(kept) = self.hints.try_resort(ranking, |hint| self.is_live(hint)) {
            debug!(kept, "Re-sorted hint queue");
            self.stats.record_hint_resort();
        }
    }

    // == Helpers ==
    fn live_entries(&self) -> Vec<Arc<CacheEntry<K>>> {
        self.entries
            .iter()
            .map(|slot| Arc::clone(&slot.value().entry))
            .collect()
    }

    /// Removes the store mapping only if it still belongs to `entry`, so a
    /// hint left over from an earlier incarnation of a key never evicts the
    /// current one.
    fn remove_entry(&self, entry: &Arc<CacheEntry<K>>) -> bool {
        self.entries
            .remove_if(entry.key(), |_, slot| Arc::ptr_eq(&slot.entry, entry))
            .is_some()
    }

    fn is_live(&self, entry: &Arc<CacheEntry<K>>) -> bool {
        self.entries
            .get(entry.key())
            .map_or(false, |slot| Arc::ptr_eq(&slot.entry, entry))
    }

    fn is_protected(&self, entry: &CacheEntry<K>) -> bool {
        self.grace_period.map_or(false, |grace| entry.age() < grace)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

impl<K: CacheKey, V: Clone> Default for CappedCache<K, V> {
    fn default() -> Self {
        Self::new(EvictionPolicy::Oldest, DEFAULT_CAPACITY)
    }
}

impl<K: CacheKey, V> fmt::Debug for CappedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CappedCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.ranking.load().kind())
            .field("hints", &self.hints.len())
            .finish()
    }
}
