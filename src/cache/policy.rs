//! Eviction Policy Module
//!
//! Implements the total orders used to pick an eviction victim.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

/// Caller-supplied total order over entries. Entries that compare `Less`
/// are evicted first.
pub type Comparator<K> = Arc<dyn Fn(&CacheEntry<K>, &CacheEntry<K>) -> Ordering + Send + Sync>;

// == Eviction Policy ==
/// Built-in eviction strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Earliest inserted entry goes first
    #[default]
    Oldest,
    /// Entry with the fewest hits goes first, oldest first on ties
    LeastUsed,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" => Ok(EvictionPolicy::Oldest),
            "least_used" | "least-used" => Ok(EvictionPolicy::LeastUsed),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

/// Which state of the policy machine a cache is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Oldest,
    LeastUsed,
    Custom,
}

// == Ranking ==
/// The active ranking function of a cache.
pub enum Ranking<K> {
    Oldest,
    LeastUsed,
    Custom(Comparator<K>),
}

impl<K> Ranking<K> {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Ranking::Oldest => PolicyKind::Oldest,
            Ranking::LeastUsed => PolicyKind::LeastUsed,
            Ranking::Custom(_) => PolicyKind::Custom,
        }
    }

    /// Whether hits must be counted for this ranking to work.
    ///
    /// A custom comparator may read the usage count, so it is always
    /// treated as usage-sensitive.
    pub fn is_usage_sensitive(&self) -> bool {
        !matches!(self, Ranking::Oldest)
    }

    /// Whether plain insertion order already is the eviction order.
    pub fn follows_insertion_order(&self) -> bool {
        matches!(self, Ranking::Oldest)
    }

    // == Compare ==
    /// Orders two entries, most evictable first.
    pub fn compare(&self, a: &CacheEntry<K>, b: &CacheEntry<K>) -> Ordering {
        match self {
            Ranking::Oldest => by_insertion(a, b),
            Ranking::LeastUsed => a
                .usage_count()
                .cmp(&b.usage_count())
                .then_with(|| by_insertion(a, b)),
            Ranking::Custom(cmp) => cmp(a, b),
        }
    }
}

impl<K: Clone> Ranking<K> {
    // == Rank ==
    /// Sorts live entries into eviction order.
    ///
    /// The comparator runs over point-in-time snapshots, never over the live
    /// entries, and every sorted snapshot is mapped back to its live source
    /// before being returned.
    pub fn rank<I>(&self, live: I) -> Vec<Arc<CacheEntry<K>>>
    where
        I: IntoIterator<Item = Arc<CacheEntry<K>>>,
    {
        let mut snapshots: Vec<CacheEntry<K>> =
            live.into_iter().map(|e| CacheEntry::snapshot(&e)).collect();
        snapshots.sort_by(|a, b| self.compare(a, b));
        snapshots
            .into_iter()
            .filter_map(CacheEntry::restore)
            .collect()
    }
}

impl<K> From<EvictionPolicy> for Ranking<K> {
    fn from(policy: EvictionPolicy) -> Self {
        match policy {
            EvictionPolicy::Oldest => Ranking::Oldest,
            EvictionPolicy::LeastUsed => Ranking::LeastUsed,
        }
    }
}

impl<K> fmt::Debug for Ranking<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ranking::Oldest => f.write_str("Oldest"),
            Ranking::LeastUsed => f.write_str("LeastUsed"),
            Ranking::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn by_insertion<K>(a: &CacheEntry<K>, b: &CacheEntry<K>) -> Ordering {
    a.inserted_at()
        .cmp(&b.inserted_at())
        .then_with(|| a.sequence().cmp(&b.sequence()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn live(key: &str, sequence: u64, hits: u64) -> Arc<CacheEntry<String>> {
        let entry = Arc::new(CacheEntry::new(key.to_string(), sequence));
        for _ in 0..hits {
            entry.record_hit();
        }
        entry
    }

    fn keys(ranked: &[Arc<CacheEntry<String>>]) -> Vec<&str> {
        ranked.iter().map(|e| e.key().as_str()).collect()
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("oldest".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Oldest));
        assert_eq!("LEAST_USED".parse::<EvictionPolicy>(), Ok(EvictionPolicy::LeastUsed));
        assert_eq!("least-used".parse::<EvictionPolicy>(), Ok(EvictionPolicy::LeastUsed));
        assert!("lru".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_oldest_ranks_by_insertion() {
        let a = live("a", 0, 5);
        let b = live("b", 1, 1);
        let c = live("c", 2, 0);

        let ranked = Ranking::Oldest.rank(vec![c, a, b]);
        assert_eq!(keys(&ranked), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_least_used_ranks_by_usage_then_age() {
        let entries = vec![
            live("a", 0, 2),
            live("b", 1, 0),
            live("c", 2, 1),
            live("d", 3, 0),
        ];

        let ranked = Ranking::LeastUsed.rank(entries);
        assert_eq!(keys(&ranked), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_custom_comparator() {
        // newest first
        let newest: Comparator<String> =
            Arc::new(|a: &CacheEntry<String>, b: &CacheEntry<String>| {
                b.sequence().cmp(&a.sequence())
            });
        let ranking = Ranking::Custom(newest);

        let ranked = ranking.rank(vec![live("a", 0, 0), live("b", 1, 0), live("c", 2, 0)]);
        assert_eq!(keys(&ranked), vec!["c", "b", "a"]);
        assert_eq!(ranking.kind(), PolicyKind::Custom);
    }

    #[test]
    fn test_rank_returns_live_entries() {
        let a = live("a", 0, 0);
        let ranked = Ranking::<String>::Oldest.rank(vec![Arc::clone(&a)]);

        assert!(Arc::ptr_eq(&ranked[0], &a));
        assert!(!ranked[0].is_snapshot());
    }

    #[test]
    fn test_comparator_sees_frozen_counts() {
        let a = live("a", 0, 0);
        let b = live("b", 1, 0);
        let target = Arc::clone(&a);

        // bumps a live counter on every comparison
        let noisy: Comparator<String> =
            Arc::new(move |x: &CacheEntry<String>, y: &CacheEntry<String>| {
                target.record_hit();
                x.usage_count()
                    .cmp(&y.usage_count())
                    .then(x.sequence().cmp(&y.sequence()))
            });

        let ranked = Ranking::Custom(noisy).rank(vec![Arc::clone(&b), Arc::clone(&a)]);
        assert_eq!(keys(&ranked), vec!["a", "b"]);
        assert!(a.usage_count() > 0);
    }

    #[test]
    fn test_usage_sensitivity() {
        assert!(!Ranking::<u32>::Oldest.is_usage_sensitive());
        assert!(Ranking::<u32>::LeastUsed.is_usage_sensitive());
        assert!(Ranking::<u32>::Oldest.follows_insertion_order());
        assert!(!Ranking::<u32>::from(EvictionPolicy::LeastUsed).follows_insertion_order());
    }
}
