//! Configuration Module
//!
//! Handles cache construction parameters and loading them from environment
//! variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Default soft capacity of a cache built without arguments.
pub const DEFAULT_CAPACITY: usize = 64;
/// Default load factor handed to the entry store.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;
/// Default concurrency hint; also the live-entry count above which hits
/// trigger a hint queue re-sort.
pub const DEFAULT_CONCURRENCY_HINT: usize = 16;

const MAX_PRESIZED_SLOTS: usize = 1 << 20;
const MAX_STORE_SHARDS: usize = 1024;

/// Cache construction parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Soft bound on the number of live entries
    pub capacity: usize,
    /// Ranking used to pick eviction victims
    pub policy: EvictionPolicy,
    /// Number of entries the store is pre-sized for
    pub initial_capacity: usize,
    /// Fill ratio the store is pre-sized against
    pub load_factor: f32,
    /// Expected number of concurrently writing threads
    pub concurrency_hint: usize,
    /// Entries younger than this are never evicted
    pub grace_period: Option<Duration>,
}

impl CacheConfig {
    /// Creates a config for the given policy and capacity, with the store
    /// pre-sized to one and a half times the capacity.
    pub fn new(policy: EvictionPolicy, capacity: usize) -> Self {
        Self {
            capacity,
            policy,
            initial_capacity: capacity.saturating_add(capacity / 2),
            load_factor: DEFAULT_LOAD_FACTOR,
            concurrency_hint: DEFAULT_CONCURRENCY_HINT,
            grace_period: None,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Soft capacity (default: 64)
    /// - `CACHE_POLICY` - `oldest` or `least_used` (default: oldest)
    /// - `CACHE_INITIAL_CAPACITY` - Store pre-size (default: capacity * 1.5)
    /// - `CACHE_LOAD_FACTOR` - Store load factor (default: 0.75)
    /// - `CACHE_CONCURRENCY_HINT` - Concurrency hint (default: 16)
    /// - `CACHE_GRACE_MS` - Eviction grace period in milliseconds (default: none)
    pub fn from_env() -> Self {
        let capacity = env_or("CACHE_CAPACITY", DEFAULT_CAPACITY);
        let policy = env_or("CACHE_POLICY", EvictionPolicy::default());
        let base = Self::new(policy, capacity);

        Self {
            initial_capacity: env_or("CACHE_INITIAL_CAPACITY", base.initial_capacity),
            load_factor: env_or("CACHE_LOAD_FACTOR", base.load_factor),
            concurrency_hint: env_or("CACHE_CONCURRENCY_HINT", base.concurrency_hint),
            grace_period: env::var("CACHE_GRACE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            ..base
        }
    }

    pub fn with_sizing(
        mut self,
        initial_capacity: usize,
        load_factor: f32,
        concurrency_hint: usize,
    ) -> Self {
        self.initial_capacity = initial_capacity;
        self.load_factor = load_factor;
        self.concurrency_hint = concurrency_hint;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = Some(grace);
        self
    }

    // == Validate ==
    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(CacheError::InvalidConfig(format!(
                "load factor must be in (0, 1], got {}",
                self.load_factor
            )));
        }
        if self.concurrency_hint == 0 {
            return Err(CacheError::InvalidConfig(
                "concurrency hint must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of slots to pre-allocate in the store. Larger caches grow
    /// past [`MAX_PRESIZED_SLOTS`] on demand.
    pub(crate) fn store_slots(&self) -> usize {
        let slots = 1.0 + self.initial_capacity as f64 / self.load_factor as f64;
        (slots as usize).min(MAX_PRESIZED_SLOTS)
    }

    /// Shard count for the store: a power of two, at least 2.
    pub(crate) fn store_shards(&self) -> usize {
        self.concurrency_hint
            .clamp(2, MAX_STORE_SHARDS)
            .next_power_of_two()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(EvictionPolicy::Oldest, DEFAULT_CAPACITY)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.policy, EvictionPolicy::Oldest);
        assert_eq!(config.initial_capacity, 96);
        assert_eq!(config.load_factor, 0.75);
        assert_eq!(config.concurrency_hint, 16);
        assert!(config.grace_period.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_CAPACITY",
            "CACHE_POLICY",
            "CACHE_INITIAL_CAPACITY",
            "CACHE_LOAD_FACTOR",
            "CACHE_CONCURRENCY_HINT",
            "CACHE_GRACE_MS",
        ] {
            env::remove_var(name);
        }

        let config = CacheConfig::from_env();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let zero = CacheConfig::new(EvictionPolicy::Oldest, 0);
        assert!(matches!(zero.validate(), Err(CacheError::InvalidConfig(_))));

        let bad_load = CacheConfig::default().with_sizing(10, 1.5, 4);
        assert!(bad_load.validate().is_err());

        let no_threads = CacheConfig::default().with_sizing(10, 0.5, 0);
        assert!(no_threads.validate().is_err());
    }

    #[test]
    fn test_store_sizing() {
        let config = CacheConfig::default().with_sizing(30, 0.75, 3);
        assert_eq!(config.store_slots(), 41);
        assert_eq!(config.store_shards(), 4);

        let single = CacheConfig::default().with_sizing(0, 1.0, 1);
        assert_eq!(single.store_slots(), 1);
        assert_eq!(single.store_shards(), 2);
    }

    #[test]
    fn test_huge_capacity_sizing_is_clamped() {
        let config = CacheConfig::new(EvictionPolicy::Oldest, usize::MAX);
        assert_eq!(config.initial_capacity, usize::MAX);
        assert_eq!(config.store_slots(), MAX_PRESIZED_SLOTS);

        let wide = CacheConfig::default().with_sizing(10, 0.75, usize::MAX);
        assert_eq!(wide.store_shards(), MAX_STORE_SHARDS);
        assert!(wide.validate().is_ok());
    }
}
