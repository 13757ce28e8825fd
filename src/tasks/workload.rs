//! Workload Task
//!
//! Drives a deterministic mixed put/get load against a shared cache from
//! several threads.

use std::env;
use std::thread;
use std::time::{Duration, Instant};

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheStats, CappedCache};

/// Shape of the generated load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Operations issued by each thread
    pub ops_per_thread: usize,
    /// Keys are drawn from `0..key_space`
    pub key_space: u64,
    /// Share of operations that are reads, in percent
    pub read_percent: u8,
}

impl WorkloadConfig {
    /// Loads the workload shape from environment variables.
    ///
    /// # Environment Variables
    /// - `WORKLOAD_THREADS` - Worker threads (default: 4)
    /// - `WORKLOAD_OPS` - Operations per thread (default: 10000)
    /// - `WORKLOAD_KEYS` - Key space size (default: 1024)
    /// - `WORKLOAD_READ_PERCENT` - Read share (default: 70)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            threads: env_or("WORKLOAD_THREADS", defaults.threads).max(1),
            ops_per_thread: env_or("WORKLOAD_OPS", defaults.ops_per_thread),
            key_space: env_or("WORKLOAD_KEYS", defaults.key_space).max(1),
            read_percent: env_or("WORKLOAD_READ_PERCENT", defaults.read_percent).min(100),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops_per_thread: 10_000,
            key_space: 1024,
            read_percent: 70,
        }
    }
}

/// Outcome of a workload run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub threads: usize,
    pub operations: usize,
    pub elapsed_ms: u128,
    pub capacity: usize,
    pub stats: CacheStats,
}

/// Runs the workload to completion and reports the cache statistics.
///
/// Every thread draws from its own xoshiro generator seeded from its index, so
/// two runs with the same config issue the same operations per thread.
/// Values encode the writing thread and operation index.
///
/// # Example
/// ```
/// use capped_cache::{run_workload, CappedCache, EvictionPolicy, WorkloadConfig};
///
/// let cache = CappedCache::new(EvictionPolicy::LeastUsed, 32);
/// let workload = WorkloadConfig { threads: 2, ops_per_thread: 500, ..Default::default() };
/// let report = run_workload(&cache, &workload);
/// assert_eq!(report.operations, 1000);
/// ```
pub fn run_workload(cache: &CappedCache<u64, u64>, workload: &WorkloadConfig) -> WorkloadReport {
    info!(
        "Starting workload: threads={}, ops_per_thread={}, key_space={}, read_percent={}",
        workload.threads, workload.ops_per_thread, workload.key_space, workload.read_percent
    );
    let started = Instant::now();

    thread::scope(|scope| {
        for worker in 0..workload.threads {
            scope.spawn(move || run_worker(cache, workload, worker));
        }
    });

    let elapsed = started.elapsed();
    let stats = cache.stats();
    info!(
        "Workload finished in {:?}: entries={}, hit_rate={:.3}, evictions={}",
        elapsed,
        stats.total_entries,
        stats.hit_rate(),
        stats.evictions()
    );

    WorkloadReport {
        threads: workload.threads,
        operations: workload.threads * workload.ops_per_thread,
        elapsed_ms: elapsed.as_millis(),
        capacity: cache.capacity(),
        stats,
    }
}

fn run_worker(cache: &CappedCache<u64, u64>, workload: &WorkloadConfig, worker: usize) {
    let mut rng = worker_rng(worker);
    let started = Instant::now();

    for op in 0..workload.ops_per_thread {
        let key = rng.random_range(0..workload.key_space.max(1));
        let roll: u8 = rng.random_range(0..100);
        if roll < workload.read_percent {
            cache.get(&key).expect("u64 keys are never absent");
        } else {
            cache
                .put(key, ((worker as u64) << 32) | op as u64)
                .expect("u64 keys are never absent");
        }
    }

    debug!(worker, elapsed = ?started.elapsed(), "Worker finished");
}

fn worker_rng(worker: usize) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(42 + worker as u64)
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
