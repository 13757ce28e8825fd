//! Capped Cache - A bounded concurrent in-memory cache
//!
//! Provides a size-limited concurrent map with oldest-first, least-used or
//! caller-defined eviction.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheEntry, CacheKey, CacheStats, CappedCache, EvictionPolicy, PolicyKind};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::{run_workload, WorkloadConfig};
