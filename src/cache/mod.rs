//! Cache Module
//!
//! Provides a bounded concurrent cache with oldest, least-used or custom
//! eviction ranking.

mod entry;
mod hints;
mod key;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub(crate) use hints::HintQueue;
pub use key::CacheKey;
pub use policy::{Comparator, EvictionPolicy, PolicyKind, Ranking};
pub use stats::CacheStats;
pub use store::CappedCache;
