//! Cache Key Module
//!
//! Defines which key values may enter the cache.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{CacheError, Result};

// == Cache Key ==
/// Requirements on a cache key.
///
/// Identity and hashing come from `Hash + Eq` on the key alone. A key that
/// reports itself as absent (the empty string, `None`) is rejected with
/// [`CacheError::InvalidArgument`] before any lookup or insertion happens.
///
/// Implement it for your own key types with an empty block when every value
/// is a valid key:
///
/// ```
/// use capped_cache::CacheKey;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct UserId(u64);
///
/// impl CacheKey for UserId {}
/// ```
pub trait CacheKey: Hash + Eq + Clone + Debug + Send + Sync + 'static {
    /// Returns true when this value stands for "no key".
    fn is_absent(&self) -> bool {
        false
    }
}

impl CacheKey for String {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl CacheKey for &'static str {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<T: CacheKey> CacheKey for Option<T> {
    fn is_absent(&self) -> bool {
        match self {
            Some(inner) => inner.is_absent(),
            None => true,
        }
    }
}

macro_rules! never_absent {
    ($($t:ty),* $(,)?) => {
        $(impl CacheKey for $t {})*
    };
}

never_absent!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char, bool);

// == Validate ==
/// Fails fast on an absent key.
pub(crate) fn validate<K: CacheKey>(key: &K) -> Result<()> {
    if key.is_absent() {
        return Err(CacheError::InvalidArgument(format!(
            "cache key must not be absent, got {:?}",
            key
        )));
    }
    Ok(())
}
