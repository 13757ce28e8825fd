//! Error types for the capped cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the capped cache.
///
/// Capacity overshoot is never reported here: the bound is soft and a
/// failed eviction is tolerated silently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is absent (empty string, `None`, ...) and cannot be cached
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Construction parameters are out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the capped cache.
pub type Result<T> = std::result::Result<T, CacheError>;
