//! Response caching with TTL support and in-flight de-duplication.
//!
//! [`ResponseCache`] memoizes successful results per [`CacheKey`] and makes
//! sure that, for any key, at most one real upstream call is outstanding.
//! Callers arriving while that call runs share its result.

#![warn(missing_docs)]

mod cache;
mod key;

pub use cache::{CacheConfig, CacheConfigBuilder, CacheEntry, CacheStats, ResponseCache};
pub use key::CacheKey;
