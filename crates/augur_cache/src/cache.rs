//! TTL cache and in-flight registry.

use crate::CacheKey;
use augur_error::{IntelError, IntelErrorKind, IntelResult};
use derive_getters::Getters;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

type InFlight = Shared<BoxFuture<'static, IntelResult<JsonValue>>>;

/// Cached value with the moment it was stored.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: JsonValue,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Fresh iff `now - stored_at < ttl`.
    pub fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.stored_at.elapsed())
    }
}

/// Configuration for the response cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheConfig {
    /// TTL used when a call site gives none (seconds)
    #[serde(default = "default_ttl_secs")]
    default_ttl_secs: u64,

    /// Maximum number of cached entries
    #[serde(default = "default_max_entries")]
    max_entries: usize,

    /// Whether results are memoized; de-duplication applies regardless
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_max_entries() -> usize {
    1000
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            enabled: default_enabled(),
        }
    }
}

impl CacheConfig {
    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Lookup counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters)]
pub struct CacheStats {
    /// Served from a fresh entry
    hits: u64,
    /// Started a real fetch
    misses: u64,
    /// Joined a fetch already in flight
    joined: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, InFlight>,
    stats: CacheStats,
}

impl CacheState {
    fn fresh(&mut self, key: &CacheKey) -> Option<JsonValue> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh() {
            debug!(key = %key, time_remaining = ?entry.time_remaining(), "Cache hit");
            return Some(entry.value.clone());
        }
        debug!(key = %key, "Cache entry expired, removing");
        self.entries.remove(key);
        None
    }

    fn store(&mut self, key: CacheKey, value: JsonValue, ttl: Duration, max_entries: usize) {
        if max_entries == 0 {
            return;
        }
        if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
            self.entries.retain(|_, entry| entry.is_fresh());
        }
        if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.stored_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!(key = %key, "Evicting oldest entry");
            self.entries.remove(&key);
        }
    }
}

/// TTL cache that also collapses concurrent fetches of the same key.
///
/// Each key is in exactly one of three states: absent, in flight, or cached.
/// A fetch that succeeds moves its key to cached; one that fails leaves it
/// absent, so the next caller starts over. Failures are never cached.
///
/// Fetches run on their own task, so a fetch completes (and warms the cache)
/// even if every caller waiting on it is dropped.
///
/// Cloning is cheap; clones share entries and in-flight fetches.
///
/// # Example
///
/// ```
/// use augur_cache::{CacheConfig, CacheKey, ResponseCache};
/// use augur_error::IntelError;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), augur_error::IntelError> {
/// let cache = ResponseCache::new(CacheConfig::default());
/// let key = CacheKey::new("weather", &["oslo"]);
///
/// let first = cache.get_or_fetch(&key, None, || async { Ok::<_, IntelError>(json!({"temperature_c": 4.0})) }).await?;
/// // Fresh entry: the second fetch never runs.
/// let second = cache.get_or_fetch(&key, None, || async { Ok::<_, IntelError>(json!(null)) }).await?;
///
/// assert_eq!(first, second);
/// assert_eq!(*cache.stats().hits(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResponseCache {
    config: CacheConfig,
    state: Arc<Mutex<CacheState>>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ResponseCache")
            .field("config", &self.config)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ResponseCache {
    /// Create a new response cache with configuration.
    pub fn new(config: CacheConfig) -> Self {
        debug!(
            default_ttl_secs = config.default_ttl_secs,
            max_entries = config.max_entries,
            enabled = config.enabled,
            "Creating new ResponseCache"
        );
        Self {
            config,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// The cache's configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the value for `key`, fetching it at most once across callers.
    ///
    /// 1. A fresh entry is returned without calling `fetch`.
    /// 2. Otherwise, if a fetch for `key` is in flight, its result is shared.
    /// 3. Otherwise `fetch` is called and its future spawned; on success the
    ///    value is stored for `ttl` (or the configured default).
    ///
    /// `fetch` runs while the cache's lock is held and must only construct
    /// the future; the future itself may do anything, including using this
    /// cache.
    #[instrument(skip(self, fetch), fields(key = %key))]
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        fetch: F,
    ) -> IntelResult<JsonValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = IntelResult<JsonValue>> + Send + 'static,
    {
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());

        let shared = {
            let mut state = self.lock();

            if self.config.enabled
                && let Some(value) = state.fresh(key)
            {
                state.stats.hits += 1;
                return Ok(value);
            }

            if let Some(pending) = state.in_flight.get(key) {
                debug!("Joining in-flight fetch");
                let pending = pending.clone();
                state.stats.joined += 1;
                pending
            } else {
                debug!("Cache miss, starting fetch");
                state.stats.misses += 1;
                let shared = self.spawn_fetch(key.clone(), ttl, fetch());
                state.in_flight.insert(key.clone(), shared.clone());
                shared
            }
        };

        shared.await
    }

    // Caller holds the lock, so the settle step cannot observe the registry
    // before the new entry is inserted.
    fn spawn_fetch<Fut>(&self, key: CacheKey, ttl: Duration, fetch: Fut) -> InFlight
    where
        Fut: Future<Output = IntelResult<JsonValue>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let enabled = self.config.enabled;
        let max_entries = self.config.max_entries;

        let task = tokio::spawn(async move {
            let result = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(IntelError::new(
                        IntelErrorKind::Unknown,
                        "fetch panicked before completing",
                    ))
                });

            let mut guard = lock(&state);
            guard.in_flight.remove(&key);
            match &result {
                Ok(value) if enabled => {
                    debug!(key = %key, ttl = ?ttl, "Storing fetched value");
                    guard.store(key, value.clone(), ttl, max_entries);
                }
                Ok(_) => {}
                Err(e) => debug!(key = %key, code = e.code(), "Fetch failed, nothing cached"),
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(IntelError::new(
                    IntelErrorKind::Unknown,
                    format!("fetch task did not complete: {e}"),
                ))
            })
        }
        .boxed()
        .shared()
    }

    /// Cached value for `key` if still fresh.
    pub fn get(&self, key: &CacheKey) -> Option<JsonValue> {
        if !self.config.enabled {
            return None;
        }
        self.lock().fresh(key)
    }

    /// Whether `key` has a fresh entry.
    pub fn contains_fresh(&self, key: &CacheKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(CacheEntry::is_fresh)
    }

    /// Drop the entry for `key`. An in-flight fetch is unaffected.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.lock().entries.remove(key).is_some();
        if removed {
            debug!(key = %key, "Invalidated cache entry");
        }
        removed
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh());

        let removed = before - state.entries.len();
        if removed > 0 {
            info!(removed, remaining = state.entries.len(), "Cleaned up expired cache entries");
        }
        removed
    }

    /// Clear all cache entries.
    pub fn clear(&self) {
        let mut state = self.lock();
        let count = state.entries.len();
        state.entries.clear();
        info!(cleared = count, "Cleared cache");
    }

    /// Get number of cached entries, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Fetches currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Lookup counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        lock(&self.state)
    }
}

// No critical section can panic midway, so poisoned data is still consistent.
fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
