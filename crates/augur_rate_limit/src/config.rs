//! Configuration structures for throttling and retry.
//!
//! Both structs deserialize from the `[throttle]` and `[retry]` tables of
//! `augur.toml`; every field has a default so partial tables are fine.
//!
//! ```toml
//! [throttle]
//! min_delay_ms = 4500
//!
//! [retry]
//! max_retries = 5
//! initial_backoff_ms = 2000
//! factor = 2.0
//! max_jitter_ms = 1000
//! max_backoff_ms = 300000
//! ```

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum spacing between real network dispatches.
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
pub struct ThrottleConfig {
    /// Minimum delay between dispatch starts (milliseconds)
    #[serde(default = "default_min_delay_ms")]
    min_delay_ms: u64,
}

fn default_min_delay_ms() -> u64 {
    4500
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
        }
    }
}

impl ThrottleConfig {
    /// Minimum delay as a `Duration`.
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

/// Retry budget and backoff shape for rate-limited attempts.
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
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: usize,

    /// First backoff delay (milliseconds)
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,

    /// Multiplicative growth per retry
    #[serde(default = "default_factor")]
    factor: f64,

    /// Upper bound of the random jitter added to each delay (milliseconds)
    #[serde(default = "default_max_jitter_ms")]
    max_jitter_ms: u64,

    /// Cap on the deterministic part of a delay (milliseconds).
    ///
    /// The default leaves room for eight strictly growing delays at factor 2.0.
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
}

fn default_max_retries() -> usize {
    5
}

fn default_initial_backoff_ms() -> u64 {
    2000
}

fn default_factor() -> f64 {
    2.0
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    300_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            factor: default_factor(),
            max_jitter_ms: default_max_jitter_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
