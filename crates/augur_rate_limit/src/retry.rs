//! Retry with multiplicative backoff for quota failures.

use crate::RetryConfig;
use augur_error::{IntelError, IntelResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Delay sequence: `min(initial * factor^n, max_backoff) + jitter`.
///
/// The deterministic part grows strictly until it reaches the cap (given
/// `factor > 1`); jitter is drawn uniformly from `0..=max_jitter` per step.
/// The iterator is unbounded; [`RetryPolicy`] truncates it to the retry budget.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    next_ms: f64,
    factor: f64,
    max_backoff_ms: u64,
    max_jitter_ms: u64,
}

impl BackoffSchedule {
    /// Build a schedule from configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            next_ms: *config.initial_backoff_ms() as f64,
            factor: *config.factor(),
            max_backoff_ms: *config.max_backoff_ms(),
            max_jitter_ms: *config.max_jitter_ms(),
        }
    }

    /// Deterministic component of the next delay, without consuming it.
    pub fn peek_base(&self) -> Duration {
        Duration::from_millis(self.base_ms())
    }

    fn base_ms(&self) -> u64 {
        (self.next_ms.max(0.0) as u64).min(self.max_backoff_ms)
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let base = self.base_ms();
        self.next_ms *= self.factor;

        let jitter = if self.max_jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.max_jitter_ms)
        };

        Some(Duration::from_millis(base.saturating_add(jitter)))
    }
}

/// Retries rate-limited operations, surfacing every other failure at once.
///
/// # Example
///
/// ```
/// use augur_error::{GeminiError, IntelErrorKind};
/// use augur_rate_limit::{RetryConfig, RetryPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::new(RetryConfig::default());
/// let result: Result<(), _> = policy
///     .execute(|| async { Err(GeminiError::http(403, "API key not valid")) })
///     .await;
/// assert_eq!(result.unwrap_err().kind, IntelErrorKind::AuthDenied);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy from configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Same backoff shape with a different retry budget.
    pub fn with_max_retries(&self, max_retries: usize) -> Self {
        Self {
            config: self.config.clone().with_max_retries(max_retries),
        }
    }

    /// The policy's configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Fresh delay schedule for one logical call.
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(&self.config)
    }

    /// Run `operation`, retrying while its failures classify as rate-limited.
    ///
    /// The operation is invoked at most `max_retries + 1` times. Failures are
    /// classified exactly once, here, into an [`IntelError`].
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> IntelResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<IntelError>,
    {
        let max_retries = *self.config.max_retries();
        let mut attempt = 0usize;

        let result = Retry::spawn(self.schedule().take(max_retries), || {
            attempt += 1;
            let current = attempt;
            let pending = operation();
            async move {
                match pending.await {
                    Ok(value) => {
                        if current > 1 {
                            debug!(attempt = current, "Succeeded after retry");
                        }
                        Ok(value)
                    }
                    Err(e) => {
                        let err: IntelError = e.into();
                        if err.kind.is_retryable() && current <= max_retries {
                            warn!(
                                attempt = current,
                                max_retries,
                                error = %err,
                                "Rate limited, will retry"
                            );
                            Err(RetryError::Transient {
                                err,
                                retry_after: None,
                            })
                        } else {
                            Err(RetryError::Permanent(err))
                        }
                    }
                }
            }
        })
        .await;

        result.map_err(|err| {
            if err.kind.is_retryable() {
                warn!(attempts = attempt, error = %err, "Retry budget exhausted");
                let message = format!("{} after {} attempts", err.message, attempt);
                err.with_message(message)
            } else {
                warn!(error = %err, "Permanent failure, not retrying");
                err
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_jitter_ms: u64) -> RetryConfig {
        RetryConfig::default()
            .with_initial_backoff_ms(100)
            .with_factor(2.0)
            .with_max_backoff_ms(1_000)
            .with_max_jitter_ms(max_jitter_ms)
    }

    #[test]
    fn base_grows_then_caps() {
        let delays: Vec<_> = BackoffSchedule::new(&config(0)).take(6).collect();
        let ms: Vec<u128> = delays.iter().map(Duration::as_millis).collect();
        assert_eq!(ms, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn jitter_stays_within_bound() {
        for (n, delay) in BackoffSchedule::new(&config(50)).take(4).enumerate() {
            let base = 100u128 << n;
            let ms = delay.as_millis();
            assert!(ms >= base && ms <= base + 50, "step {n}: {ms}ms");
        }
    }

    #[test]
    fn peek_does_not_advance() {
        let schedule = BackoffSchedule::new(&config(0));
        assert_eq!(schedule.peek_base(), Duration::from_millis(100));
        assert_eq!(schedule.peek_base(), Duration::from_millis(100));
    }
}
