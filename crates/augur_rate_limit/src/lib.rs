//! Request discipline for a single rate-limited upstream.
//!
//! Two cooperating pieces keep many uncoordinated callers inside the
//! upstream's quota:
//!
//! - [`RequestQueue`] serializes dispatches in arrival order and enforces a
//!   minimum gap between the starts of consecutive calls.
//! - [`RetryPolicy`] retries quota failures with multiplicative backoff plus
//!   random jitter, and classifies everything else into a typed error on the
//!   first occurrence.
//!
//! The intelligence service runs every attempt, retries included, through the
//! queue, so retries respect the same spacing as first attempts.

mod config;
mod queue;
mod retry;

pub use config::{RetryConfig, RetryConfigBuilder, ThrottleConfig, ThrottleConfigBuilder};
pub use queue::RequestQueue;
pub use retry::{BackoffSchedule, RetryPolicy};
