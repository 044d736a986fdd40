//! Metrics for intelligence requests.
//!
//! OpenTelemetry instruments for upstream calls and for the request
//! discipline around them. Without an installed meter provider every
//! recording is a no-op.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;

static METRICS: OnceLock<IntelMetrics> = OnceLock::new();

/// Metrics for upstream calls, caching, retries and normalization.
#[derive(Clone)]
pub struct IntelMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Successful upstream calls
    pub requests: Counter<u64>,
    /// Failed upstream calls, labelled by error code
    pub errors: Counter<u64>,
    /// Upstream call duration in seconds
    pub duration: Histogram<f64>,
    /// Lookups answered from cache
    pub cache_hits: Counter<u64>,
    /// Lookups that started an upstream fetch
    pub cache_misses: Counter<u64>,
    /// Retries after a rate-limited attempt
    pub retries: Counter<u64>,
    /// Responses replaced by a fallback value
    pub normalize_fallbacks: Counter<u64>,
}

impl IntelMetrics {
    fn init() -> Self {
        let meter = global::meter("augur");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("intel.requests")
                .with_description("Successful upstream calls")
                .build(),
            errors: meter
                .u64_counter("intel.errors")
                .with_description("Failed upstream calls")
                .build(),
            duration: meter
                .f64_histogram("intel.duration")
                .with_unit("seconds")
                .with_description("Upstream call duration")
                .build(),
            cache_hits: meter
                .u64_counter("intel.cache.hits")
                .with_description("Lookups answered from cache or a shared in-flight call")
                .build(),
            cache_misses: meter
                .u64_counter("intel.cache.misses")
                .with_description("Lookups that started an upstream fetch")
                .build(),
            retries: meter
                .u64_counter("intel.retries")
                .with_description("Retries after a rate-limited attempt")
                .build(),
            normalize_fallbacks: meter
                .u64_counter("intel.normalize.fallbacks")
                .with_description("Responses replaced by a fallback value")
                .build(),
        }
    }

    /// Get the global metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a successful upstream call.
    pub fn record_request(&self, provider: &str, model: &str, duration_secs: f64) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed upstream call.
    pub fn record_error(&self, provider: &str, model: &str, code: &'static str) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
            KeyValue::new("code", code),
        ];
        self.errors.add(1, labels);
    }

    /// Record a cache lookup for a feature.
    pub fn record_cache_lookup(&self, feature: &str, hit: bool) {
        let labels = &[KeyValue::new("feature", feature.to_string())];
        if hit {
            self.cache_hits.add(1, labels);
        } else {
            self.cache_misses.add(1, labels);
        }
    }

    /// Record one retry for a feature.
    pub fn record_retry(&self, feature: &str) {
        self.retries
            .add(1, &[KeyValue::new("feature", feature.to_string())]);
    }

    /// Record a fallback substitution.
    pub fn record_fallback(&self) {
        self.normalize_fallbacks.add(1, &[]);
    }
}

impl Default for IntelMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}
