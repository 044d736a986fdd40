//! Augur: a disciplined client for AI-generated dashboard intelligence.
//!
//! Many independent widgets want fresh data; the upstream generative API
//! allows only a trickle of requests. [`IntelligenceService`] sits between
//! them and enforces four rules for every call:
//!
//! - **Throttle**: outbound calls start one at a time, in arrival order, at
//!   least `throttle.min_delay_ms` apart.
//! - **Retry**: rate-limit rejections are retried with exponential backoff and
//!   jitter; every other failure surfaces immediately as a typed
//!   [`IntelError`] with a stable [`code`](IntelError::code).
//! - **Cache**: successful results are kept per feature TTL, and concurrent
//!   identical requests share one upstream call.
//! - **Normalize**: model text is parsed defensively; unparseable answers
//!   degrade to a renderable fallback instead of an error.
//!
//! # Example
//!
//! ```no_run
//! use augur::IntelligenceService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! augur::init_telemetry(augur::TelemetryFormat::Pretty)?;
//! let service = IntelligenceService::from_env()?;
//!
//! let (weather, signals) = tokio::join!(
//!     service.weather("Lisbon"),
//!     service.trending_signals("shipping"),
//! );
//! println!("{:?}", weather?.condition);
//! println!("{} signals", signals?.signals.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod features;
mod schema;
mod service;

pub use config::{AugurConfig, ClientConfig, FeatureConfig};
pub use features::DEFAULT_VOICE;
pub use service::{IntelligenceService, IntelligenceServiceBuilder};

pub use augur_cache::{CacheConfig, CacheStats};
pub use augur_core::{
    AudioClip, Briefing, Feature, ForecastDay, NormalizeFailure, NormalizeFailureReason,
    SatelliteFeed, SatellitePass, SentimentHotspot, SentimentMap, Signal, SignalFeed,
    SourceCitation, TelemetryFormat, Translation, WeatherReport, init_telemetry,
};
pub use augur_error::{AugurError, AugurResult, IntelError, IntelErrorKind, IntelResult};
pub use augur_rate_limit::{RetryConfig, ThrottleConfig};
