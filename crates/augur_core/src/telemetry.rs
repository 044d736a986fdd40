//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetryFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` for Augur crates when unset.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_telemetry(format: TelemetryFormat) -> Result<(), Box<dyn std::error::Error>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn,augur=info,augur_models=info,augur_rate_limit=info,augur_cache=info")
        })
    };

    let fmt_layer = match format {
        TelemetryFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_filter(filter())
            .boxed(),
        TelemetryFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(filter())
            .boxed(),
    };

    tracing_subscriber::registry().with(fmt_layer).try_init()?;

    Ok(())
}
