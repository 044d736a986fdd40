//! Catalogue of dashboard features served by the intelligence client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One logical data feed.
///
/// The feature name prefixes every cache key, and selects the default cache
/// lifetime and retry budget. Live feeds expire quickly; translations and
/// synthesized audio are effectively immutable and keep for a day.
///
/// # Examples
///
/// ```
/// use augur_core::Feature;
/// use std::time::Duration;
///
/// assert_eq!(Feature::Weather.to_string(), "weather");
/// assert_eq!(Feature::Speech.default_ttl(), Duration::from_secs(86_400));
/// assert!(Feature::Signals.default_ttl() < Feature::Weather.default_ttl());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
    /// Current conditions and forecast for a location
    Weather,
    /// Regional public-sentiment heat map
    Sentiment,
    /// Trending signal ticker
    Signals,
    /// Orbital surveillance feed for a sector
    Satellite,
    /// Search-grounded situation briefing
    Briefing,
    /// Text translation
    Translation,
    /// Text-to-speech
    Speech,
}

impl Feature {
    /// Default cache lifetime.
    pub fn default_ttl(&self) -> Duration {
        let secs = match self {
            Feature::Weather => 300,
            Feature::Sentiment => 600,
            Feature::Signals => 60,
            Feature::Satellite => 120,
            Feature::Briefing => 900,
            Feature::Translation | Feature::Speech => 86_400,
        };
        Duration::from_secs(secs)
    }

    /// Default retry budget for rate-limited attempts.
    pub fn default_max_retries(&self) -> usize {
        match self {
            Feature::Signals | Feature::Satellite => 3,
            Feature::Sentiment => 4,
            Feature::Weather | Feature::Briefing => 5,
            Feature::Translation | Feature::Speech => 8,
        }
    }
}
