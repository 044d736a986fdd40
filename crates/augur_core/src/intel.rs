//! Intelligence data shapes consumed by dashboard widgets.
//!
//! Every shape deserializes leniently: missing fields take their defaults, so a
//! partially-formed model answer still renders. `Default` doubles as the
//! fallback value when an answer cannot be parsed at all.

use crate::SourceCitation;
use serde::{Deserialize, Serialize};

/// Current conditions and a short forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WeatherReport {
    /// Location the report describes
    pub location: String,
    /// Temperature in degrees Celsius
    pub temperature_c: f64,
    /// Apparent temperature in degrees Celsius
    pub feels_like_c: f64,
    /// Relative humidity, percent
    pub humidity_pct: f64,
    /// Wind speed, km/h
    pub wind_kph: f64,
    /// Short condition label ("Overcast", "Light rain")
    pub condition: String,
    /// One-paragraph summary
    pub summary: String,
    /// Upcoming days
    pub forecast: Vec<ForecastDay>,
    /// Active alerts
    pub alerts: Vec<String>,
    /// Grounding sources
    pub sources: Vec<SourceCitation>,
}

/// One forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForecastDay {
    /// Day label
    pub day: String,
    /// High, degrees Celsius
    pub high_c: f64,
    /// Low, degrees Celsius
    pub low_c: f64,
    /// Condition label
    pub condition: String,
    /// Chance of precipitation, percent
    pub precipitation_pct: f64,
}

/// Sentiment heat map for a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentimentMap {
    /// Region the map covers
    pub region: String,
    /// Aggregate score in `[-1.0, 1.0]`
    pub overall_score: f64,
    /// Dominant mood label
    pub dominant_mood: String,
    /// Localized hotspots
    pub hotspots: Vec<SentimentHotspot>,
}

/// A single point on the sentiment map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentimentHotspot {
    /// Place name
    pub name: String,
    /// Latitude, degrees
    pub latitude: f64,
    /// Longitude, degrees
    pub longitude: f64,
    /// Score in `[-1.0, 1.0]`
    pub score: f64,
    /// Message volume behind the score
    pub volume: u64,
    /// Driving keywords
    pub keywords: Vec<String>,
}

/// Ticker of trending signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SignalFeed {
    /// Topic filter the feed was generated for
    pub topic: String,
    /// Signals, strongest first
    pub signals: Vec<Signal>,
}

/// One trending signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Signal {
    /// Stable identifier
    pub id: String,
    /// Headline
    pub headline: String,
    /// Category label
    pub category: String,
    /// Intensity in `[0, 100]`
    pub intensity: f64,
    /// Rate of change, signed
    pub velocity: f64,
    /// Region of origin
    pub region: String,
}

/// Orbital surveillance feed for a sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SatelliteFeed {
    /// Sector identifier
    pub sector: String,
    /// Satellites currently over the sector
    pub passes: Vec<SatellitePass>,
    /// Flagged anomalies
    pub anomalies: Vec<String>,
}

/// A satellite pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SatellitePass {
    /// Designation
    pub designation: String,
    /// Orbit class ("LEO", "GEO")
    pub orbit: String,
    /// Latitude, degrees
    pub latitude: f64,
    /// Longitude, degrees
    pub longitude: f64,
    /// Altitude, km
    pub altitude_km: f64,
    /// Operational status
    pub status: String,
}

/// Search-grounded situation briefing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Briefing {
    /// The question the briefing answers
    pub query: String,
    /// Narrative summary
    pub summary: String,
    /// Bullet points
    pub key_points: Vec<String>,
    /// Threat level label
    pub threat_level: String,
    /// Grounding sources
    pub sources: Vec<SourceCitation>,
}

/// Translated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Translation {
    /// Original text
    pub source_text: String,
    /// Detected source language
    pub detected_language: String,
    /// Requested target language
    pub target_language: String,
    /// Translated text
    pub translated_text: String,
}

/// Synthesized speech.
///
/// `data` is the provider's base64 payload, handed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AudioClip {
    /// Voice used
    pub voice: String,
    /// MIME type reported by the provider
    pub mime_type: String,
    /// Base64 audio data
    pub data: String,
}
