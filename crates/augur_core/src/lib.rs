//! Core data types for the Augur intelligence client.
//!
//! This crate provides the foundation types shared by every Augur crate:
//! the provider-neutral request/response pair, the feature catalogue, the
//! intelligence data shapes handed back to dashboard widgets, and the response
//! normalizer that turns free-form model text into those shapes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod feature;
mod intel;
mod normalize;
mod request;
mod response;
mod telemetry;

pub use feature::Feature;
pub use intel::{
    AudioClip, Briefing, ForecastDay, SatelliteFeed, SatellitePass, SentimentHotspot,
    SentimentMap, Signal, SignalFeed, Translation, WeatherReport,
};
pub use normalize::{
    NormalizeFailure, NormalizeFailureReason, NormalizeHook, ResponseNormalizer,
    strip_code_fences,
};
pub use request::{GenerateRequest, ResponseFormat};
pub use response::{GenerateResponse, InlineBlob, SourceCitation};
pub use telemetry::{TelemetryFormat, init_telemetry};
