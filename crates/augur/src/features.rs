//! Per-feature entry points.
//!
//! Each method builds a cache key from its arguments, describes the request,
//! and shapes whatever the normalizer produced into a renderable value. None
//! of them talk to the network directly.

use crate::{IntelligenceService, schema, service::cache_key};
use augur_core::{
    AudioClip, Briefing, Feature, GenerateRequest, ResponseFormat, SatelliteFeed, SentimentMap,
    SignalFeed, Translation, WeatherReport,
};
use augur_error::{IntelError, IntelErrorKind, IntelResult};
use std::cmp::Ordering;
use tracing::instrument;

/// Voice used when the caller passes an empty voice name.
pub const DEFAULT_VOICE: &str = "Kore";

const UNKNOWN_THREAT_LEVEL: &str = "UNKNOWN";

fn json_request(prompt: String, system: &str, schema: serde_json::Value) -> GenerateRequest {
    GenerateRequest::new(prompt)
        .with_system_instruction(system)
        .with_response_format(ResponseFormat::Json {
            schema: Some(schema),
        })
}

fn grounded_request(prompt: String, system: &str) -> GenerateRequest {
    GenerateRequest::new(prompt)
        .with_system_instruction(system)
        .with_grounding(true)
}

impl IntelligenceService {
    /// Current conditions and forecast for a location, grounded on web search.
    #[instrument(skip(self))]
    pub async fn weather(&self, location: &str) -> IntelResult<WeatherReport> {
        let request = grounded_request(
            format!(
                "Report the current weather and a 3-day forecast for {location}. \
                 Answer with a single JSON object with keys location, temperature_c, \
                 feels_like_c, humidity_pct, wind_kph, condition, summary, alerts (array of \
                 strings) and forecast (array of objects with day, high_c, low_c, condition, \
                 precipitation_pct)."
            ),
            "You are a meteorological station. Use metric units.",
        );
        let fallback = WeatherReport {
            location: location.to_string(),
            condition: "Unavailable".to_string(),
            ..Default::default()
        };
        let location = location.to_string();

        self.fetch_structured(
            Feature::Weather,
            cache_key(Feature::Weather, &[location.as_str()]),
            request,
            fallback,
            move |mut report, response| {
                if report.location.trim().is_empty() {
                    report.location = location;
                }
                report.humidity_pct = report.humidity_pct.clamp(0.0, 100.0);
                report.sources = response.citations.clone();
                report
            },
        )
        .await
    }

    /// Public-sentiment heat map for a region.
    #[instrument(skip(self))]
    pub async fn sentiment_map(&self, region: &str) -> IntelResult<SentimentMap> {
        let request = json_request(
            format!(
                "Produce a public sentiment map for {region} with 5 to 8 hotspots. \
                 Scores range from -1 (hostile) to 1 (positive)."
            ),
            "You are a social-media sentiment analyst.",
            schema::sentiment_map(),
        );
        let fallback = SentimentMap {
            region: region.to_string(),
            dominant_mood: "Unknown".to_string(),
            ..Default::default()
        };
        let region = region.to_string();

        self.fetch_structured(
            Feature::Sentiment,
            cache_key(Feature::Sentiment, &[region.as_str()]),
            request,
            fallback,
            move |mut map, _| {
                if map.region.trim().is_empty() {
                    map.region = region;
                }
                map.overall_score = clamp_score(map.overall_score);
                for hotspot in &mut map.hotspots {
                    hotspot.score = clamp_score(hotspot.score);
                }
                map
            },
        )
        .await
    }

    /// Trending signals for a topic, strongest first.
    #[instrument(skip(self))]
    pub async fn trending_signals(&self, topic: &str) -> IntelResult<SignalFeed> {
        let request = json_request(
            format!(
                "List 6 to 10 trending signals about {topic}. Intensity ranges from 0 to 100; \
                 velocity is the signed rate of change."
            ),
            "You are a signals-intelligence ticker.",
            schema::signal_feed(),
        );
        let fallback = SignalFeed {
            topic: topic.to_string(),
            signals: Vec::new(),
        };
        let topic = topic.to_string();

        self.fetch_structured(
            Feature::Signals,
            cache_key(Feature::Signals, &[topic.as_str()]),
            request,
            fallback,
            move |mut feed, _| {
                if feed.topic.trim().is_empty() {
                    feed.topic = topic;
                }
                for signal in &mut feed.signals {
                    signal.intensity = if signal.intensity.is_finite() {
                        signal.intensity.clamp(0.0, 100.0)
                    } else {
                        0.0
                    };
                }
                feed.signals.sort_by(|a, b| {
                    b.intensity
                        .partial_cmp(&a.intensity)
                        .unwrap_or(Ordering::Equal)
                });
                for (n, signal) in feed.signals.iter_mut().enumerate() {
                    if signal.id.trim().is_empty() {
                        signal.id = format!("sig-{}", n + 1);
                    }
                }
                feed
            },
        )
        .await
    }

    /// Satellites over a sector and any flagged anomalies.
    #[instrument(skip(self))]
    pub async fn satellite_feed(&self, sector: &str) -> IntelResult<SatelliteFeed> {
        let request = json_request(
            format!(
                "Describe the satellites currently passing over sector {sector} and flag \
                 anomalies. Use realistic orbit classes (LEO, MEO, GEO)."
            ),
            "You are an orbital surveillance console.",
            schema::satellite_feed(),
        );
        let fallback = SatelliteFeed {
            sector: sector.to_string(),
            ..Default::default()
        };
        let sector = sector.to_string();

        self.fetch_structured(
            Feature::Satellite,
            cache_key(Feature::Satellite, &[sector.as_str()]),
            request,
            fallback,
            move |mut feed, _| {
                if feed.sector.trim().is_empty() {
                    feed.sector = sector;
                }
                feed
            },
        )
        .await
    }

    /// Search-grounded situation briefing with source citations.
    #[instrument(skip(self))]
    pub async fn intel_briefing(&self, query: &str) -> IntelResult<Briefing> {
        let request = grounded_request(
            format!(
                "Brief me on: {query}. Answer with a single JSON object with keys summary, \
                 key_points (array of strings) and threat_level (LOW, ELEVATED, HIGH or \
                 CRITICAL)."
            ),
            "You are an intelligence analyst. Be concise and cite current sources.",
        );
        let fallback = Briefing {
            query: query.to_string(),
            threat_level: UNKNOWN_THREAT_LEVEL.to_string(),
            ..Default::default()
        };
        let query = query.to_string();

        self.fetch_structured(
            Feature::Briefing,
            cache_key(Feature::Briefing, &[query.as_str()]),
            request,
            fallback,
            move |mut briefing, response| {
                briefing.query = query;
                if briefing.threat_level.trim().is_empty() {
                    briefing.threat_level = UNKNOWN_THREAT_LEVEL.to_string();
                }
                briefing.sources = response.citations.clone();
                briefing
            },
        )
        .await
    }

    /// Translate text into `target_language`.
    ///
    /// Unparseable answers fall back to the untranslated text. Empty input is
    /// answered locally.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn translate(&self, text: &str, target_language: &str) -> IntelResult<Translation> {
        let fallback = Translation {
            source_text: text.to_string(),
            detected_language: String::new(),
            target_language: target_language.to_string(),
            translated_text: text.to_string(),
        };
        if text.trim().is_empty() {
            return Ok(fallback);
        }

        let request = json_request(
            format!("Translate the following text into {target_language}:\n\n{text}"),
            "You are a professional translator. Preserve meaning and tone.",
            schema::translation(),
        );
        let source_text = text.to_string();
        let target = target_language.to_string();

        self.fetch_structured(
            Feature::Translation,
            cache_key(Feature::Translation, &[target_language, text]),
            request,
            fallback,
            move |mut translation, _| {
                translation.source_text = source_text.clone();
                translation.target_language = target;
                if translation.translated_text.trim().is_empty() {
                    translation.translated_text = source_text;
                }
                translation
            },
        )
        .await
    }

    /// Synthesize speech. The audio payload is returned exactly as received.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` when the provider answers without audio.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn synthesize_speech(&self, text: &str, voice: &str) -> IntelResult<AudioClip> {
        let voice = if voice.trim().is_empty() {
            DEFAULT_VOICE.to_string()
        } else {
            voice.to_string()
        };
        let request = GenerateRequest::new(text).with_response_format(ResponseFormat::Speech {
            voice: voice.clone(),
        });

        self.fetch(
            Feature::Speech,
            cache_key(Feature::Speech, &[voice.as_str(), text]),
            request,
            AudioClip::default(),
            move |response| match response.audio {
                Some(blob) if !blob.data.is_empty() => Ok(AudioClip {
                    voice,
                    mime_type: blob.mime_type,
                    data: blob.data,
                }),
                _ => Err(IntelError::new(
                    IntelErrorKind::UpstreamUnavailable,
                    "speech response contained no audio",
                )),
            },
        )
        .await
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
