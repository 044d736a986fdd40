//! End-to-end behaviour of the intelligence service over a scripted driver.
//!
//! All tests run on paused time, so throttle spacing and backoff are exact and
//! instantaneous.

mod test_utils;

use augur::{AugurConfig, ClientConfig, Feature, FeatureConfig, IntelErrorKind, SourceCitation};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use test_utils::{MockDriver, MockResponse, service, service_with};

const MIN_DELAY: Duration = Duration::from_millis(4500);

const WEATHER_JSON: &str = r#"{"location": "Tokyo, JP", "temperature_c": 18.5, "condition": "Clear", "humidity_pct": 140}"#;
const SIGNALS_JSON: &str = r#"{"signals": [
    {"headline": "a", "intensity": 10},
    {"id": "x", "headline": "b", "intensity": 90},
    {"headline": "c", "intensity": 50}
]}"#;

fn assert_spaced(starts: &[tokio::time::Instant]) {
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= MIN_DELAY, "calls only {gap:?} apart");
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_requests_share_one_call() -> anyhow::Result<()> {
    let driver = Arc::new(
        MockDriver::new_success(WEATHER_JSON).with_latency(Duration::from_millis(200)),
    );
    let service = service(&driver);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.weather("Tokyo").await })
        })
        .collect();

    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await??);
    }

    assert_eq!(driver.call_count(), 1);
    assert!(reports.iter().all(|r| r == &reports[0]));
    assert_eq!(reports[0].location, "Tokyo, JP");
    assert_eq!(reports[0].humidity_pct, 100.0);

    // Same key after normalization, served from cache.
    let again = service.weather("  TOKYO ").await?;
    assert_eq!(again, reports[0]);
    assert_eq!(driver.call_count(), 1);
    assert_eq!(service.cache_stats().joined() + service.cache_stats().hits(), 10);
    Ok(())
}

#[test]
fn test_builder_without_driver_is_configuration_missing() {
    let Err(err) = augur::IntelligenceService::builder()
        .config(AugurConfig::default())
        .build()
    else {
        panic!("service built without a driver");
    };
    assert_eq!(err.code(), "CONFIGURATION_MISSING");
    assert!(err.to_string().contains("Missing required field: driver"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_degrades_to_fallback_and_notifies_hook() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success("I'm sorry, I can't map that region."));
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);

    let service = augur::IntelligenceService::builder()
        .shared_driver(driver.clone())
        .normalizer_hook(move |failure| {
            assert!(failure.excerpt.starts_with("I'm sorry"));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()?;

    let map = service.sentiment_map("Europe").await?;
    assert_eq!(map.region, "Europe");
    assert_eq!(map.dominant_mood, "Unknown");
    assert!(map.hotspots.is_empty());
    assert_eq!(failures.load(Ordering::SeqCst), 1);

    // Degraded results are still cached.
    service.sentiment_map("Europe").await?;
    assert_eq!(driver.call_count(), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_fenced_json_is_parsed_and_scores_clamped() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success(
        "```json\n{\"overall_score\": 1.7, \"dominant_mood\": \"Elated\", \
         \"hotspots\": [{\"name\": \"Oslo\", \"score\": -3.0, \"volume\": 12}]}\n```",
    ));
    let service = service(&driver);

    let map = service.sentiment_map("Nordics").await?;
    assert_eq!(map.region, "Nordics");
    assert_eq!(map.dominant_mood, "Elated");
    assert_eq!(map.overall_score, 1.0);
    assert_eq!(map.hotspots[0].score, -1.0);
    assert_eq!(map.hotspots[0].volume, 12);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_twice_then_success() -> anyhow::Result<()> {
    let driver = Arc::new(
        MockDriver::new_success(SIGNALS_JSON)
            .with_script(vec![MockResponse::rate_limited(), MockResponse::rate_limited()]),
    );
    let service = service(&driver);

    let feed = service.trending_signals("shipping").await?;

    assert_eq!(driver.call_count(), 3);
    assert_spaced(&driver.call_starts());
    assert_eq!(feed.signals.len(), 3);
    assert_eq!(*service.cache_stats().misses(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_follows_feature() {
    let driver = Arc::new(MockDriver::new(MockResponse::rate_limited()));
    let service = service(&driver);

    let err = service.trending_signals("ports").await.unwrap_err();

    assert_eq!(err.kind, IntelErrorKind::RateLimited);
    assert_eq!(err.code(), "RATE_LIMITED");
    assert_eq!(
        driver.call_count(),
        Feature::Signals.default_max_retries() + 1
    );
    assert_spaced(&driver.call_starts());
}

#[tokio::test(start_paused = true)]
async fn test_auth_denied_is_not_retried_or_cached() -> anyhow::Result<()> {
    let driver = Arc::new(
        MockDriver::new_success(WEATHER_JSON)
            .with_script(vec![MockResponse::http(403, "PERMISSION_DENIED")]),
    );
    let service = service(&driver);

    let err = service.weather("Tokyo").await.unwrap_err();
    assert_eq!(err.kind, IntelErrorKind::AuthDenied);
    assert_eq!(err.code(), "AUTH_DENIED");
    assert_eq!(driver.call_count(), 1);

    let report = service.weather("Tokyo").await?;
    assert_eq!(report.condition, "Clear");
    assert_eq!(driver.call_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_error_surfaces_immediately() {
    let driver = Arc::new(MockDriver::new(MockResponse::http(503, "UNAVAILABLE")));
    let service = service(&driver);

    let err = service.satellite_feed("7G").await.unwrap_err();
    assert_eq!(err.kind, IntelErrorKind::UpstreamUnavailable);
    assert_eq!(driver.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_credentials_fail_before_any_call() {
    let driver = Arc::new(MockDriver::new_success(WEATHER_JSON).without_credentials());
    let service = service(&driver);

    let err = service.weather("Tokyo").await.unwrap_err();

    assert_eq!(err.kind, IntelErrorKind::ConfigurationMissing);
    assert_eq!(err.code(), "CONFIGURATION_MISSING");
    assert_eq!(driver.call_count(), 0);
    assert_eq!(service.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_content_is_rejected() {
    let driver = Arc::new(MockDriver::new(MockResponse::Error(
        augur_error::GeminiErrorKind::Blocked("prompt blocked: SAFETY".into()),
    )));
    let service = service(&driver);

    let err = service.intel_briefing("something unsavoury").await.unwrap_err();
    assert_eq!(err.kind, IntelErrorKind::ContentRejected);
    assert_eq!(driver.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_times_out_as_upstream_unavailable() {
    let driver = Arc::new(MockDriver::new(MockResponse::Hang));
    let config =
        AugurConfig::default().with_client(ClientConfig::default().with_request_timeout_secs(2u64));
    let service = service_with(&driver, config);

    let start = tokio::time::Instant::now();
    let err = service.satellite_feed("north").await.unwrap_err();

    assert_eq!(err.kind, IntelErrorKind::UpstreamUnavailable);
    assert_eq!(driver.call_count(), 1);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(*service.cache_stats().misses(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_feature_ttl_expiry() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success(SIGNALS_JSON));
    let service = service(&driver);

    service.trending_signals("energy").await?;
    tokio::time::advance(Duration::from_secs(59)).await;
    service.trending_signals("energy").await?;
    assert_eq!(driver.call_count(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    service.trending_signals("energy").await?;
    assert_eq!(driver.call_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_feature_ttl_override() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success(SIGNALS_JSON));
    let config = AugurConfig::default()
        .with_feature(Feature::Signals, FeatureConfig::default().with_ttl_secs(5u64));
    let service = service_with(&driver, config);

    service.trending_signals("energy").await?;
    tokio::time::advance(Duration::from_secs(6)).await;
    service.trending_signals("energy").await?;
    assert_eq!(driver.call_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_features_share_one_throttle() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success("{}"));
    let service = service(&driver);

    let (weather, sentiment, satellite) = tokio::join!(
        service.weather("Lima"),
        service.sentiment_map("Andes"),
        service.satellite_feed("S-4"),
    );
    weather?;
    sentiment?;
    satellite?;

    assert_eq!(driver.call_count(), 3);
    assert_spaced(&driver.call_starts());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_signals_sorted_and_identified() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success(SIGNALS_JSON));
    let service = service(&driver);

    let feed = service.trending_signals("shipping").await?;

    assert_eq!(feed.topic, "shipping");
    let order: Vec<_> = feed.signals.iter().map(|s| s.headline.as_str()).collect();
    assert_eq!(order, vec!["b", "c", "a"]);
    let ids: Vec<_> = feed.signals.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["x", "sig-2", "sig-3"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_grounded_results_carry_citations() -> anyhow::Result<()> {
    let citations = vec![
        SourceCitation {
            title: "Port authority".into(),
            uri: "https://port.example/notice".into(),
        },
        SourceCitation {
            title: "Wire".into(),
            uri: "https://wire.example/story".into(),
        },
    ];
    let driver = Arc::new(MockDriver::new(MockResponse::Grounded(
        "```json\n{\"summary\": \"Calm\", \"key_points\": [\"No closures\"]}\n```".into(),
        citations.clone(),
    )));
    let service = service(&driver);

    let briefing = service.intel_briefing("Rotterdam port status").await?;
    assert_eq!(briefing.query, "Rotterdam port status");
    assert_eq!(briefing.summary, "Calm");
    assert_eq!(briefing.threat_level, "UNKNOWN");
    assert_eq!(briefing.sources, citations);

    let weather = service.weather("Rotterdam").await?;
    assert_eq!(weather.location, "Rotterdam");
    assert_eq!(weather.sources, citations);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_translation() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success(
        r#"{"detected_language": "es", "translated_text": "Good morning"}"#,
    ));
    let service = service(&driver);

    let translation = service.translate("Buenos días", "English").await?;
    assert_eq!(translation.source_text, "Buenos días");
    assert_eq!(translation.detected_language, "es");
    assert_eq!(translation.target_language, "English");
    assert_eq!(translation.translated_text, "Good morning");

    let empty = service.translate("   ", "English").await?;
    assert_eq!(empty.translated_text, "   ");
    assert_eq!(driver.call_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_translation_keeps_source_text() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success("Good morning"));
    let service = service(&driver);

    let translation = service.translate("Buenos días", "English").await?;
    assert_eq!(translation.translated_text, "Buenos días");
    assert_eq!(translation.target_language, "English");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_translation_cache_respects_text_case() -> anyhow::Result<()> {
    // Unparseable answers echo the source text, so each result shows which call produced it.
    let driver = Arc::new(MockDriver::new_success("no json here"));
    let service = service(&driver);

    let upper = service.translate("Apple", "French").await?;
    let lower = service.translate("apple", "French").await?;
    assert_eq!(upper.translated_text, "Apple");
    assert_eq!(lower.source_text, "apple");
    assert_eq!(lower.translated_text, "apple");
    assert_eq!(driver.call_count(), 2);

    // The language still folds case and whitespace.
    let again = service.translate("Apple", " french ").await?;
    assert_eq!(again.translated_text, "Apple");
    assert_eq!(driver.call_count(), 2);

    assert!(service.invalidate(Feature::Translation, &["French", "apple"]));
    assert!(!service.invalidate(Feature::Translation, &["French", "apple"]));
    assert!(service.invalidate(Feature::Translation, &["French", "Apple"]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_speech_cache_respects_text_case() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new(MockResponse::Audio {
        mime_type: "audio/L16;rate=24000".into(),
        data: "AAECA/8=".into(),
    }));
    let service = service(&driver);

    service.synthesize_speech("US", "").await?;
    service.synthesize_speech("us", "").await?;
    assert_eq!(driver.call_count(), 2);

    service.synthesize_speech("US", "kore").await?;
    assert_eq!(driver.call_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_speech_audio_returned_unchanged() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new(MockResponse::Audio {
        mime_type: "audio/L16;rate=24000".into(),
        data: "AAECA/8=".into(),
    }));
    let service = service(&driver);

    let clip = service.synthesize_speech("Status nominal", "").await?;
    assert_eq!(clip.voice, augur::DEFAULT_VOICE);
    assert_eq!(clip.mime_type, "audio/L16;rate=24000");
    assert_eq!(clip.data, "AAECA/8=");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_speech_without_audio_is_upstream_unavailable() {
    let driver = Arc::new(MockDriver::new_success(""));
    let service = service(&driver);

    let err = service
        .synthesize_speech("Status nominal", "Puck")
        .await
        .unwrap_err();
    assert_eq!(err.kind, IntelErrorKind::UpstreamUnavailable);

    // Not cached: the next call goes upstream again.
    assert!(service.synthesize_speech("Status nominal", "Puck").await.is_err());
    assert_eq!(driver.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_refresh() -> anyhow::Result<()> {
    let driver = Arc::new(MockDriver::new_success(WEATHER_JSON));
    let service = service(&driver);

    service.weather("Tokyo").await?;
    assert!(service.invalidate(Feature::Weather, &["tokyo"]));
    assert!(!service.invalidate(Feature::Weather, &["tokyo"]));

    service.weather("Tokyo").await?;
    assert_eq!(driver.call_count(), 2);

    service.clear_cache();
    service.weather("Tokyo").await?;
    assert_eq!(driver.call_count(), 3);
    Ok(())
}
