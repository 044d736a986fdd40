//! Tests for Gemini request building and response parsing.

use augur_core::{GenerateRequest, ResponseFormat};
use augur_error::{GeminiErrorKind, IntelErrorKind, classify};
use augur_interface::IntelDriver;
use augur_models::{
    GeminiClient, GenerateContentRequest, GenerateContentResponse, into_generate_response,
    parse_error_body,
};
use base64::Engine;
use serde_json::{Value, json};

fn wire(req: &GenerateRequest) -> Value {
    serde_json::to_value(GenerateContentRequest::from(req)).unwrap()
}

fn response(body: Value) -> GenerateContentResponse {
    serde_json::from_value(body).unwrap()
}

#[test]
fn test_plain_text_request_is_minimal() {
    let body = wire(&GenerateRequest::new("ping"));
    assert_eq!(
        body,
        json!({"contents": [{"role": "user", "parts": [{"text": "ping"}]}]})
    );
}

#[test]
fn test_text_turns_read_back_through_getters() {
    let req = GenerateRequest::new("ping").with_system_instruction("Be brief.");
    let wire = GenerateContentRequest::from(&req);

    let user = &wire.contents()[0];
    assert_eq!(user.role().as_deref(), Some("user"));
    assert_eq!(user.parts()[0].text().as_deref(), Some("ping"));
    assert!(user.parts()[0].inline_data().is_none());

    let system = wire.system_instruction().as_ref().unwrap();
    assert!(system.role().is_none());
    assert_eq!(system.parts()[0].text().as_deref(), Some("Be brief."));
}

#[test]
fn test_json_request_carries_schema_and_system_instruction() {
    let schema = json!({"type": "OBJECT", "properties": {"temperature_c": {"type": "NUMBER"}}});
    let req = GenerateRequest::new("Weather in Lima")
        .with_system_instruction("You are a weather station.")
        .with_response_format(ResponseFormat::Json {
            schema: Some(schema.clone()),
        })
        .with_temperature(0.2);

    let body = wire(&req);
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a weather station.");
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["responseSchema"], schema);
    assert!(body.get("tools").is_none());
}

#[test]
fn test_speech_request_sets_audio_modality_and_voice() {
    let req = GenerateRequest::new("Say hello").with_response_format(ResponseFormat::Speech {
        voice: "Kore".to_string(),
    });

    let body = wire(&req);
    assert_eq!(body["generationConfig"]["responseModalities"], json!(["AUDIO"]));
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
}

#[test]
fn test_grounded_request_declares_search_tool() {
    let body = wire(&GenerateRequest::new("Port activity").with_grounding(true));
    assert_eq!(body["tools"], json!([{"googleSearch": {}}]));
}

#[test]
fn test_text_parts_are_concatenated() {
    let parsed = into_generate_response(response(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
            "finishReason": "STOP"
        }]
    })))
    .unwrap();

    assert_eq!(parsed.text.as_deref(), Some("{\"a\": 1}"));
    assert_eq!(parsed.finish_reason.as_deref(), Some("STOP"));
    assert!(parsed.audio.is_none());
}

#[test]
fn test_inline_audio_is_passed_through_unchanged() {
    let data = base64::engine::general_purpose::STANDARD.encode([0u8, 1, 2, 3, 255]);
    let parsed = into_generate_response(response(json!({
        "candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "audio/L16;rate=24000", "data": data}}]}
        }]
    })))
    .unwrap();

    let audio = parsed.audio.unwrap();
    assert_eq!(audio.mime_type, "audio/L16;rate=24000");
    assert_eq!(audio.data, data);
    assert!(parsed.text.is_none());
}

#[test]
fn test_grounding_citations_deduplicated_by_uri() {
    let parsed = into_generate_response(response(json!({
        "candidates": [{
            "content": {"parts": [{"text": "summary"}]},
            "groundingMetadata": {"groundingChunks": [
                {"web": {"uri": "https://a.example", "title": "A"}},
                {"web": {"uri": "https://a.example", "title": "A again"}},
                {"web": {"uri": "https://b.example"}},
                {}
            ]}
        }]
    })))
    .unwrap();

    let uris: Vec<_> = parsed.citations.iter().map(|c| c.uri.as_str()).collect();
    assert_eq!(uris, vec!["https://a.example", "https://b.example"]);
    assert_eq!(parsed.citations[0].title, "A");
    assert_eq!(parsed.citations[1].title, "https://b.example");
}

#[test]
fn test_blocked_prompt_is_content_rejected() {
    let err = into_generate_response(response(json!({
        "promptFeedback": {"blockReason": "SAFETY"}
    })))
    .unwrap_err();

    assert!(matches!(err.kind, GeminiErrorKind::Blocked(_)));
    assert_eq!(classify(&err).kind, IntelErrorKind::ContentRejected);
}

#[test]
fn test_safety_finish_reason_is_content_rejected() {
    let err = into_generate_response(response(json!({
        "candidates": [{"finishReason": "PROHIBITED_CONTENT"}]
    })))
    .unwrap_err();

    assert_eq!(classify(&err).kind, IntelErrorKind::ContentRejected);
}

#[test]
fn test_no_candidates_is_upstream_unavailable() {
    let err = into_generate_response(response(json!({}))).unwrap_err();
    assert!(matches!(err.kind, GeminiErrorKind::EmptyResponse(_)));
    assert_eq!(classify(&err).kind, IntelErrorKind::UpstreamUnavailable);
}

#[test]
fn test_error_envelope_keeps_structured_status() {
    let err = parse_error_body(
        429,
        r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#,
    );
    assert_eq!(classify(&err).kind, IntelErrorKind::RateLimited);

    let err = parse_error_body(
        403,
        r#"{"error": {"code": 403, "message": "Method doesn't allow unregistered callers", "status": "PERMISSION_DENIED"}}"#,
    );
    assert_eq!(classify(&err).kind, IntelErrorKind::AuthDenied);
}

#[test]
fn test_non_json_error_body_keeps_status_code() {
    let err = parse_error_body(502, "<html>Bad Gateway</html>");
    match &err.kind {
        GeminiErrorKind::HttpError {
            status_code,
            status,
            message,
        } => {
            assert_eq!(*status_code, 502);
            assert!(status.is_none());
            assert_eq!(message, "<html>Bad Gateway</html>");
        }
        other => panic!("unexpected kind: {other:?}"),
    }
    assert_eq!(classify(&err).kind, IntelErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_missing_key_fails_without_network() {
    let client = GeminiClient::new("").with_base_url("http://127.0.0.1:9");
    assert!(!client.has_credentials());

    let err = client.generate(&GenerateRequest::new("ping")).await.unwrap_err();
    assert!(matches!(err.kind, GeminiErrorKind::MissingApiKey(ref var) if var == "GEMINI_API_KEY"));
    assert_eq!(classify(&err).kind, IntelErrorKind::ConfigurationMissing);
}

#[test]
fn test_model_resolution() {
    let client = GeminiClient::new("key").with_model("text-model").with_speech_model("tts-model");

    let text = GenerateRequest::new("hi");
    let speech = GenerateRequest::new("hi").with_response_format(ResponseFormat::Speech {
        voice: "Puck".to_string(),
    });
    let pinned = GenerateRequest::new("hi").with_model("pinned");

    assert_eq!(client.resolve_model(&text), "text-model");
    assert_eq!(client.resolve_model(&speech), "tts-model");
    assert_eq!(client.resolve_model(&pinned), "pinned");
    assert_eq!(
        client.endpoint("text-model"),
        "https://generativelanguage.googleapis.com/v1beta/models/text-model:generateContent"
    );
}

#[test]
fn test_debug_redacts_key() {
    let client = GeminiClient::new("super-secret");
    let debug = format!("{client:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("<redacted>"));
}
