//! Gemini REST client.
//!
//! One `generate` call is one POST to `models/{model}:generateContent`.
//! Failures come back raw as [`GeminiError`]; the HTTP status and the API's
//! canonical status string are preserved so classification never has to guess
//! from message text when the server told us exactly what happened.

use super::dto::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use crate::IntelMetrics;
use async_trait::async_trait;
use augur_core::{GenerateRequest, GenerateResponse, InlineBlob, SourceCitation};
use augur_error::{GeminiError, GeminiErrorKind};
use augur_interface::IntelDriver;
use reqwest::Client;
use std::env;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Environment variable read by [`GeminiClient::from_env`].
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Public REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Model used for text and JSON requests.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Model used for speech synthesis.
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Client for the Gemini `generateContent` REST API.
///
/// The API key is resolved once at construction. A client without a key can
/// still be built; every call then fails with `MissingApiKey`, which lets a
/// service serve cached data while reporting the missing credential on misses.
///
/// # Example
///
/// ```no_run
/// use augur_core::GenerateRequest;
/// use augur_interface::IntelDriver;
/// use augur_models::GeminiClient;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GeminiClient::from_env();
/// let response = client.generate(&GenerateRequest::new("Hello")).await?;
/// println!("{:?}", response.text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    api_key_env: String,
    base_url: String,
    model: String,
    speech_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("speech_model", &self.speech_model)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: Some(api_key.into()).filter(|k: &String| !k.trim().is_empty()),
            api_key_env: GEMINI_API_KEY_ENV.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
        }
    }

    /// Create a client reading the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_env_var(GEMINI_API_KEY_ENV)
    }

    /// Create a client reading the key from the named variable.
    #[instrument]
    pub fn from_env_var(var: &str) -> Self {
        let api_key = env::var(var).ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(var, "API key not set; uncached requests will fail");
        }
        Self {
            api_key,
            api_key_env: var.to_string(),
            ..Self::new(String::new())
        }
    }

    /// Override the REST base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the text/JSON model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the speech model.
    pub fn with_speech_model(mut self, model: impl Into<String>) -> Self {
        self.speech_model = model.into();
        self
    }

    /// Use a preconfigured HTTP client (proxies, timeouts).
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model a request will be sent to.
    pub fn resolve_model<'a>(&'a self, req: &'a GenerateRequest) -> &'a str {
        match req.model() {
            Some(model) => model,
            None if req.wants_speech() => &self.speech_model,
            None => &self.model,
        }
    }

    /// Full endpoint URL for a model.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn generate_internal(
        &self,
        api_key: &str,
        model: &str,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, GeminiError> {
        let url = self.endpoint(model);
        let body = GenerateContentRequest::from(req);
        debug!(url = %url, grounding = req.grounding(), "Sending Gemini API request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeminiError::new(GeminiErrorKind::ApiRequest(e.to_string())))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GeminiError::new(GeminiErrorKind::ApiRequest(e.to_string())))?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GeminiError::new(GeminiErrorKind::Decode(e.to_string())))?;
        into_generate_response(parsed)
    }
}

#[async_trait]
impl IntelDriver for GeminiClient {
    #[instrument(skip(self, req), fields(model = tracing::field::Empty))]
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GeminiError::new(GeminiErrorKind::MissingApiKey(self.api_key_env.clone()))
        })?;
        let model = self.resolve_model(req);
        tracing::Span::current().record("model", model);

        let metrics = IntelMetrics::get();
        let start = Instant::now();
        let result = self.generate_internal(api_key, model, req).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(_) => metrics.record_request(self.provider_name(), model, elapsed),
            Err(e) => {
                let code = augur_error::classify(e).code();
                debug!(error = %e, code, "Gemini API call failed");
                metrics.record_error(self.provider_name(), model, code);
            }
        }
        result
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn credential_env(&self) -> Option<&str> {
        Some(&self.api_key_env)
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Convert a non-2xx body into a structured error.
///
/// The API's JSON envelope is preferred; anything else (proxies, HTML error
/// pages) keeps the HTTP status and a truncated body as the message.
///
/// # Examples
///
/// ```
/// use augur_error::GeminiErrorKind;
/// use augur_models::parse_error_body;
///
/// let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
/// let err = parse_error_body(429, body);
/// assert!(matches!(
///     err.kind,
///     GeminiErrorKind::HttpError { status_code: 429, status: Some(ref s), .. } if s == "RESOURCE_EXHAUSTED"
/// ));
/// ```
pub fn parse_error_body(status_code: u16, body: &str) -> GeminiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => GeminiError::new(GeminiErrorKind::HttpError {
            status_code,
            status: envelope.error.status,
            message: envelope.error.message,
        }),
        Err(_) => GeminiError::new(GeminiErrorKind::HttpError {
            status_code,
            status: None,
            message: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }),
    }
}

/// Flatten a wire response into the provider-neutral shape.
///
/// Blocked prompts and safety-terminated candidates become
/// [`GeminiErrorKind::Blocked`]; a response with no candidates at all becomes
/// [`GeminiErrorKind::EmptyResponse`]. A candidate with no text is not an
/// error here: the normalizer decides what missing text means.
pub fn into_generate_response(
    response: GenerateContentResponse,
) -> Result<GenerateResponse, GeminiError> {
    if let Some(reason) = response
        .prompt_feedback()
        .as_ref()
        .and_then(|f| f.block_reason().clone())
    {
        return Err(GeminiError::new(GeminiErrorKind::Blocked(format!(
            "prompt blocked: {reason}"
        ))));
    }

    let candidate = response.candidates().first().ok_or_else(|| {
        GeminiError::new(GeminiErrorKind::EmptyResponse(
            "no candidates returned".to_string(),
        ))
    })?;

    if let Some(reason) = candidate.finish_reason()
        && BLOCKING_FINISH_REASONS.contains(&reason.as_str())
    {
        return Err(GeminiError::new(GeminiErrorKind::Blocked(format!(
            "candidate finished with {reason}"
        ))));
    }

    let parts = candidate
        .content()
        .as_ref()
        .map(|c| c.parts().as_slice())
        .unwrap_or_default();

    let texts: Vec<&str> = parts.iter().filter_map(|p| p.text().as_deref()).collect();
    let text = (!texts.is_empty()).then(|| texts.concat());

    let audio = parts.iter().find_map(|p| {
        p.inline_data().as_ref().map(|d| InlineBlob {
            mime_type: d.mime_type().clone(),
            data: d.data().clone(),
        })
    });

    let mut citations: Vec<SourceCitation> = Vec::new();
    let chunks = candidate
        .grounding_metadata()
        .as_ref()
        .map(|g| g.grounding_chunks().as_slice())
        .unwrap_or_default();
    for web in chunks.iter().filter_map(|c| c.web().as_ref()) {
        let Some(uri) = web.uri().clone() else {
            continue;
        };
        if citations.iter().any(|c| c.uri == uri) {
            continue;
        }
        citations.push(SourceCitation {
            title: web.title().clone().unwrap_or_else(|| uri.clone()),
            uri,
        });
    }

    Ok(GenerateResponse {
        text,
        audio,
        citations,
        finish_reason: candidate.finish_reason().clone(),
    })
}
