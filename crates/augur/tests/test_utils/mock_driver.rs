//! Scripted driver for service tests.

use async_trait::async_trait;
use augur_core::{GenerateRequest, GenerateResponse, SourceCitation};
use augur_error::{GeminiError, GeminiErrorKind};
use augur_interface::IntelDriver;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with text
    Text(String),
    /// Succeed with text and grounding citations
    Grounded(String, Vec<SourceCitation>),
    /// Succeed with an inline audio payload
    Audio { mime_type: String, data: String },
    /// Fail with the given raw error
    Error(GeminiErrorKind),
    /// Never complete
    Hang,
}

impl MockResponse {
    /// Text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Structured HTTP failure as the API reports it.
    pub fn http(status_code: u16, status: &str) -> Self {
        Self::Error(GeminiErrorKind::HttpError {
            status_code,
            status: Some(status.to_string()),
            message: format!("mock {status_code}"),
        })
    }

    /// 429 RESOURCE_EXHAUSTED.
    pub fn rate_limited() -> Self {
        Self::http(429, "RESOURCE_EXHAUSTED")
    }
}

/// Driver that replays a script, then repeats a default reply.
///
/// Records the (virtual) start time and prompt of every call so tests can
/// check spacing and de-duplication.
pub struct MockDriver {
    script: Mutex<VecDeque<MockResponse>>,
    default: MockResponse,
    latency: Duration,
    credentials: AtomicBool,
    calls: Mutex<Vec<(Instant, String)>>,
}

impl MockDriver {
    /// Always reply with `default` unless a script is queued.
    pub fn new(default: MockResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            latency: Duration::from_millis(1),
            credentials: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always succeed with the given text.
    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new(MockResponse::text(text))
    }

    /// Replies consumed in order before falling back to the default.
    pub fn with_script(self, responses: Vec<MockResponse>) -> Self {
        *self.script.lock().unwrap() = responses.into();
        self
    }

    /// Simulated network latency per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Behave as if no API key were configured.
    pub fn without_credentials(self) -> Self {
        self.credentials.store(false, Ordering::SeqCst);
        self
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Start instants of every call, in call order.
    pub fn call_starts(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// Prompts of every call, in call order.
    #[allow(dead_code)]
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    fn next_response(&self) -> MockResponse {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl IntelDriver for MockDriver {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GeminiError> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), req.prompt().clone()));
        let response = self.next_response();

        tokio::time::sleep(self.latency).await;

        match response {
            MockResponse::Text(text) => Ok(GenerateResponse::text(text)),
            MockResponse::Grounded(text, citations) => {
                Ok(GenerateResponse::text(text).with_citations(citations))
            }
            MockResponse::Audio { mime_type, data } => Ok(GenerateResponse::audio(mime_type, data)),
            MockResponse::Error(kind) => Err(GeminiError::new(kind)),
            MockResponse::Hang => {
                std::future::pending::<()>().await;
                unreachable!("pending future never resolves")
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn credential_env(&self) -> Option<&str> {
        Some("MOCK_API_KEY")
    }

    fn has_credentials(&self) -> bool {
        self.credentials.load(Ordering::SeqCst)
    }
}
