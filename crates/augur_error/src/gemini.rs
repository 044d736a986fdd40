//! Raw Gemini failures caught at the network boundary, and retry logic.

use crate::intel::classify_kind;

/// Gemini-specific error conditions.
///
/// These are unclassified: they describe what the transport observed, not what
/// a caller should do about it. [`classify`](crate::classify) turns them into an
/// [`IntelError`](crate::IntelError).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GeminiErrorKind {
    /// API key not found in environment
    #[display("{} environment variable not set", _0)]
    MissingApiKey(String),
    /// API request failed before a status code was available
    #[display("Gemini API request failed: {}", _0)]
    ApiRequest(String),
    /// HTTP error with status code, API status string and message
    #[display("HTTP {} error: {}", status_code, message)]
    HttpError {
        /// HTTP status code
        status_code: u16,
        /// API status string from the error body (e.g. `RESOURCE_EXHAUSTED`)
        status: Option<String>,
        /// Error message
        message: String,
    },
    /// Prompt or candidate was blocked by a content-safety filter
    #[display("Content blocked: {}", _0)]
    Blocked(String),
    /// Response carried no usable payload
    #[display("Empty response: {}", _0)]
    EmptyResponse(String),
    /// Attempt exceeded the per-request timeout
    #[display("Request timed out after {}ms", _0)]
    Timeout(u64),
    /// Response body could not be decoded
    #[display("Failed to decode response: {}", _0)]
    Decode(String),
}

impl GeminiErrorKind {
    /// Check if this error type should be retried.
    ///
    /// Only quota exhaustion is retried; authentication, safety and
    /// server-side failures cannot succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        classify_kind(self).is_retryable()
    }
}

/// Gemini error with source location tracking.
///
/// # Examples
///
/// ```
/// use augur_error::{GeminiError, GeminiErrorKind};
///
/// let err = GeminiError::new(GeminiErrorKind::MissingApiKey("GEMINI_API_KEY".into()));
/// assert!(format!("{}", err).contains("GEMINI_API_KEY"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Gemini Error: {} at line {} in {}", kind, line, file)]
pub struct GeminiError {
    /// The kind of error that occurred
    pub kind: GeminiErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GeminiError {
    /// Create a new GeminiError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GeminiErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an HTTP failure without an API status string.
    #[track_caller]
    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(GeminiErrorKind::HttpError {
            status_code,
            status: None,
            message: message.into(),
        })
    }
}

/// Trait for errors that support retry logic.
///
/// The retry wrapper only needs to know whether another attempt can succeed;
/// the schedule itself comes from the retry policy.
///
/// # Examples
///
/// ```
/// use augur_error::{GeminiError, RetryableError};
///
/// assert!(GeminiError::http(429, "Too Many Requests").is_retryable());
/// assert!(!GeminiError::http(503, "Service unavailable").is_retryable());
/// assert!(!GeminiError::http(403, "Forbidden").is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GeminiError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
