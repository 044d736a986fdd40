//! Classified failures surfaced to callers of the intelligence service.

use crate::{GeminiError, GeminiErrorKind, RetryableError};

/// Closed set of failure classes a caller can react to.
///
/// Each kind maps to a stable machine code (see [`IntelErrorKind::code`]) that UI
/// code can key its operator-facing message off.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IntelErrorKind {
    /// Upstream quota exhausted (HTTP 429 / `RESOURCE_EXHAUSTED`)
    #[display("Upstream rate limit exhausted")]
    RateLimited,
    /// Credential rejected (HTTP 401 / 403)
    #[display("Access denied by upstream")]
    AuthDenied,
    /// Upstream failed server-side, timed out or returned nothing usable
    #[display("Upstream service unavailable")]
    UpstreamUnavailable,
    /// Prompt or response blocked by a content-safety filter
    #[display("Content redacted by safety filter")]
    ContentRejected,
    /// API credential absent from the environment
    #[display("API credential not configured")]
    ConfigurationMissing,
    /// Anything that fits no other class
    #[display("Unknown upstream failure")]
    Unknown,
}

impl IntelErrorKind {
    /// Stable machine code for this kind, e.g. `RATE_LIMITED`.
    ///
    /// # Examples
    ///
    /// ```
    /// use augur_error::IntelErrorKind;
    ///
    /// assert_eq!(IntelErrorKind::AuthDenied.code(), "AUTH_DENIED");
    /// assert_eq!(IntelErrorKind::ConfigurationMissing.code(), "CONFIGURATION_MISSING");
    /// ```
    pub fn code(&self) -> &'static str {
        self.into()
    }

    /// Only quota exhaustion is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IntelErrorKind::RateLimited)
    }
}

/// Classified error with source location tracking.
///
/// `message` is the short operator-facing text; `detail` keeps the raw upstream
/// description for logs.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("[{}] {}: {}", kind.code(), message, detail)]
pub struct IntelError {
    /// The class of failure
    pub kind: IntelErrorKind,
    /// Human-readable message
    pub message: String,
    /// Raw upstream description
    pub detail: String,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl IntelError {
    /// Create a new IntelError with the kind's default message.
    #[track_caller]
    pub fn new(kind: IntelErrorKind, detail: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            message: kind.to_string(),
            detail: detail.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Replace the operator-facing message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Stable machine code, e.g. `RATE_LIMITED`.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the error kind.
    pub fn kind(&self) -> IntelErrorKind {
        self.kind
    }
}

impl RetryableError for IntelError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<&GeminiError> for IntelError {
    #[track_caller]
    fn from(err: &GeminiError) -> Self {
        classify(err)
    }
}

impl From<GeminiError> for IntelError {
    #[track_caller]
    fn from(err: GeminiError) -> Self {
        classify(&err)
    }
}

/// Result type for classified intelligence operations.
pub type IntelResult<T> = std::result::Result<T, IntelError>;

/// Classify a raw network-boundary failure.
///
/// Structured fields (HTTP status, API status string) decide first; the message
/// text is only consulted when the structure says nothing useful.
///
/// # Examples
///
/// ```
/// use augur_error::{classify, GeminiError, GeminiErrorKind, IntelErrorKind};
///
/// let forbidden = classify(&GeminiError::http(403, "API key not valid"));
/// assert_eq!(forbidden.kind, IntelErrorKind::AuthDenied);
///
/// let quota = classify(&GeminiError::new(GeminiErrorKind::ApiRequest(
///     "RESOURCE_EXHAUSTED: quota exceeded".to_string(),
/// )));
/// assert_eq!(quota.kind, IntelErrorKind::RateLimited);
/// ```
#[track_caller]
pub fn classify(err: &GeminiError) -> IntelError {
    IntelError::new(classify_kind(&err.kind), err.kind.to_string())
}

pub(crate) fn classify_kind(kind: &GeminiErrorKind) -> IntelErrorKind {
    match kind {
        GeminiErrorKind::MissingApiKey(_) => IntelErrorKind::ConfigurationMissing,
        GeminiErrorKind::HttpError {
            status_code,
            status,
            message,
        } => classify_status(*status_code, status.as_deref())
            .unwrap_or_else(|| classify_message(message)),
        GeminiErrorKind::Blocked(_) => IntelErrorKind::ContentRejected,
        GeminiErrorKind::EmptyResponse(_) | GeminiErrorKind::Timeout(_) => {
            IntelErrorKind::UpstreamUnavailable
        }
        GeminiErrorKind::ApiRequest(message) => classify_message(message),
        GeminiErrorKind::Decode(_) => IntelErrorKind::Unknown,
    }
}

fn classify_status(status_code: u16, status: Option<&str>) -> Option<IntelErrorKind> {
    match (status_code, status) {
        (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => Some(IntelErrorKind::RateLimited),
        (401 | 403, _) | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
            Some(IntelErrorKind::AuthDenied)
        }
        (500..=599, _) => Some(IntelErrorKind::UpstreamUnavailable),
        _ => None,
    }
}

/// Classify a free-text failure description.
///
/// Used only where no structured status exists, which in practice means error
/// strings surfaced by the HTTP stack itself.
pub fn classify_message(message: &str) -> IntelErrorKind {
    let upper = message.to_uppercase();
    let has = |needle: &str| upper.contains(needle);

    if has("429") || has("RESOURCE_EXHAUSTED") || has("RESOURCE EXHAUSTED") {
        IntelErrorKind::RateLimited
    } else if has("401")
        || has("403")
        || has("PERMISSION_DENIED")
        || has("UNAUTHENTICATED")
        || has("API KEY NOT VALID")
    {
        IntelErrorKind::AuthDenied
    } else if has("SAFETY") || has("BLOCKED") || has("PROHIBITED_CONTENT") {
        IntelErrorKind::ContentRejected
    } else if has("500")
        || has("502")
        || has("503")
        || has("504")
        || has("UNAVAILABLE")
        || has("OVERLOADED")
    {
        IntelErrorKind::UpstreamUnavailable
    } else {
        IntelErrorKind::Unknown
    }
}
