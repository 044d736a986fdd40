//! Top-level error wrapper types.

use crate::{
    BuilderError, ConfigError, GeminiError, HttpError, IntelError, IntelErrorKind, classify,
};

/// Every failure the Augur workspace can produce.
///
/// # Examples
///
/// ```
/// use augur_error::{AugurError, ConfigError};
///
/// let err: AugurError = ConfigError::new("bad toml").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum AugurErrorKind {
    /// HTTP client error
    #[from(HttpError)]
    Http(HttpError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Raw Gemini failure
    #[from(GeminiError)]
    Gemini(GeminiError),
    /// Classified intelligence failure
    #[from(IntelError)]
    Intel(IntelError),
}

/// Augur error with kind discrimination.
///
/// # Examples
///
/// ```
/// use augur_error::{AugurResult, ConfigError};
///
/// fn might_fail() -> AugurResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert_eq!(might_fail().unwrap_err().code(), "CONFIGURATION_MISSING");
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Augur Error: {}", _0)]
pub struct AugurError(Box<AugurErrorKind>);

impl AugurError {
    /// Create a new error from a kind.
    pub fn new(kind: AugurErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &AugurErrorKind {
        &self.0
    }

    /// Stable machine code drawn from the intelligence taxonomy.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            AugurErrorKind::Intel(err) => err.code(),
            AugurErrorKind::Gemini(err) => classify(err).code(),
            AugurErrorKind::Config(_) | AugurErrorKind::Builder(_) => {
                IntelErrorKind::ConfigurationMissing.code()
            }
            AugurErrorKind::Http(_) => IntelErrorKind::Unknown.code(),
        }
    }
}

// Generic From implementation for any type that converts to AugurErrorKind
impl<T> From<T> for AugurError
where
    T: Into<AugurErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Augur operations.
pub type AugurResult<T> = std::result::Result<T, AugurError>;
