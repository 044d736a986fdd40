//! Trait definitions for generative backends.

use async_trait::async_trait;
use augur_core::{GenerateRequest, GenerateResponse};
use augur_error::{GeminiError, GeminiErrorKind};

/// A generative backend the intelligence service can dispatch to.
///
/// Implementations perform exactly one network call per [`generate`] and
/// report failures raw; classification, retry, throttling and caching all
/// happen above this trait.
///
/// [`generate`]: IntelDriver::generate
#[async_trait]
pub trait IntelDriver: Send + Sync {
    /// Perform one generation call.
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GeminiError>;

    /// Provider name (e.g. "gemini").
    fn provider_name(&self) -> &'static str;

    /// Default model identifier.
    fn model_name(&self) -> &str;

    /// Name of the environment variable holding the credential, if any.
    fn credential_env(&self) -> Option<&str> {
        None
    }

    /// Whether a credential is available for the next call.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Fail fast when no credential is configured.
    ///
    /// Called before the first attempt of every uncached request, so a
    /// missing key never costs a queue slot or a retry.
    fn ensure_credentials(&self) -> Result<(), GeminiError> {
        if self.has_credentials() {
            Ok(())
        } else {
            Err(GeminiError::new(GeminiErrorKind::MissingApiKey(
                self.credential_env().unwrap_or("API key").to_string(),
            )))
        }
    }
}
