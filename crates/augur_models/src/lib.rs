//! Generative API drivers for the Augur intelligence client.
//!
//! A driver implements [`augur_interface::IntelDriver`]: one request in, one
//! network call, one raw result out. Throttling, retry, caching and response
//! normalization all live above the driver.
//!
//! # Example
//!
//! ```no_run
//! use augur_core::{GenerateRequest, ResponseFormat};
//! use augur_interface::IntelDriver;
//! use augur_models::GeminiClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::from_env();
//! let request = GenerateRequest::new("Weather in Reykjavik as JSON")
//!     .with_response_format(ResponseFormat::Json { schema: None });
//! let response = client.generate(&request).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod gemini;
mod metrics;

pub use gemini::{
    Candidate, Content, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SPEECH_MODEL, ErrorBody,
    ErrorEnvelope, GEMINI_API_KEY_ENV, GeminiClient, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, GroundingChunk, GroundingMetadata, InlineData,
    Part, PromptFeedback, SpeechConfig, Tool, WebSource, into_generate_response,
    parse_error_body,
};
pub use metrics::IntelMetrics;
