//! Request types for generation calls.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// What shape the model should answer in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// JSON, optionally constrained by a response schema
    Json {
        /// OpenAPI-style schema object passed through to the provider
        schema: Option<serde_json::Value>,
    },
    /// Synthesized speech returned as an inline binary payload
    Speech {
        /// Prebuilt voice name
        voice: String,
    },
}

/// Provider-neutral generation request.
///
/// # Examples
///
/// ```
/// use augur_core::{GenerateRequest, ResponseFormat};
///
/// let request = GenerateRequest::new("Current weather in Tokyo as JSON")
///     .with_response_format(ResponseFormat::Json { schema: None })
///     .with_system_instruction("You are a weather station.")
///     .with_temperature(0.4);
///
/// assert_eq!(request.prompt(), "Current weather in Tokyo as JSON");
/// assert_eq!(request.temperature(), &Some(0.4));
/// assert!(!request.grounding());
/// ```
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Default, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct GenerateRequest {
    /// Model identifier; the driver's default applies when `None`
    #[setters(strip_option, into)]
    model: Option<String>,
    /// User prompt
    #[setters(skip)]
    prompt: String,
    /// System instruction
    #[setters(strip_option, into)]
    system_instruction: Option<String>,
    /// Expected response shape
    response_format: ResponseFormat,
    /// Enable search grounding (citations come back in the response)
    grounding: bool,
    /// Sampling temperature
    #[setters(strip_option)]
    temperature: Option<f32>,
}

impl GenerateRequest {
    /// Create a text request for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Whether the caller expects an inline binary payload rather than text.
    pub fn wants_speech(&self) -> bool {
        matches!(self.response_format, ResponseFormat::Speech { .. })
    }
}
