//! Response types for generation calls.

use serde::{Deserialize, Serialize};

/// A web source the model grounded its answer on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SourceCitation {
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Source URI
    #[serde(default)]
    pub uri: String,
}

/// Opaque binary payload, base64-encoded exactly as the provider sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InlineBlob {
    /// MIME type reported by the provider
    pub mime_type: String,
    /// Base64 data, untouched
    pub data: String,
}

/// The unified response object.
///
/// # Examples
///
/// ```
/// use augur_core::GenerateResponse;
///
/// let response = GenerateResponse::text("{\"ok\": true}");
/// assert_eq!(response.text.as_deref(), Some("{\"ok\": true}"));
/// assert!(response.citations.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerateResponse {
    /// Concatenated text parts, if any
    pub text: Option<String>,
    /// First inline binary part, if any
    pub audio: Option<InlineBlob>,
    /// Grounding sources, de-duplicated by URI
    pub citations: Vec<SourceCitation>,
    /// Provider finish reason
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// Response holding only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Response holding only an inline binary payload.
    pub fn audio(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            audio: Some(InlineBlob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Default::default()
        }
    }

    /// Attach grounding citations.
    pub fn with_citations(mut self, citations: Vec<SourceCitation>) -> Self {
        self.citations = citations;
        self
    }
}
