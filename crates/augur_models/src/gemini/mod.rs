//! Google Gemini REST driver.

mod client;
mod dto;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SPEECH_MODEL, GEMINI_API_KEY_ENV, GeminiClient,
    into_generate_response, parse_error_body,
};
pub use dto::{
    Candidate, Content, ErrorBody, ErrorEnvelope, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, GroundingChunk, GroundingMetadata, InlineData,
    Part, PromptFeedback, SpeechConfig, Tool, WebSource,
};
