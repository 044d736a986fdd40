//! Error types for the Augur intelligence client.
//!
//! This crate provides the foundation error types used throughout the Augur workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Two layers matter for callers of the intelligence service:
//! - [`GeminiError`] is the raw failure caught at the network boundary.
//! - [`IntelError`] is the classified failure handed back to callers. It carries a
//!   stable machine code drawn from the closed [`IntelErrorKind`] taxonomy.
//!
//! [`classify`] is the only place a raw failure becomes an [`IntelError`].
//!
//! # Examples
//!
//! ```
//! use augur_error::{classify, GeminiError, GeminiErrorKind, IntelErrorKind};
//!
//! let raw = GeminiError::new(GeminiErrorKind::HttpError {
//!     status_code: 429,
//!     status: Some("RESOURCE_EXHAUSTED".to_string()),
//!     message: "Quota exceeded".to_string(),
//! });
//!
//! let err = classify(&raw);
//! assert_eq!(err.kind, IntelErrorKind::RateLimited);
//! assert_eq!(err.code(), "RATE_LIMITED");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod gemini;
mod http;
mod intel;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use error::{AugurError, AugurErrorKind, AugurResult};
pub use gemini::{GeminiError, GeminiErrorKind, RetryableError};
pub use http::HttpError;
pub use intel::{IntelError, IntelErrorKind, IntelResult, classify, classify_message};
