//! Trait definitions for the Augur intelligence client.
//!
//! The intelligence service talks to exactly one external collaborator, a
//! generative API. [`IntelDriver`] is the seam: production code plugs in the
//! Gemini REST client, tests plug in scripted mocks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::IntelDriver;
