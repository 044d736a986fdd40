//! Defensive conversion of model text into typed values.
//!
//! Model output is not guaranteed to be well-formed. It often arrives wrapped
//! in markdown code fences, occasionally with chatter around the payload, and
//! sometimes not as JSON at all. The normalizer never fails: anything it cannot
//! turn into the expected type degrades to the caller's fallback value, and the
//! degradation is reported through `tracing` and an optional hook.

use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Why normalization fell back.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum NormalizeFailureReason {
    /// No text, or only whitespace and fences
    #[display("empty response")]
    Empty,
    /// Text present but not parseable as the expected shape
    #[display("malformed response: {}", _0)]
    Malformed(String),
}

/// Diagnostic emitted whenever the fallback value is substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeFailure {
    /// Why parsing failed
    pub reason: NormalizeFailureReason,
    /// First characters of the offending text
    pub excerpt: String,
}

/// Observer invoked on every fallback substitution.
pub type NormalizeHook = Arc<dyn Fn(&NormalizeFailure) + Send + Sync>;

const EXCERPT_CHARS: usize = 120;

/// Converts raw model text into typed values with a safe fallback.
///
/// # Examples
///
/// ```
/// use augur_core::ResponseNormalizer;
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, PartialEq, Deserialize)]
/// struct Reading { celsius: f64 }
///
/// let normalizer = ResponseNormalizer::new();
///
/// let fenced = "```json\n{\"celsius\": 21.5}\n```";
/// assert_eq!(normalizer.normalize(Some(fenced), Reading::default()).celsius, 21.5);
///
/// let garbage = normalizer.normalize(Some("not json"), Reading { celsius: -1.0 });
/// assert_eq!(garbage.celsius, -1.0);
/// ```
#[derive(Clone, Default)]
pub struct ResponseNormalizer {
    hook: Option<NormalizeHook>,
}

impl fmt::Debug for ResponseNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseNormalizer")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl ResponseNormalizer {
    /// Create a normalizer that only logs fallbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer that also reports fallbacks to `hook`.
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: Fn(&NormalizeFailure) + Send + Sync + 'static,
    {
        Self {
            hook: Some(Arc::new(hook)),
        }
    }

    /// Parse `raw` into `T`, returning `fallback` on any failure.
    pub fn normalize<T: DeserializeOwned>(&self, raw: Option<&str>, fallback: T) -> T {
        match parse(raw.unwrap_or_default()) {
            Ok(value) => value,
            Err(reason) => {
                let failure = NormalizeFailure {
                    reason,
                    excerpt: raw.unwrap_or_default().chars().take(EXCERPT_CHARS).collect(),
                };
                tracing::warn!(
                    reason = %failure.reason,
                    excerpt = %failure.excerpt,
                    "Substituting fallback for unparseable model response"
                );
                if let Some(hook) = &self.hook {
                    hook(&failure);
                }
                fallback
            }
        }
    }
}

fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, NormalizeFailureReason> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(NormalizeFailureReason::Empty);
    }

    let first_error = match serde_json::from_str(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    // Chatter around the payload: try the first balanced structure.
    extract_balanced(body)
        .and_then(|span| serde_json::from_str(span).ok())
        .ok_or_else(|| NormalizeFailureReason::Malformed(first_error.to_string()))
}

/// Strip leading/trailing markdown fence markers and surrounding whitespace.
///
/// The opening fence may carry a language tag (```` ```json ````). A word
/// counts as a tag only when a line break or space follows it, so a bare
/// scalar such as ```` ```42``` ```` keeps its value.
///
/// # Examples
///
/// ```
/// use augur_core::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
/// assert_eq!(strip_code_fences("```true```"), "true");
/// assert_eq!(strip_code_fences("  plain  "), "plain");
/// ```
pub fn strip_code_fences(raw: &str) -> &str {
    let mut body = raw.trim();

    if let Some(rest) = body.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        let after_tag = &rest[tag_len..];
        body = if after_tag.starts_with(char::is_whitespace) {
            after_tag
        } else {
            rest
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// First balanced `{…}` or `[…]` span, whichever opens first.
fn extract_balanced(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let open = text[start..].chars().next()?;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
