//! Deterministic cache keys.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Longest argument kept verbatim in a key.
const MAX_ARG_CHARS: usize = 64;

/// Identifies one logical request: a namespace plus normalized arguments.
///
/// Arguments are trimmed, whitespace-collapsed and lowercased, so
/// `" New  York "` and `"new york"` share an entry. Long arguments are
/// truncated and suffixed with a hash of the full text, keeping keys short
/// without letting two long inputs with a common prefix collide.
///
/// Keys whose last argument is content the model acts on (text to translate
/// or speak) are built with [`CacheKey::with_payload`], which keeps that
/// argument's case.
///
/// # Examples
///
/// ```
/// use augur_cache::CacheKey;
///
/// let a = CacheKey::new("weather", &[" New  York "]);
/// let b = CacheKey::new("weather", &["new york"]);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "weather:new york");
///
/// let c = CacheKey::new("translation", &["hola", "en"]);
/// assert_eq!(c.as_str(), "translation:hola|en");
///
/// let d = CacheKey::with_payload("translation", &["French"], "Apple");
/// assert_eq!(d.as_str(), "translation:french|Apple");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{}", _0)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a namespace (usually a feature name) and arguments.
    pub fn new<S: AsRef<str>>(namespace: &str, args: &[S]) -> Self {
        let args: Vec<String> = args.iter().map(|a| normalize_arg(a.as_ref(), true)).collect();
        Self(format!("{}:{}", namespace, args.join("|")))
    }

    /// Like [`CacheKey::new`], followed by a case-sensitive `payload`.
    ///
    /// Whitespace in the payload is still collapsed and long payloads are
    /// still hashed.
    pub fn with_payload<S: AsRef<str>>(namespace: &str, args: &[S], payload: &str) -> Self {
        let mut parts: Vec<String> =
            args.iter().map(|a| normalize_arg(a.as_ref(), true)).collect();
        parts.push(normalize_arg(payload, false));
        Self(format!("{}:{}", namespace, parts.join("|")))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn normalize_arg(arg: &str, fold_case: bool) -> String {
    let collapsed = arg.split_whitespace().collect::<Vec<_>>().join(" ");
    let normalized = if fold_case {
        collapsed.to_lowercase()
    } else {
        collapsed
    };

    if normalized.chars().count() <= MAX_ARG_CHARS {
        return normalized;
    }

    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    let prefix: String = normalized.chars().take(MAX_ARG_CHARS).collect();
    format!("{}#{:016x}", prefix, hasher.finish())
}
