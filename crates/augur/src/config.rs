//! Layered configuration for the intelligence service.
//!
//! Configuration sources in order of precedence (later sources override earlier):
//! 1. Bundled defaults (`augur.toml` shipped with the library)
//! 2. User config in the home directory (`~/.config/augur/augur.toml`)
//! 3. User config in the current directory (`./augur.toml`)
//!
//! User config files are optional and silently skipped if absent.
//!
//! ```toml
//! [throttle]
//! min_delay_ms = 6000
//!
//! [features.signals]
//! ttl_secs = 30
//! ```

use augur_cache::CacheConfig;
use augur_core::Feature;
use augur_error::{AugurError, AugurResult, ConfigError};
use augur_rate_limit::{RetryConfig, ThrottleConfig};
use config::{Config, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, instrument, warn};

const DEFAULT_CONFIG: &str = include_str!("../../../augur.toml");

/// Upstream client settings.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_", into)]
pub struct ClientConfig {
    /// Model for text and JSON requests
    #[serde(default = "default_model")]
    model: String,

    /// Model for speech synthesis
    #[serde(default = "default_speech_model")]
    speech_model: String,

    /// REST base URL
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    api_key_env: String,

    /// Per-attempt timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_model() -> String {
    augur_models::DEFAULT_MODEL.to_string()
}

fn default_speech_model() -> String {
    augur_models::DEFAULT_SPEECH_MODEL.to_string()
}

fn default_base_url() -> String {
    augur_models::DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    augur_models::GEMINI_API_KEY_ENV.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            speech_model: default_speech_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Per-attempt timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Per-feature overrides. Unset values fall back to the feature's defaults.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_", strip_option)]
pub struct FeatureConfig {
    /// Cache lifetime (seconds)
    #[serde(default)]
    ttl_secs: Option<u64>,

    /// Retry budget for rate-limited attempts
    #[serde(default)]
    max_retries: Option<usize>,
}

/// Complete service configuration.
///
/// # Example
///
/// ```
/// use augur::AugurConfig;
/// use augur_core::Feature;
/// use std::time::Duration;
///
/// let config = AugurConfig::default();
/// assert_eq!(config.throttle().min_delay(), Duration::from_millis(4500));
/// assert_eq!(config.feature_ttl(Feature::Signals), Duration::from_secs(60));
/// assert_eq!(config.feature_max_retries(Feature::Translation), 8);
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct AugurConfig {
    /// Upstream client settings
    #[serde(default)]
    client: ClientConfig,

    /// Dispatch spacing
    #[serde(default)]
    throttle: ThrottleConfig,

    /// Retry and backoff
    #[serde(default)]
    retry: RetryConfig,

    /// Response cache
    #[serde(default)]
    cache: CacheConfig,

    /// Per-feature overrides keyed by feature name
    #[serde(default)]
    features: BTreeMap<Feature, FeatureConfig>,
}

impl AugurConfig {
    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use augur::AugurConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = AugurConfig::load()?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> AugurResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/augur/augur.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("augur").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Bundled defaults only, ignoring user files.
    pub fn bundled() -> AugurResult<Self> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Load configuration from a specific file, on top of the bundled defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> AugurResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string. Missing keys take defaults.
    pub fn from_toml_str(toml: &str) -> AugurResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the request discipline.
    pub fn validate(&self) -> Result<(), AugurError> {
        let factor = *self.retry.factor();
        if !factor.is_finite() || factor <= 1.0 {
            return Err(ConfigError::new(format!(
                "retry.factor must be greater than 1.0 so backoff grows, got {factor}"
            ))
            .into());
        }
        if !(1.8..=2.0).contains(&factor) {
            warn!(factor, "retry.factor outside the recommended 1.8-2.0 range");
        }
        if *self.retry.initial_backoff_ms() == 0 {
            return Err(ConfigError::new("retry.initial_backoff_ms must be positive").into());
        }
        if self.retry.max_backoff_ms() < self.retry.initial_backoff_ms() {
            return Err(ConfigError::new(
                "retry.max_backoff_ms must not be less than retry.initial_backoff_ms",
            )
            .into());
        }
        let budget = Feature::iter()
            .map(|feature| self.feature_max_retries(feature))
            .max()
            .unwrap_or(0);
        if budget > 1 {
            let last_base =
                *self.retry.initial_backoff_ms() as f64 * factor.powi(budget as i32 - 1);
            if last_base > *self.retry.max_backoff_ms() as f64 {
                warn!(
                    budget,
                    max_backoff_ms = *self.retry.max_backoff_ms(),
                    "retry.max_backoff_ms flattens the longest retry budget's backoff"
                );
            }
        }
        if *self.client.request_timeout_secs() == 0 {
            return Err(ConfigError::new("client.request_timeout_secs must be positive").into());
        }
        if self.client.api_key_env().trim().is_empty() {
            return Err(ConfigError::new("client.api_key_env must name a variable").into());
        }
        if let Some((feature, _)) = self
            .features
            .iter()
            .find(|(_, f)| f.ttl_secs.is_some_and(|ttl| ttl == 0))
        {
            return Err(ConfigError::new(format!(
                "features.{feature}.ttl_secs must be positive"
            ))
            .into());
        }
        Ok(())
    }

    /// Cache lifetime for a feature.
    pub fn feature_ttl(&self, feature: Feature) -> Duration {
        self.features
            .get(&feature)
            .and_then(|f| f.ttl_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| feature.default_ttl())
    }

    /// Retry budget for a feature.
    pub fn feature_max_retries(&self, feature: Feature) -> usize {
        self.features
            .get(&feature)
            .and_then(|f| f.max_retries)
            .unwrap_or_else(|| feature.default_max_retries())
    }

    /// Override one feature's settings.
    pub fn with_feature(mut self, feature: Feature, overrides: FeatureConfig) -> Self {
        self.features.insert(feature, overrides);
        self
    }
}
