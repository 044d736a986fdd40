//! The intelligence service façade.
//!
//! Every feature method funnels through [`IntelligenceService::fetch`]:
//!
//! ```text
//! cache lookup ─┬─ fresh hit ──────────────────────────────► value
//!               ├─ in flight ─► await the shared call ─────► value
//!               └─ miss ─► credential check ─► retry policy
//!                            └─ each attempt: queue slot ─► driver (with timeout)
//!                        ─► interpret ─► store ────────────► value
//! ```
//!
//! The queue, cache and retry policy are owned by the instance. Two services
//! never share spacing or cached data, which keeps tests isolated.

use crate::AugurConfig;
use augur_cache::{CacheKey, CacheStats, ResponseCache};
use augur_core::{Feature, GenerateRequest, GenerateResponse, NormalizeFailure, ResponseNormalizer};
use augur_error::{
    AugurResult, BuilderError, BuilderErrorKind, GeminiError, GeminiErrorKind, HttpError,
    IntelError, IntelErrorKind, IntelResult,
};
use augur_interface::IntelDriver;
use augur_models::{GeminiClient, IntelMetrics};
use augur_rate_limit::{RequestQueue, RetryPolicy};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rate-limited, cached, retrying client for dashboard intelligence feeds.
///
/// Cheap to clone; clones share the same queue, cache and driver.
///
/// # Example
///
/// ```no_run
/// use augur::IntelligenceService;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = IntelligenceService::from_env()?;
/// let report = service.weather("Reykjavik").await?;
/// println!("{}: {}°C", report.location, report.temperature_c);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct IntelligenceService {
    driver: Arc<dyn IntelDriver>,
    config: Arc<AugurConfig>,
    queue: RequestQueue,
    retry: RetryPolicy,
    cache: ResponseCache,
    normalizer: ResponseNormalizer,
}

impl fmt::Debug for IntelligenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntelligenceService")
            .field("provider", &self.driver.provider_name())
            .field("model", &self.driver.model_name())
            .field("queue", &self.queue)
            .field("cache", &self.cache)
            .finish()
    }
}

impl IntelligenceService {
    /// Start building a service around a custom driver.
    pub fn builder() -> IntelligenceServiceBuilder {
        IntelligenceServiceBuilder::default()
    }

    /// Build a service from a driver and configuration.
    pub fn new(driver: impl IntelDriver + 'static, config: AugurConfig) -> AugurResult<Self> {
        Self::builder().driver(driver).config(config).build()
    }

    /// Build a Gemini-backed service from layered configuration.
    ///
    /// Reads a `.env` file if present, then loads [`AugurConfig::load`]. A
    /// missing API key is not an error here: cached data can still be served
    /// and uncached requests report `CONFIGURATION_MISSING`.
    #[instrument]
    pub fn from_env() -> AugurResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!(error = %e, "No .env file loaded");
        }
        Self::from_config(AugurConfig::load()?)
    }

    /// Build a Gemini-backed service from an explicit configuration.
    pub fn from_config(config: AugurConfig) -> AugurResult<Self> {
        let client = config.client();
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;

        let driver = GeminiClient::from_env_var(client.api_key_env())
            .with_base_url(client.base_url())
            .with_model(client.model())
            .with_speech_model(client.speech_model())
            .with_http_client(http);

        Self::builder().driver(driver).config(config).build()
    }

    /// Active configuration.
    pub fn config(&self) -> &AugurConfig {
        &self.config
    }

    /// Name of the backing provider.
    pub fn provider_name(&self) -> &'static str {
        self.driver.provider_name()
    }

    /// Calls waiting for a dispatch slot.
    pub fn pending_requests(&self) -> usize {
        self.queue.pending()
    }

    /// Cache and de-duplication counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop the cached result for one feature call. Returns whether one existed.
    ///
    /// `args` are the call's arguments in key order: the location, region,
    /// topic, sector or query, `[target_language, text]` for translations and
    /// `[voice, text]` for speech.
    pub fn invalidate<S: AsRef<str>>(&self, feature: Feature, args: &[S]) -> bool {
        self.cache.invalidate(&cache_key(feature, args))
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop expired cache entries, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cache.cleanup_expired()
    }

    /// Fetch a JSON-shaped feature result.
    ///
    /// The model text is normalized into `T` (falling back to `fallback` when
    /// it cannot be parsed), then passed through `shape` together with the
    /// raw response so callers can fill request fields or attach citations.
    pub(crate) async fn fetch_structured<T, S>(
        &self,
        feature: Feature,
        key: CacheKey,
        request: GenerateRequest,
        fallback: T,
        shape: S,
    ) -> IntelResult<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + 'static,
        S: FnOnce(T, &GenerateResponse) -> T + Send + 'static,
    {
        let normalizer = self.normalizer.clone();
        let default = fallback.clone();
        self.fetch(feature, key, request, fallback, move |response| {
            let parsed = normalizer.normalize(response.text.as_deref(), default);
            Ok(shape(parsed, &response))
        })
        .await
    }

    /// Cache-aware fetch of one feature result.
    ///
    /// `interpret` turns a successful upstream response into `T`; returning an
    /// error fails the call and leaves the cache untouched. `fallback` is only
    /// used if a cached value no longer matches `T`.
    #[instrument(skip_all, fields(feature = %feature, key = %key))]
    pub(crate) async fn fetch<T, I>(
        &self,
        feature: Feature,
        key: CacheKey,
        request: GenerateRequest,
        fallback: T,
        interpret: I,
    ) -> IntelResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        I: FnOnce(GenerateResponse) -> IntelResult<T> + Send + 'static,
    {
        let ttl = self.config.feature_ttl(feature);
        let mut started = false;

        let result = self
            .cache
            .get_or_fetch(&key, Some(ttl), || {
                started = true;
                let this = self.clone();
                async move {
                    this.driver.ensure_credentials()?;
                    let response = this.dispatch(feature, &request).await?;
                    let value = interpret(response)?;
                    serde_json::to_value(&value).map_err(|e| {
                        IntelError::new(
                            IntelErrorKind::Unknown,
                            format!("failed to encode {} result: {}", feature, e),
                        )
                    })
                }
            })
            .await;

        IntelMetrics::get().record_cache_lookup(feature.as_ref(), !started);
        if !started {
            debug!("Served without a new upstream call");
        }

        let value = result?;
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Cached value does not match the expected shape");
            fallback
        }))
    }

    /// Run one request through retry, queue and timeout.
    async fn dispatch(
        &self,
        feature: Feature,
        request: &GenerateRequest,
    ) -> IntelResult<GenerateResponse> {
        let policy = self
            .retry
            .with_max_retries(self.config.feature_max_retries(feature));
        let timeout = self.config.client().request_timeout();
        let mut attempt = 0usize;

        policy
            .execute(|| {
                attempt += 1;
                if attempt > 1 {
                    IntelMetrics::get().record_retry(feature.as_ref());
                }
                let current = attempt;
                let driver = Arc::clone(&self.driver);
                let queue = self.queue.clone();
                async move {
                    queue
                        .run(move || async move {
                            debug!(attempt = current, "Dispatching upstream call");
                            match tokio::time::timeout(timeout, driver.generate(request)).await {
                                Ok(result) => result,
                                Err(_) => Err(GeminiError::new(GeminiErrorKind::Timeout(
                                    timeout.as_millis() as u64,
                                ))),
                            }
                        })
                        .await
                }
            })
            .await
    }
}

/// Cache key for one feature call.
///
/// Translation and speech keep the case of their trailing text argument.
pub(crate) fn cache_key<S: AsRef<str>>(feature: Feature, args: &[S]) -> CacheKey {
    match (feature, args.split_last()) {
        (Feature::Translation | Feature::Speech, Some((text, rest))) => {
            CacheKey::with_payload(feature.as_ref(), rest, text.as_ref())
        }
        _ => CacheKey::new(feature.as_ref(), args),
    }
}

/// Builder for [`IntelligenceService`].
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use augur::{AugurConfig, IntelligenceService};
/// use augur_core::{GenerateRequest, GenerateResponse};
/// use augur_error::GeminiError;
/// use augur_interface::IntelDriver;
///
/// struct Echo;
///
/// #[async_trait]
/// impl IntelDriver for Echo {
///     async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GeminiError> {
///         Ok(GenerateResponse::text(req.prompt().clone()))
///     }
///     fn provider_name(&self) -> &'static str { "echo" }
///     fn model_name(&self) -> &str { "echo-1" }
/// }
///
/// let service = IntelligenceService::builder()
///     .driver(Echo)
///     .config(AugurConfig::default())
///     .normalizer_hook(|failure| eprintln!("fallback: {}", failure.reason))
///     .build()
///     .unwrap();
/// assert_eq!(service.provider_name(), "echo");
/// ```
#[derive(Default)]
pub struct IntelligenceServiceBuilder {
    driver: Option<Arc<dyn IntelDriver>>,
    config: Option<AugurConfig>,
    hook: Option<Arc<dyn Fn(&NormalizeFailure) + Send + Sync>>,
}

impl fmt::Debug for IntelligenceServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntelligenceServiceBuilder")
            .field("driver", &self.driver.as_ref().map(|d| d.provider_name()))
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl IntelligenceServiceBuilder {
    /// Backend the service dispatches to. Required.
    pub fn driver(mut self, driver: impl IntelDriver + 'static) -> Self {
        self.driver = Some(Arc::new(driver));
        self
    }

    /// Backend shared with other owners.
    pub fn shared_driver(mut self, driver: Arc<dyn IntelDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Configuration. Defaults to [`AugurConfig::default`].
    pub fn config(mut self, config: AugurConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Observer for normalizer fallbacks.
    pub fn normalizer_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&NormalizeFailure) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Validate the configuration and assemble the service.
    pub fn build(self) -> AugurResult<IntelligenceService> {
        let driver = self
            .driver
            .ok_or_else(|| BuilderError::new(BuilderErrorKind::MissingField("driver".into())))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let hook = self.hook;
        let normalizer = ResponseNormalizer::with_hook(move |failure| {
            IntelMetrics::get().record_fallback();
            if let Some(hook) = &hook {
                hook(failure);
            }
        });

        debug!(
            provider = driver.provider_name(),
            model = driver.model_name(),
            min_delay_ms = *config.throttle().min_delay_ms(),
            "Building intelligence service"
        );

        Ok(IntelligenceService {
            queue: RequestQueue::from_config(config.throttle()),
            retry: RetryPolicy::new(config.retry().clone()),
            cache: ResponseCache::new(config.cache().clone()),
            normalizer,
            driver,
            config: Arc::new(config),
        })
    }
}
