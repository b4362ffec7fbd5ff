//! Client builder for constructing [`SafeguardClient`] instances.
//!
//! This module is responsible for:
//! - Providing a fluent builder API for client configuration
//! - Parsing and validating the appliance origin
//! - Converting `safeguard-config` types into client settings (`from_config`)
//! - Configuring the underlying HTTP client (timeouts, redirects, TLS verification)
//!
//! # What this module does NOT handle:
//! - Logging in (see `session`); building a client performs no network I/O
//!
//! # Invariants
//! - `appliance_url` is required; the strategy is optional so callers can log
//!   in explicitly with any modality
//! - The appliance origin never expires; the leader origin uses `leader_cache`
//! - `skip_verify` only affects HTTPS connections; HTTP connections log a warning

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use safeguard_config::{
    AuthStrategy, Config,
    constants::{
        DEFAULT_API_VERSION, DEFAULT_EVENT_BACKOFF_INITIAL_MS, DEFAULT_EVENT_BACKOFF_MAX_SECS,
        DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_INTERACTIVE_TIMEOUT_SECS, DEFAULT_LEADER_CACHE_SECS,
        DEFAULT_MAX_REDIRECTS, DEFAULT_RENEWAL_MARGIN_SECS, DEFAULT_SESSION_TTL_SECS,
        DEFAULT_TIMEOUT_SECS, MIN_RENEWAL_INTERVAL_MS,
    },
};

use crate::auth::SessionStore;
use crate::client::{ClientInner, ClientSettings, HttpSettings, SafeguardClient};
use crate::completion::AuthCompletion;
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::origin::{CacheTtl, EndpointCache, Origin, Protocol};
use crate::pkce::{BrowserLauncher, SystemBrowser};

/// Builder for creating a new [`SafeguardClient`].
///
/// # Example
///
/// ```rust,ignore
/// use safeguard_client::{AuthStrategy, SafeguardClient};
/// use secrecy::SecretString;
///
/// let client = SafeguardClient::builder()
///     .appliance_url("https://sg.example.com")
///     .auth_strategy(AuthStrategy::Password {
///         username: "admin".to_string(),
///         password: SecretString::new("secret".to_string().into()),
///         provider: "local".to_string(),
///     })
///     .timeout(Duration::from_secs(60))
///     .build()?;
/// ```
pub struct SafeguardClientBuilder {
    appliance_url: Option<String>,
    auth_strategy: Option<AuthStrategy>,
    skip_verify: bool,
    timeout: Duration,
    api_version: String,
    leader_cache: CacheTtl,
    session_ttl: Duration,
    renewal_margin: Duration,
    min_renewal_interval: Duration,
    interactive_timeout: Duration,
    event_queue_capacity: usize,
    event_backoff_initial: Duration,
    event_backoff_max: Duration,
    default_headers: HeaderMap,
    metrics: Option<MetricsCollector>,
    browser: Option<Arc<dyn BrowserLauncher>>,
}

impl Default for SafeguardClientBuilder {
    fn default() -> Self {
        Self {
            appliance_url: None,
            auth_strategy: None,
            skip_verify: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_version: DEFAULT_API_VERSION.to_string(),
            leader_cache: CacheTtl::Expiring(Duration::from_secs(DEFAULT_LEADER_CACHE_SECS)),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            renewal_margin: Duration::from_secs(DEFAULT_RENEWAL_MARGIN_SECS),
            min_renewal_interval: Duration::from_millis(MIN_RENEWAL_INTERVAL_MS),
            interactive_timeout: Duration::from_secs(DEFAULT_INTERACTIVE_TIMEOUT_SECS),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            event_backoff_initial: Duration::from_millis(DEFAULT_EVENT_BACKOFF_INITIAL_MS),
            event_backoff_max: Duration::from_secs(DEFAULT_EVENT_BACKOFF_MAX_SECS),
            default_headers: HeaderMap::new(),
            metrics: None,
            browser: None,
        }
    }
}

impl SafeguardClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the appliance URL, e.g. `https://sg.example.com`.
    ///
    /// A missing port defaults to 443 for `https` and 80 for `http`.
    pub fn appliance_url(mut self, url: impl Into<String>) -> Self {
        self.appliance_url = Some(url.into());
        self
    }

    /// Set the strategy used by [`SafeguardClient::login`].
    pub fn auth_strategy(mut self, strategy: AuthStrategy) -> Self {
        self.auth_strategy = Some(strategy);
        self
    }

    /// Set whether to skip TLS certificate verification.
    ///
    /// # Security Warning
    /// Only use this against appliances with self-signed certificates you
    /// trust. Disabling verification exposes the session token to
    /// man-in-the-middle attacks.
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    /// Set the request timeout. Default is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the REST API version segment. Default is `v4`.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set how long a discovered cluster leader is trusted.
    ///
    /// `CacheTtl::Expiring(Duration::ZERO)` re-resolves the leader on every
    /// write; `CacheTtl::Forever` resolves it once.
    pub fn leader_cache(mut self, ttl: impl Into<CacheTtl>) -> Self {
        self.leader_cache = ttl.into();
        self
    }

    /// Session validity assumed when the identity provider omits `expires_in`.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// How long before expiry the background refresher renews the session.
    pub fn renewal_margin(mut self, margin: Duration) -> Self {
        self.renewal_margin = margin;
        self
    }

    /// Floor for the refresher interval.
    pub fn min_renewal_interval(mut self, interval: Duration) -> Self {
        self.min_renewal_interval = interval;
        self
    }

    /// Maximum time to wait for the browser redirect in interactive login.
    pub fn interactive_timeout(mut self, timeout: Duration) -> Self {
        self.interactive_timeout = timeout;
        self
    }

    /// Capacity of the bounded event queue.
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }

    /// Initial and maximum reconnect delay for the event stream.
    pub fn event_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.event_backoff_initial = initial;
        self.event_backoff_max = max.max(initial);
        self
    }

    /// Add a header sent with every dispatched request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] when the name or value is not
    /// a valid HTTP header.
    pub fn default_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidHeader(format!("value for {name}: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Set the metrics collector for API call tracking.
    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the browser launcher used by interactive login.
    pub fn browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Create a client builder from configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use safeguard_client::SafeguardClient;
    /// use safeguard_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().from_env()?.build()?;
    /// let client = SafeguardClient::builder().from_config(&config).build()?;
    /// ```
    pub fn from_config(mut self, config: &Config) -> Self {
        let connection = &config.connection;
        self.appliance_url = Some(connection.appliance_url.clone());
        self.auth_strategy = Some(config.auth.strategy.clone());
        self.skip_verify = connection.skip_verify;
        self.timeout = connection.timeout;
        self.api_version = connection.api_version.clone();
        self.leader_cache = match connection.leader_cache {
            Some(ttl) => CacheTtl::Expiring(ttl),
            None => CacheTtl::Forever,
        };
        self.session_ttl = Duration::from_secs(connection.session_ttl_seconds);
        self.renewal_margin = Duration::from_secs(connection.renewal_margin_seconds);
        self
    }

    /// Build the [`SafeguardClient`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `appliance_url` was not provided
    /// or does not parse, and [`ClientError::UnsupportedProtocol`] for schemes
    /// other than `http`/`https`.
    pub fn build(self) -> Result<SafeguardClient> {
        let raw = self
            .appliance_url
            .ok_or_else(|| ClientError::InvalidUrl("appliance_url is required".to_string()))?;
        let origin = Origin::parse(raw.trim_end_matches('/'))?;

        let http_settings = HttpSettings {
            timeout: self.timeout,
            skip_verify: self.skip_verify,
            https: origin.protocol() == Protocol::Https,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        };
        let http = http_settings.build(None)?;

        let appliance = EndpointCache::new("appliance");
        appliance.store(origin, CacheTtl::Forever);

        tracing::debug!(
            appliance = ?appliance.read(),
            api_version = %self.api_version,
            strategy = self.auth_strategy.as_ref().map(AuthStrategy::label),
            "Built Safeguard client"
        );

        Ok(SafeguardClient {
            inner: Arc::new(ClientInner {
                http: RwLock::new(http),
                http_settings,
                settings: ClientSettings {
                    api_version: self.api_version,
                    leader_cache: self.leader_cache,
                    session_ttl: self.session_ttl,
                    renewal_margin: self.renewal_margin,
                    min_renewal_interval: self.min_renewal_interval,
                    interactive_timeout: self.interactive_timeout,
                    event_queue_capacity: self.event_queue_capacity,
                    event_backoff_initial: self.event_backoff_initial,
                    event_backoff_max: self.event_backoff_max,
                },
                appliance,
                leader: EndpointCache::new("leader"),
                session: SessionStore::new(),
                auth_finished: AuthCompletion::new(),
                default_headers: self.default_headers,
                strategy: self.auth_strategy,
                metrics: self.metrics,
                browser: self.browser.unwrap_or_else(|| Arc::new(SystemBrowser)),
                events_active: AtomicBool::new(false),
                http_generation: AtomicU64::new(0),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_from_config_with_access_token() {
        let config = Config::with_access_token(
            "https://sg.example.com".to_string(),
            SecretString::new("test-token".to_string().into()),
        );

        let client = SafeguardClient::builder().from_config(&config).build().unwrap();
        assert_eq!(client.appliance_url().unwrap(), "https://sg.example.com:443");
        assert_eq!(client.api_version(), "v4");
        assert!(matches!(
            client.inner.strategy,
            Some(AuthStrategy::AccessToken { .. })
        ));
    }

    #[test]
    fn test_from_config_preserves_settings() {
        let mut config = Config::with_password(
            "https://sg.example.com:8443".to_string(),
            "admin".to_string(),
            SecretString::new("test-password".to_string().into()),
        );
        config.connection.skip_verify = true;
        config.connection.timeout = Duration::from_secs(120);
        config.connection.api_version = "v3".to_string();
        config.connection.leader_cache = Some(Duration::ZERO);
        config.connection.session_ttl_seconds = 7200;
        config.connection.renewal_margin_seconds = 120;

        let builder = SafeguardClient::builder().from_config(&config);

        assert_eq!(
            builder.appliance_url.as_deref(),
            Some("https://sg.example.com:8443")
        );
        assert!(builder.skip_verify);
        assert_eq!(builder.timeout, Duration::from_secs(120));
        assert_eq!(builder.api_version, "v3");
        assert_eq!(builder.leader_cache, CacheTtl::Expiring(Duration::ZERO));
        assert_eq!(builder.session_ttl, Duration::from_secs(7200));
        assert_eq!(builder.renewal_margin, Duration::from_secs(120));
    }

    #[test]
    fn test_from_config_negative_leader_cache_never_expires() {
        let mut config = Config::with_password(
            "https://sg.example.com".to_string(),
            "admin".to_string(),
            SecretString::new("test-password".to_string().into()),
        );
        config.connection.leader_cache = None;

        let builder = SafeguardClient::builder().from_config(&config);
        assert_eq!(builder.leader_cache, CacheTtl::Forever);
    }

    #[test]
    fn test_build_trims_trailing_slashes() {
        let client = SafeguardClient::builder()
            .appliance_url("http://sg.example.com:8080//")
            .build()
            .unwrap();
        assert_eq!(client.appliance_url().unwrap(), "http://sg.example.com:8080");
    }

    #[test]
    fn test_default_header_rejects_invalid_name() {
        assert!(
            SafeguardClient::builder()
                .default_header("bad header", "x")
                .is_err()
        );
    }

    #[test]
    fn test_event_backoff_max_not_below_initial() {
        let builder = SafeguardClient::builder()
            .event_backoff(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(builder.event_backoff_max, Duration::from_secs(5));
    }
}
