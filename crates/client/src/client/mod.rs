//! The Safeguard client handle.
//!
//! [`SafeguardClient`] is an explicit, cheaply cloneable handle; there is no
//! process-wide instance. Every clone shares the same session, origins and
//! HTTP transport.
//!
//! # Submodules
//! - [`builder`]: Client construction and configuration
//! - `session`: Login flows, logout, session export and the `me` check
//! - `refresh`: Background session renewal
//! - `resolver`: Read/write origin selection and cluster leader discovery
//! - `dispatch`: Authenticated GET/POST/PUT/DELETE
//! - `access_requests`: Waiting for and checking out access request secrets
//! - `binding`: Entities bound to the client they were fetched through
//! - `events`: Appliance event subscription
//!
//! # What this module does NOT handle:
//! - Raw token grants (delegated to [`crate::endpoints`])
//! - Session storage and expiry arithmetic (delegated to [`crate::auth::SessionStore`])
//!
//! # Invariants
//! - No method holds more than one of the session or origin locks at a time.
//! - The HTTP transport is swapped wholesale when a client certificate is installed.

pub mod builder;

mod access_requests;
mod binding;
mod dispatch;
mod events;
mod refresh;
mod resolver;
mod session;

pub use access_requests::WaitOptions;
pub use binding::Bound;
pub use dispatch::RequestOptions;
pub use events::EventSubscription;
pub use refresh::{RenewalOutcome, RenewalStrategy, renewal_interval};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::HeaderMap;
use safeguard_config::AuthStrategy;

use crate::auth::{SessionState, SessionStore};
use crate::completion::AuthCompletion;
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::origin::{CacheTtl, EndpointCache};
use crate::pkce::BrowserLauncher;

/// Transport settings needed to rebuild the HTTP client.
#[derive(Debug, Clone)]
pub(crate) struct HttpSettings {
    pub timeout: Duration,
    pub skip_verify: bool,
    pub https: bool,
    pub max_redirects: usize,
}

impl HttpSettings {
    /// Request/response client with a total request timeout.
    pub(crate) fn build(&self, identity: Option<reqwest::Identity>) -> Result<reqwest::Client> {
        let mut builder = self.base_builder().timeout(self.timeout);
        if let Some(identity) = identity {
            builder = builder.identity(identity);
        }
        Ok(builder.build()?)
    }

    /// Client for long-lived streams: connect timeout only.
    pub(crate) fn build_streaming(&self) -> Result<reqwest::Client> {
        Ok(self.base_builder().connect_timeout(self.timeout).build()?)
    }

    fn base_builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects));

        if self.skip_verify {
            if self.https {
                builder = builder.danger_accept_invalid_certs(true);
            } else {
                tracing::warn!(
                    "skip_verify=true has no effect on HTTP URLs. TLS verification only applies to HTTPS connections."
                );
            }
        }
        builder
    }
}

/// Tunables that are not part of the transport.
#[derive(Debug, Clone)]
pub(crate) struct ClientSettings {
    pub api_version: String,
    pub leader_cache: CacheTtl,
    pub session_ttl: Duration,
    pub renewal_margin: Duration,
    pub min_renewal_interval: Duration,
    pub interactive_timeout: Duration,
    pub event_queue_capacity: usize,
    pub event_backoff_initial: Duration,
    pub event_backoff_max: Duration,
}

pub(crate) struct ClientInner {
    pub http: RwLock<reqwest::Client>,
    /// Bumped on every transport swap.
    pub http_generation: AtomicU64,
    pub http_settings: HttpSettings,
    pub settings: ClientSettings,
    pub appliance: EndpointCache,
    pub leader: EndpointCache,
    pub session: SessionStore,
    pub auth_finished: AuthCompletion,
    pub default_headers: HeaderMap,
    pub strategy: Option<AuthStrategy>,
    pub metrics: Option<MetricsCollector>,
    pub browser: Arc<dyn BrowserLauncher>,
    pub events_active: AtomicBool,
}

/// Safeguard appliance client.
///
/// # Creating a Client
///
/// ```rust,ignore
/// use safeguard_client::SafeguardClient;
/// use safeguard_config::ConfigLoader;
///
/// let config = ConfigLoader::new().load_dotenv()?.from_env()?.build()?;
/// let client = SafeguardClient::builder().from_config(&config).build()?;
/// client.login().await?;
/// let me = client.me().await?;
/// ```
#[derive(Clone)]
pub struct SafeguardClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for SafeguardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeguardClient")
            .field("appliance", &self.inner.appliance.read())
            .field("api_version", &self.inner.settings.api_version)
            .field("modality", &self.inner.session.modality())
            .finish_non_exhaustive()
    }
}

impl SafeguardClient {
    /// Create a new client builder.
    pub fn builder() -> builder::SafeguardClientBuilder {
        builder::SafeguardClientBuilder::new()
    }

    /// The appliance origin, `protocol://host[.domain]:port`.
    pub fn appliance_url(&self) -> Result<String> {
        self.inner
            .appliance
            .read()
            .ok_or_else(|| ClientError::InvalidUrl("appliance origin is not set".to_string()))
    }

    pub fn api_version(&self) -> &str {
        &self.inner.settings.api_version
    }

    /// Consistent copy of the current session.
    pub fn session(&self) -> SessionState {
        self.inner.session.snapshot()
    }

    /// Direct access to the session store.
    pub fn session_store(&self) -> &SessionStore {
        &self.inner.session
    }

    /// True once the first login has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.inner.auth_finished.is_complete()
    }

    pub(crate) fn http(&self) -> reqwest::Client {
        self.inner
            .http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_http(&self, http: reqwest::Client) {
        *self
            .inner
            .http
            .write()
            .unwrap_or_else(PoisonError::into_inner) = http;
        let generation = self.inner.http_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "Replaced HTTP transport");
    }

    /// How many times the HTTP transport has been replaced since construction.
    pub fn transport_generation(&self) -> u64 {
        self.inner.http_generation.load(Ordering::SeqCst)
    }

    pub(crate) fn metrics(&self) -> Option<&MetricsCollector> {
        self.inner.metrics.as_ref()
    }
}
