//! Safeguard appliance access layer.
//!
//! This crate authenticates against a Safeguard appliance, keeps the session
//! warm in the background, routes requests to the right cluster node and
//! waits for asynchronously provisioned secrets. Resource-specific wrappers
//! build on two contracts: [`SafeguardClient::request`] and
//! [`SafeguardClient::session`].

pub mod auth;
pub(crate) mod backoff;
pub mod certificate;
pub mod client;
pub mod completion;
pub mod endpoints;
pub mod error;
pub mod metrics;
pub mod metrics_exporter;
pub mod models;
pub mod origin;
pub mod pkce;
pub mod redaction;
mod serde_helpers;
pub mod tracing;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{Credentials, Modality, SessionState, SessionStore};
pub use client::SafeguardClient;
pub use client::builder::SafeguardClientBuilder;
pub use client::{
    Bound, EventSubscription, RenewalOutcome, RenewalStrategy, RequestOptions, WaitOptions,
};
pub use error::{ClientError, ErrorKind, Result};
pub use crate::metrics::{ErrorCategory, MetricsCollector};
pub use metrics_exporter::{MetricsExporter, MetricsExporterError};
pub use models::{AccessRequest, ClusterMember, Event, RequestPhase, UserIdentity};
pub use origin::{CacheTtl, EndpointCache, Origin, Protocol};
pub use pkce::{BrowserLauncher, SystemBrowser};
pub use safeguard_config::AuthStrategy;
pub use tokio_util::sync::CancellationToken;
pub use crate::tracing::{TracingConfig, TracingError, TracingGuard};
