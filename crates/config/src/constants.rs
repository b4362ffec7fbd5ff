//! Centralized constants for the Safeguard access workspace.
//!
//! This module contains default values used across crates to avoid
//! magic number duplication and improve maintainability.

// =============================================================================
// Connection & Timeout Defaults
// =============================================================================

/// Default appliance REST API version segment (`/service/core/<version>/`).
pub const DEFAULT_API_VERSION: &str = "v4";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum allowed request timeout in seconds (1 hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Default maximum number of HTTP redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// How long a discovered cluster leader is trusted before it is re-resolved.
pub const DEFAULT_LEADER_CACHE_SECS: u64 = 300;

// =============================================================================
// Session Defaults
// =============================================================================

/// Session validity assumed when the identity provider omits `expires_in`.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Maximum accepted session validity in seconds (24 hours).
pub const MAX_SESSION_TTL_SECS: u64 = 86400;

/// How long before expiry the background refresher renews the session.
pub const DEFAULT_RENEWAL_MARGIN_SECS: u64 = 60;

/// Floor for the refresher interval when a session is already close to expiry.
pub const MIN_RENEWAL_INTERVAL_MS: u64 = 1000;

/// Environment variable holding an exported session token.
pub const ACCESS_TOKEN_ENV_VAR: &str = "SAFEGUARD_ACCESS_TOKEN";

// =============================================================================
// Identity Provider Defaults
// =============================================================================

/// Scope for the appliance's local identity provider.
pub const DEFAULT_LOCAL_PROVIDER: &str = "local";

/// Scope for the appliance's certificate identity provider.
pub const DEFAULT_CERTIFICATE_PROVIDER: &str = "certificate";

/// Fixed local port that receives the OAuth redirect in interactive login.
pub const DEFAULT_REDIRECT_PORT: u16 = 8400;

/// Maximum time to wait for the browser to deliver the authorization code.
pub const DEFAULT_INTERACTIVE_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Access Request Polling Defaults
// =============================================================================

/// Polling interval for access request state checks in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default maximum time to wait for an access request to become available.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 300;

// =============================================================================
// Event Stream Defaults
// =============================================================================

/// Capacity of the bounded queue between the event reader and its consumer.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// First reconnect delay after the event stream drops.
pub const DEFAULT_EVENT_BACKOFF_INITIAL_MS: u64 = 1000;

/// Reconnect delay ceiling (7 days). Only cancellation ends the reconnect loop.
pub const DEFAULT_EVENT_BACKOFF_MAX_SECS: u64 = 7 * 24 * 60 * 60;
