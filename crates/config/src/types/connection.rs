//! Connection configuration types for the Safeguard access layer.
//!
//! Responsibilities:
//! - Define connection settings (appliance URL, TLS verification, timeouts,
//!   API version, cluster leader caching).
//! - Define the main `Config` structure combining connection and auth.
//! - Provide serialization helpers for `Duration`.
//!
//! Does NOT handle:
//! - Configuration loading from env (see `loader` module).
//! - Actual network connections (see client crate).
//!
//! Invariants:
//! - All duration fields are serialized as seconds (integers); a negative
//!   leader cache means the leader never expires.
//! - Default values come from `constants`, not magic numbers.

use crate::constants::{
    DEFAULT_API_VERSION, DEFAULT_LEADER_CACHE_SECS, DEFAULT_LOCAL_PROVIDER,
    DEFAULT_RENEWAL_MARGIN_SECS, DEFAULT_SESSION_TTL_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::types::auth::{AuthConfig, AuthStrategy};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Module for serializing Duration as seconds (integer).
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Module for the leader cache: seconds, with any negative value meaning
/// the cached leader never expires.
mod leader_cache_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ttl {
            Some(duration) => i64::try_from(duration.as_secs())
                .unwrap_or(i64::MAX)
                .serialize(serializer),
            None => (-1i64).serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = i64::deserialize(deserializer)?;
        Ok(super::leader_cache_from_secs(secs))
    }
}

/// `None` (never expires) for negative seconds.
pub fn leader_cache_from_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs).ok().map(Duration::from_secs)
}

/// Connection configuration for a Safeguard appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Appliance URL (e.g., https://safeguard.example.com)
    pub appliance_url: String,
    /// Whether to skip TLS verification (for self-signed appliance certificates)
    pub skip_verify: bool,
    /// Request timeout (serialized as seconds)
    #[serde(with = "duration_seconds")]
    pub timeout: Duration,
    /// REST API version segment, e.g. `v4`
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// How long a discovered cluster leader is cached. `None` never expires;
    /// serialized as seconds, negative for `None`.
    #[serde(default = "default_leader_cache", with = "leader_cache_seconds")]
    pub leader_cache: Option<Duration>,
    /// Session validity assumed when the identity provider does not report one
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// How long before expiry the session is renewed in the background
    #[serde(default = "default_renewal_margin")]
    pub renewal_margin_seconds: u64,
}

pub(crate) fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

pub(crate) fn default_leader_cache() -> Option<Duration> {
    Some(Duration::from_secs(DEFAULT_LEADER_CACHE_SECS))
}

pub(crate) fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

pub(crate) fn default_renewal_margin() -> u64 {
    DEFAULT_RENEWAL_MARGIN_SECS
}

impl ConnectionConfig {
    /// Connection settings for `appliance_url` with every other field defaulted.
    pub fn new(appliance_url: impl Into<String>) -> Self {
        Self {
            appliance_url: appliance_url.into(),
            skip_verify: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_version: default_api_version(),
            leader_cache: default_leader_cache(),
            session_ttl_seconds: default_session_ttl(),
            renewal_margin_seconds: default_renewal_margin(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionConfig,
    /// Authentication settings
    pub auth: AuthConfig,
}

impl Config {
    /// Create a config that logs in with username and password against the local provider.
    pub fn with_password(appliance_url: String, username: String, password: SecretString) -> Self {
        Self {
            connection: ConnectionConfig::new(appliance_url),
            auth: AuthConfig {
                strategy: AuthStrategy::Password {
                    username,
                    password,
                    provider: DEFAULT_LOCAL_PROVIDER.to_string(),
                },
            },
        }
    }

    /// Create a config that reuses an exported session token.
    pub fn with_access_token(appliance_url: String, token: SecretString) -> Self {
        Self {
            connection: ConnectionConfig::new(appliance_url),
            auth: AuthConfig {
                strategy: AuthStrategy::AccessToken { token },
            },
        }
    }
}
