//! Configuration loader builder implementation.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` for hierarchical configuration merging.
//! - Build the final `Config`, choosing the authentication strategy.
//!
//! Does NOT handle:
//! - Direct environment variable parsing logic (delegated to env.rs).
//!
//! Invariants / Assumptions:
//! - Builder methods take precedence over environment variables (call them after `from_env`).
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.
//! - The `DOTENV_DISABLED` variable is checked before `dotenvy::dotenv()` is called.
//! - Strategy precedence: access token > certificate > password > interactive.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

use super::env::apply_env;
use super::error::ConfigError;
use crate::constants::{
    DEFAULT_CERTIFICATE_PROVIDER, DEFAULT_LOCAL_PROVIDER, DEFAULT_REDIRECT_PORT,
    MAX_SESSION_TTL_SECS, MAX_TIMEOUT_SECS,
};
use crate::types::{AuthConfig, AuthStrategy, Config, ConnectionConfig, leader_cache_from_secs};

/// Configuration loader that builds config from environment variables and overrides.
#[derive(Default)]
pub struct ConfigLoader {
    appliance_url: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    provider: Option<String>,
    certificate_path: Option<PathBuf>,
    certificate_password: Option<SecretString>,
    certificate_provider: Option<String>,
    access_token: Option<SecretString>,
    interactive: Option<bool>,
    redirect_port: Option<u16>,
    skip_verify: Option<bool>,
    timeout: Option<Duration>,
    api_version: Option<String>,
    leader_cache_secs: Option<i64>,
    session_ttl_seconds: Option<u64>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var("DOTENV_DISABLED").ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from .env file if present.
    ///
    /// Missing `.env` files are silently ignored.
    ///
    /// SAFETY: Error messages never include raw .env line contents to prevent secret leakage.
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }

        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(dotenvy::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                Ok(self)
            }
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    /// Read configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        apply_env(&mut self)?;
        Ok(self)
    }

    /// Set the appliance URL.
    pub fn with_appliance_url(mut self, url: String) -> Self {
        self.appliance_url = Some(url);
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the identity provider scope used for password logins.
    pub fn with_provider(mut self, provider: String) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the client certificate bundle path.
    pub fn with_certificate_path(mut self, path: PathBuf) -> Self {
        self.certificate_path = Some(path);
        self
    }

    /// Set the client certificate bundle passphrase.
    pub fn with_certificate_password(mut self, password: String) -> Self {
        self.certificate_password = Some(SecretString::new(password.into()));
        self
    }

    /// Set an exported session token to reuse.
    pub fn with_access_token(mut self, token: String) -> Self {
        self.access_token = Some(SecretString::new(token.into()));
        self
    }

    /// Request interactive browser login.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = Some(interactive);
        self
    }

    /// Set the local port that receives the OAuth redirect.
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = Some(port);
        self
    }

    /// Set whether to skip TLS verification.
    pub fn with_skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = Some(skip);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the API version segment.
    pub fn with_api_version(mut self, version: String) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Set how long a discovered cluster leader stays cached.
    pub fn with_leader_cache(mut self, duration: Duration) -> Self {
        self.leader_cache_secs = Some(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX));
        self
    }

    /// Keep a discovered cluster leader until the process exits.
    pub fn with_leader_cache_forever(mut self) -> Self {
        self.leader_cache_secs = Some(-1);
        self
    }

    pub(super) fn set_appliance_url(&mut self, url: Option<String>) {
        self.appliance_url = url;
    }

    pub(super) fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub(super) fn set_password(&mut self, password: Option<SecretString>) {
        self.password = password;
    }

    pub(super) fn set_provider(&mut self, provider: Option<String>) {
        self.provider = provider;
    }

    pub(super) fn set_certificate_path(&mut self, path: Option<PathBuf>) {
        self.certificate_path = path;
    }

    pub(super) fn set_certificate_password(&mut self, password: Option<SecretString>) {
        self.certificate_password = password;
    }

    pub(super) fn set_certificate_provider(&mut self, provider: Option<String>) {
        self.certificate_provider = provider;
    }

    pub(super) fn set_access_token(&mut self, token: Option<SecretString>) {
        self.access_token = token;
    }

    pub(super) fn set_interactive(&mut self, interactive: Option<bool>) {
        self.interactive = interactive;
    }

    pub(super) fn set_redirect_port(&mut self, port: Option<u16>) {
        self.redirect_port = port;
    }

    pub(super) fn set_skip_verify(&mut self, skip: Option<bool>) {
        self.skip_verify = skip;
    }

    pub(super) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub(super) fn set_api_version(&mut self, version: Option<String>) {
        self.api_version = version;
    }

    pub(super) fn set_leader_cache_secs(&mut self, secs: Option<i64>) {
        self.leader_cache_secs = secs;
    }

    pub(super) fn set_session_ttl_seconds(&mut self, ttl: Option<u64>) {
        self.session_ttl_seconds = ttl;
    }

    fn validate_appliance_url(url: &str) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(url).map_err(|e| ConfigError::InvalidApplianceUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::InvalidApplianceUrl {
                url: url.to_string(),
                message: format!("unsupported protocol '{other}'"),
            }),
        }
    }

    fn select_strategy(&mut self) -> Result<AuthStrategy, ConfigError> {
        if let Some(token) = self.access_token.take() {
            return Ok(AuthStrategy::AccessToken { token });
        }
        if let Some(path) = self.certificate_path.take() {
            return Ok(AuthStrategy::Certificate {
                path,
                password: self.certificate_password.take(),
                provider: self
                    .certificate_provider
                    .take()
                    .unwrap_or_else(|| DEFAULT_CERTIFICATE_PROVIDER.to_string()),
            });
        }
        if let Some(username) = self.username.take() {
            let password = self.password.take().ok_or(ConfigError::MissingPassword)?;
            return Ok(AuthStrategy::Password {
                username,
                password,
                provider: self
                    .provider
                    .take()
                    .unwrap_or_else(|| DEFAULT_LOCAL_PROVIDER.to_string()),
            });
        }
        if self.interactive == Some(true) {
            return Ok(AuthStrategy::Interactive {
                redirect_port: self.redirect_port.unwrap_or(DEFAULT_REDIRECT_PORT),
            });
        }
        Err(ConfigError::MissingAuth)
    }

    /// Build the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApplianceUrl`] or [`ConfigError::MissingAuth`]
    /// when required settings are absent, and validation errors for out-of-range values.
    pub fn build(mut self) -> Result<Config, ConfigError> {
        let appliance_url = self
            .appliance_url
            .take()
            .ok_or(ConfigError::MissingApplianceUrl)?;
        Self::validate_appliance_url(&appliance_url)?;

        let strategy = self.select_strategy()?;

        let mut connection = ConnectionConfig::new(appliance_url);
        if let Some(skip) = self.skip_verify {
            connection.skip_verify = skip;
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() || timeout.as_secs() > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidTimeout {
                    message: format!(
                        "must be between 1 and {} seconds (got {})",
                        MAX_TIMEOUT_SECS,
                        timeout.as_secs()
                    ),
                });
            }
            connection.timeout = timeout;
        }
        if let Some(version) = self.api_version {
            connection.api_version = version;
        }
        if let Some(secs) = self.leader_cache_secs {
            connection.leader_cache = leader_cache_from_secs(secs);
        }
        if let Some(ttl) = self.session_ttl_seconds {
            if ttl == 0 || ttl > MAX_SESSION_TTL_SECS {
                return Err(ConfigError::InvalidSessionTtl {
                    message: format!(
                        "must be between 1 and {} seconds (got {})",
                        MAX_SESSION_TTL_SECS, ttl
                    ),
                });
            }
            connection.session_ttl_seconds = ttl;
        }

        tracing::debug!(
            appliance = %connection.appliance_url,
            strategy = strategy.label(),
            "Configuration loaded"
        );

        Ok(Config {
            connection,
            auth: AuthConfig { strategy },
        })
    }
}
