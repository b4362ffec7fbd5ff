//! Environment variable parsing for configuration.
//!
//! Responsibilities:
//! - Read and parse `SAFEGUARD_*` environment variables.
//! - Apply environment variable values to a ConfigLoader instance.
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed.
//! - Invalid numeric or boolean values return ConfigError::InvalidValue.

use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

use super::builder::ConfigLoader;
use super::error::ConfigError;
use crate::constants::ACCESS_TOKEN_ENV_VAR;

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_env<T: FromStr>(key: &str, message: &str) -> Result<Option<T>, ConfigError> {
    env_var_or_none(key)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                var: key.to_string(),
                message: message.to_string(),
            })
        })
        .transpose()
}

/// Apply environment variable configuration to the loader.
pub fn apply_env(loader: &mut ConfigLoader) -> Result<(), ConfigError> {
    if let Some(url) = env_var_or_none("SAFEGUARD_APPLIANCE_URL") {
        loader.set_appliance_url(Some(url));
    }
    if let Some(username) = env_var_or_none("SAFEGUARD_USERNAME") {
        loader.set_username(Some(username));
    }
    if let Some(password) = env_var_or_none("SAFEGUARD_PASSWORD") {
        loader.set_password(Some(SecretString::new(password.into())));
    }
    if let Some(provider) = env_var_or_none("SAFEGUARD_PROVIDER") {
        loader.set_provider(Some(provider));
    }
    if let Some(path) = env_var_or_none("SAFEGUARD_CERT_PATH") {
        loader.set_certificate_path(Some(path.into()));
    }
    if let Some(password) = env_var_or_none("SAFEGUARD_CERT_PASSWORD") {
        loader.set_certificate_password(Some(SecretString::new(password.into())));
    }
    if let Some(provider) = env_var_or_none("SAFEGUARD_CERT_PROVIDER") {
        loader.set_certificate_provider(Some(provider));
    }
    if let Some(token) = env_var_or_none(ACCESS_TOKEN_ENV_VAR) {
        loader.set_access_token(Some(SecretString::new(token.into())));
    }
    if let Some(interactive) = parse_env("SAFEGUARD_INTERACTIVE", "must be true or false")? {
        loader.set_interactive(Some(interactive));
    }
    if let Some(port) = parse_env("SAFEGUARD_REDIRECT_PORT", "must be a port number")? {
        loader.set_redirect_port(Some(port));
    }
    if let Some(skip) = parse_env("SAFEGUARD_SKIP_VERIFY", "must be true or false")? {
        loader.set_skip_verify(Some(skip));
    }
    if let Some(secs) = parse_env::<u64>("SAFEGUARD_TIMEOUT", "must be a number")? {
        loader.set_timeout(Some(Duration::from_secs(secs)));
    }
    if let Some(version) = env_var_or_none("SAFEGUARD_API_VERSION") {
        loader.set_api_version(Some(version));
    }
    if let Some(secs) = parse_env::<i64>(
        "SAFEGUARD_LEADER_CACHE_SECS",
        "must be a number of seconds (negative disables expiry)",
    )? {
        loader.set_leader_cache_secs(Some(secs));
    }
    if let Some(ttl) = parse_env("SAFEGUARD_SESSION_TTL", "must be a number")? {
        loader.set_session_ttl_seconds(Some(ttl));
    }
    Ok(())
}
