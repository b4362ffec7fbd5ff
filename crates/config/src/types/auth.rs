//! Authentication types for Safeguard configuration.
//!
//! Responsibilities:
//! - Define the login strategies the appliance accepts (password, certificate,
//!   interactive browser login, exported access token).
//! - Handle serialization of secret values.
//!
//! Does NOT handle:
//! - Actual authentication flow or token exchange (see client crate).
//!
//! Invariants:
//! - All secret values use `secrecy::SecretString` to prevent accidental logging.
//! - Serialization includes secrets; secrecy is for runtime safety.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Module for serializing SecretString as strings.
mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize as DeserializeTrait, Serialize as SerializeTrait};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        secret.expose_secret().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString::new(s.into()))
    }
}

/// Module for serializing an optional SecretString.
mod optional_secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        secret
            .as_ref()
            .map(|s| s.expose_secret().to_string())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(|s| SecretString::new(s.into())))
    }
}

/// Strategy for authenticating with the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthStrategy {
    /// Username and password against an identity provider (resource owner grant).
    #[serde(rename = "password")]
    Password {
        username: String,
        #[serde(with = "secret_string")]
        password: SecretString,
        /// Identity provider scope, usually `local`.
        provider: String,
    },
    /// Client certificate from a PKCS#12 or PEM bundle (client credentials grant).
    #[serde(rename = "certificate")]
    Certificate {
        path: PathBuf,
        #[serde(default, with = "optional_secret_string")]
        password: Option<SecretString>,
        provider: String,
    },
    /// Browser login using the authorization code flow with PKCE.
    #[serde(rename = "interactive")]
    Interactive { redirect_port: u16 },
    /// A previously exported session token.
    #[serde(rename = "token")]
    AccessToken {
        #[serde(with = "secret_string")]
        token: SecretString,
    },
}

impl AuthStrategy {
    /// Short label for logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Certificate { .. } => "certificate",
            Self::Interactive { .. } => "interactive",
            Self::AccessToken { .. } => "token",
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The authentication strategy to use.
    #[serde(flatten)]
    pub strategy: AuthStrategy,
}
