//! Error types for configuration loading.
//!
//! Invariants:
//! - All error variants include context for debugging (variable names, values).
//! - Dotenv errors NEVER include raw .env line contents to prevent secret leakage.

use std::io::ErrorKind;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Appliance URL is required. Set SAFEGUARD_APPLIANCE_URL or pass --appliance-url.")]
    MissingApplianceUrl,

    #[error("Invalid appliance URL '{url}': {message}")]
    InvalidApplianceUrl { url: String, message: String },

    #[error(
        "Authentication configuration is required (username/password, certificate, interactive, or access token)"
    )]
    MissingAuth,

    #[error("Password is required when a username is configured")]
    MissingPassword,

    #[error("invalid timeout: {message}")]
    InvalidTimeout { message: String },

    #[error("invalid session TTL configuration: {message}")]
    InvalidSessionTtl { message: String },

    /// SAFETY: only the byte index of the parse failure, never the line content.
    #[error(
        "Failed to parse .env file at position {error_index}. Hint: set DOTENV_DISABLED=1 to skip .env loading"
    )]
    DotenvParse { error_index: usize },

    #[error("Failed to read .env file: {kind}")]
    DotenvIo { kind: ErrorKind },

    #[error("Failed to load .env file. Hint: set DOTENV_DISABLED=1 to skip .env loading")]
    DotenvUnknown,
}
