//! Error types for the Safeguard client.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The caller could not be authenticated.
    Authentication,
    /// The appliance answered with a non-success status or an unexpected body.
    Protocol,
    /// An access request is in a state that cannot yield a secret.
    State,
    /// A deadline elapsed.
    Timeout,
    /// Local configuration is unusable.
    Configuration,
    /// The caller cancelled the operation.
    Cancelled,
}

impl ErrorKind {
    /// Returns the string label for this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Protocol => "protocol",
            ErrorKind::State => "state",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Errors that can occur during Safeguard client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API error response from the appliance.
    #[error("API error ({status}) at {url}: {message}")]
    ApiError {
        status: u16,
        url: String,
        message: String,
    },

    /// No session token is available.
    #[error("Not logged in or session expired, please re-authenticate")]
    SessionExpired,

    /// The access request reached a state that can never yield a secret.
    #[error("Access request {id} is {state} and cannot be checked out")]
    RequestTerminal { id: String, state: String },

    /// The access request is still pending and the caller declined to wait.
    #[error("Access request {id} is not ready ({state})")]
    RequestNotReady { id: String, state: String },

    /// Invalid response format from the appliance.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// A deadline elapsed.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL scheme other than http or https.
    #[error("Unsupported protocol '{0}'")]
    UnsupportedProtocol(String),

    /// The certificate bundle could not be used.
    #[error("Certificate bundle error: {0}")]
    CertificateBundle(String),

    /// Cryptographic library failure while reading a certificate bundle.
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    /// Only one event subscription may run per client.
    #[error("An event subscription is already active")]
    SubscriptionActive,

    /// A configured default header is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Local I/O failure (certificate files, redirect listener).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailed(_) | Self::SessionExpired => ErrorKind::Authentication,
            Self::HttpError(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::HttpError(_) | Self::Io(_) => ErrorKind::Transport,
            Self::ApiError { status, .. } if *status == 401 => ErrorKind::Authentication,
            Self::ApiError { .. } | Self::InvalidResponse(_) => ErrorKind::Protocol,
            Self::RequestTerminal { .. }
            | Self::RequestNotReady { .. }
            | Self::SubscriptionActive => ErrorKind::State,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TlsError(_)
            | Self::InvalidUrl(_)
            | Self::UnsupportedProtocol(_)
            | Self::CertificateBundle(_)
            | Self::InvalidHeader(_)
            | Self::OpenSsl(_) => ErrorKind::Configuration,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => Self::is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if an HTTP status code is retryable.
    ///
    /// 429, 502, 503 and 504 are transient; everything else fails immediately.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 502 | 503 | 504)
    }

    /// Check if this error indicates authentication failure.
    pub fn is_auth_error(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}
