//! CLI exit codes for scripting and automation.
//!
//! Responsibilities:
//! - Define structured exit codes that scripts can use to distinguish error types.
//! - Map ClientError variants to appropriate exit codes.
//!
//! Does NOT handle:
//! - Error message formatting (handled by anyhow Display).
//! - Signal handling (see cancellation.rs for SIGINT handling).
//!
//! Invariants:
//! - Exit codes 1-9 are reserved for specific error categories.
//! - Exit code 130 is reserved for SIGINT (Unix standard: 128 + SIGINT).

use safeguard_client::{ClientError, ErrorKind};

/// Structured exit codes for safeguard-cli.
///
/// These codes enable scripts to distinguish between different failure modes
/// and take appropriate action (retry, refresh credentials, fail fast, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success - command completed successfully.
    Success = 0,

    /// General error - unhandled or generic failure.
    GeneralError = 1,

    /// Authentication failure - rejected credentials or expired session.
    ///
    /// Scripts should refresh credentials or prompt for re-authentication.
    AuthenticationFailed = 2,

    /// Connection error - network, timeout, or DNS failure.
    ///
    /// Scripts may retry with exponential backoff.
    ConnectionError = 3,

    /// Resource not found - unknown access request id, etc.
    NotFound = 4,

    /// Configuration error - bad URL, unreadable certificate, invalid option.
    ///
    /// Scripts should fix the input and not retry the same command.
    ConfigurationError = 5,

    /// Permission denied - insufficient privileges.
    PermissionDenied = 6,

    /// The access request cannot yield a secret now (terminal or not yet approved).
    RequestUnavailable = 7,

    /// Service unavailable - HTTP 429/502/503/504.
    ///
    /// Scripts should back off and retry later.
    ServiceUnavailable = 8,

    /// Interrupted - SIGINT/Ctrl+C (Unix standard: 128 + 2).
    Interrupted = 130,
}

impl ExitCode {
    /// Convert the exit code to an i32 for use with std::process::exit().
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }

    /// Returns true if this exit code indicates a retryable condition.
    #[allow(dead_code)]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            ExitCode::ConnectionError | ExitCode::ServiceUnavailable | ExitCode::RequestUnavailable
        )
    }
}

impl From<&ClientError> for ExitCode {
    /// Map ClientError variants to structured exit codes.
    ///
    /// HTTP statuses with a specific meaning are checked first; everything
    /// else follows the error's [`ErrorKind`].
    fn from(err: &ClientError) -> Self {
        if let ClientError::ApiError { status, .. } = err {
            match status {
                403 => return ExitCode::PermissionDenied,
                404 => return ExitCode::NotFound,
                429 | 502 | 503 | 504 => return ExitCode::ServiceUnavailable,
                _ => {}
            }
        }

        match err.kind() {
            ErrorKind::Authentication => ExitCode::AuthenticationFailed,
            ErrorKind::Transport | ErrorKind::Timeout => ExitCode::ConnectionError,
            ErrorKind::State => ExitCode::RequestUnavailable,
            ErrorKind::Configuration => ExitCode::ConfigurationError,
            ErrorKind::Cancelled => ExitCode::Interrupted,
            ErrorKind::Protocol => ExitCode::GeneralError,
        }
    }
}

/// Extension trait for anyhow::Error to extract exit codes.
pub trait ExitCodeExt {
    /// Extract the appropriate exit code from this error.
    ///
    /// Returns ExitCode::GeneralError if no ClientError is in the chain.
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeExt for anyhow::Error {
    fn exit_code(&self) -> ExitCode {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<ClientError>())
            .map(ExitCode::from)
            .unwrap_or(ExitCode::GeneralError)
    }
}
