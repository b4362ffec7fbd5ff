//! CLI cancellation utilities.
//!
//! Responsibilities:
//! - Wire Ctrl+C/SIGINT to the shared cancellation token.
//! - Define a single, recognizable `Cancelled` error used to signal user-initiated
//!   cancellation through `anyhow::Result`.
//! - Centralize the cancellation message and the Unix-standard SIGINT exit code (130).
//!
//! Does NOT handle:
//! - Deciding *when* to check for cancellation; command handlers select on the token.
//!
//! Invariants:
//! - Once cancelled, the token remains cancelled forever.
//! - Both `Cancelled` and `ClientError::Cancelled` count as user cancellation.

use std::fmt;

use safeguard_client::{CancellationToken, ClientError};

/// Standard Unix exit code for SIGINT: 128 + 2.
pub const SIGINT_EXIT_CODE: u8 = 130;

/// Cancel `token` on the first Ctrl+C.
pub fn install_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        token.cancel();
    });
}

/// Marker error used to indicate user-driven cancellation.
#[derive(Debug, Clone, Copy)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Returns true if this anyhow error represents a cancellation.
pub fn is_cancelled_error(err: &anyhow::Error) -> bool {
    err.is::<Cancelled>()
        || matches!(err.downcast_ref::<ClientError>(), Some(ClientError::Cancelled))
}

/// Print standard cancellation message to stderr.
pub fn print_cancelled_message() {
    eprintln!("^C\nOperation cancelled by user");
}
