//! Configuration type definitions for the Safeguard access layer.
//!
//! Responsibilities:
//! - Define configuration types for authentication and appliance connections.
//! - Provide serialization helpers for sensitive types (secrets, durations).
//!
//! Does NOT handle:
//! - Configuration loading from files or environment variables (see `loader` module).
//! - Actual network connections or authentication flows (see client crate).
//!
//! Invariants:
//! - All secret types use `secrecy::SecretString` to prevent accidental logging.
//! - Serialization helpers (`secret_string`, `duration_seconds`, `leader_cache_seconds`) are private modules.

mod auth;
pub(crate) mod connection;

pub use auth::{AuthConfig, AuthStrategy};
pub use connection::{Config, ConnectionConfig, leader_cache_from_secs};
