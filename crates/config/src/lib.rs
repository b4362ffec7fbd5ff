//! Configuration management for the Safeguard access layer.
//!
//! This crate provides types and loaders for managing appliance connection
//! and authentication configuration from `.env` files and environment variables.

pub mod constants;
mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, env_var_or_none};
pub use types::{AuthConfig, AuthStrategy, Config, ConnectionConfig};
