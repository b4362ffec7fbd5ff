//! Testing utilities for Safeguard client tests.
//!
//! Available when running tests or when the `test-utils` feature is enabled.
//!
//! # Example
//! ```ignore
//! use safeguard_client::testing::{load_fixture, session_client};
//!
//! let body = load_fixture("access_requests/available.json");
//! let client = session_client(&server.uri());
//! ```

use std::path::Path;
use std::time::Duration;

use proptest::prelude::*;
use secrecy::SecretString;

use crate::client::SafeguardClient;

/// Session token installed by [`session_client`].
pub const TEST_SESSION_TOKEN: &str = "test-session-token-0123456789abcdefghijklmnop";

/// Load a JSON fixture file from the fixtures directory.
///
/// # Arguments
/// * `fixture_path` - Relative path within the fixtures directory (e.g., "auth/rsts_token.json")
///
/// # Panics
/// - If the fixture file cannot be read
/// - If the file content is not valid JSON
pub fn load_fixture(fixture_path: &str) -> serde_json::Value {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let full_path = manifest_dir.join("fixtures").join(fixture_path);
    let content = std::fs::read_to_string(&full_path)
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", full_path.display()));
    serde_json::from_str(&content).expect("Invalid JSON in fixture")
}

/// Client for `appliance_url` that already holds [`TEST_SESSION_TOKEN`].
///
/// # Panics
/// If the URL does not parse.
pub fn session_client(appliance_url: &str) -> SafeguardClient {
    let client = SafeguardClient::builder()
        .appliance_url(appliance_url)
        .build()
        .expect("test client should build");
    client.session_store().set_session_token(
        SecretString::new(TEST_SESSION_TOKEN.to_string().into()),
        Duration::from_secs(3600),
    );
    client
}

/// Hostname labels accepted by [`crate::origin::Origin::parse`].
pub fn host_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,14}[a-z0-9]"
}

/// Dotted domain suffixes of one to three labels.
pub fn domain_suffix() -> impl Strategy<Value = String> {
    prop::collection::vec(host_label(), 1..=3).prop_map(|labels| labels.join("."))
}
