//! Tests for the configuration loader.
//!
//! Invariants:
//! - Tests use `serial_test` and `global_test_lock()` to prevent environment variable pollution.
//! - Every test clears all `SAFEGUARD_*` variables it does not set explicitly.

use std::sync::Mutex;


/// Returns the global test lock for environment variable isolation.
pub fn env_lock() -> &'static Mutex<()> {
    crate::test_util::global_test_lock()
}

/// Every variable the loader reads, unset.
pub fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
    [
        "SAFEGUARD_APPLIANCE_URL",
        "SAFEGUARD_USERNAME",
        "SAFEGUARD_PASSWORD",
        "SAFEGUARD_PROVIDER",
        "SAFEGUARD_CERT_PATH",
        "SAFEGUARD_CERT_PASSWORD",
        "SAFEGUARD_CERT_PROVIDER",
        "SAFEGUARD_ACCESS_TOKEN",
        "SAFEGUARD_INTERACTIVE",
        "SAFEGUARD_REDIRECT_PORT",
        "SAFEGUARD_SKIP_VERIFY",
        "SAFEGUARD_TIMEOUT",
        "SAFEGUARD_API_VERSION",
        "SAFEGUARD_LEADER_CACHE_SECS",
        "SAFEGUARD_SESSION_TTL",
    ]
    .into_iter()
    .map(|key| (key, None))
    .collect()
}

/// `cleared_env()` with the given overrides applied.
pub fn env_with(
    vars: &[(&'static str, &'static str)],
) -> Vec<(&'static str, Option<&'static str>)> {
    let mut env = cleared_env();
    for (key, value) in vars {
        if let Some(entry) = env.iter_mut().find(|(k, _)| k == key) {
            entry.1 = Some(value);
        }
    }
    env
}
