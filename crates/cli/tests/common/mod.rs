//! Shared test utilities for safeguard-cli integration tests.
//!
//! Responsibilities:
//! - Provide a hermetic CLI command factory that prevents dotenv loading.
//! - Mount the appliance endpoints every command touches.
//!
//! Invariants / Assumptions:
//! - All integration tests using this helper will be hermetic by default.
//! - `SAFEGUARD_ACCESS_TOKEN` is set to "test-token" unless overridden, so
//!   every command logs in by importing that token and probing `me`.

use assert_cmd::Command;

#[allow(unused_imports)]
pub use safeguard_client::testing::load_fixture;
#[allow(unused_imports)]
pub use wiremock::matchers::{header, method, path};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

/// REST prefix for the default API version.
#[allow(dead_code)]
pub const CORE: &str = "/service/core/v4";

/// Returns a hermetic `safeguard-cli` command for integration testing.
///
/// It ensures:
/// - `DOTENV_DISABLED=1` is set to prevent local `.env` contamination.
/// - `SAFEGUARD_ACCESS_TOKEN` is set to a dummy value to satisfy config validation.
/// - Other credential env vars are cleared to ensure no leakage from the host.
#[allow(dead_code)]
pub fn safeguard_cmd() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("safeguard-cli");

    cmd.env("DOTENV_DISABLED", "1");
    cmd.env("SAFEGUARD_ACCESS_TOKEN", "test-token");

    cmd.env_remove("SAFEGUARD_APPLIANCE_URL")
        .env_remove("SAFEGUARD_USERNAME")
        .env_remove("SAFEGUARD_PASSWORD")
        .env_remove("SAFEGUARD_CERT_PATH")
        .env_remove("SAFEGUARD_CERT_PASSWORD")
        .env_remove("SAFEGUARD_INTERACTIVE")
        .env_remove("SAFEGUARD_OTLP_ENDPOINT")
        .env_remove("RUST_LOG");

    cmd
}

/// Returns a hermetic `safeguard-cli` command pointed at `appliance_url`.
#[allow(dead_code)]
pub fn safeguard_cmd_with_url(appliance_url: &str) -> Command {
    let mut cmd = safeguard_cmd();
    cmd.env("SAFEGUARD_APPLIANCE_URL", appliance_url);
    cmd
}

/// Mount `me` so the imported test token validates.
#[allow(dead_code)]
pub async fn mount_me(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{CORE}/me")))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("identity/me.json")))
        .mount(server)
        .await;
}

/// Mount `AccessRequests/42` with the given fixture.
#[allow(dead_code)]
pub async fn mount_access_request(server: &MockServer, fixture: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{CORE}/AccessRequests/42")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(load_fixture(&format!("access_requests/{fixture}.json"))),
        )
        .mount(server)
        .await;
}
