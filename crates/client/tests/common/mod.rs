//! Common test utilities for integration tests.
//!
//! This module provides shared helper functions and re-exports commonly used
//! types for testing the Safeguard client. All integration tests should use
//! these utilities to ensure consistency.
//!
//! # Invariants
//! - Fixtures are loaded from the `fixtures/` directory relative to the crate root
//! - The mock appliance is reached as `127.0.0.1:<port>`; the derived cluster
//!   leader is the same server reached as `localhost:<port>`
//!
//! # What this does NOT handle
//! - Test-specific assertions or test logic

use std::time::Duration;

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509Builder, X509NameBuilder};

// Re-export test utilities from safeguard-client
#[allow(unused_imports)]
pub use safeguard_client::testing::{TEST_SESSION_TOKEN, load_fixture, session_client};

// Re-export commonly used types for test convenience
#[allow(unused_imports)]
pub use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

/// REST prefix for the default API version.
#[allow(dead_code)]
pub const CORE: &str = "/service/core/v4";

/// `Host` header value for requests sent to the appliance origin.
#[allow(dead_code)]
pub fn appliance_host(server: &MockServer) -> String {
    format!("127.0.0.1:{}", server.address().port())
}

/// `Host` header value for requests sent to the derived leader origin.
#[allow(dead_code)]
pub fn leader_host(server: &MockServer) -> String {
    format!("localhost:{}", server.address().port())
}

/// Mount the identity provider token endpoint and the token exchange.
#[allow(dead_code)]
pub async fn mount_token_exchange(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/RSTS/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("auth/rsts_token.json")))
        .mount(server)
        .await;
    mount_login_response(server).await;
}

/// Mount only the `Token/LoginResponse` exchange.
#[allow(dead_code)]
pub async fn mount_login_response(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{CORE}/Token/LoginResponse")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("auth/login_response.json")),
        )
        .mount(server)
        .await;
}

/// Mount the leader lookup returning `localhost` as leader.
#[allow(dead_code)]
pub async fn mount_cluster_members(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{CORE}/Cluster/Members")))
        .and(query_param("filter", "IsLeader eq true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("cluster/members.json")),
        )
        .mount(server)
        .await;
}

/// Number of requests the server received for `request_path`.
#[allow(dead_code)]
pub async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

/// Poll `request_count` until it reaches `at_least` or `deadline` passes.
#[allow(dead_code)]
pub async fn wait_for_requests(
    server: &MockServer,
    request_path: &str,
    at_least: usize,
    deadline: Duration,
) -> usize {
    let started = tokio::time::Instant::now();
    loop {
        let count = request_count(server, request_path).await;
        if count >= at_least || started.elapsed() >= deadline {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Write a fresh PKCS#12 bundle to a temp file and return its path.
#[allow(dead_code)]
pub fn write_pkcs12_bundle(password: &str) -> std::path::PathBuf {
    let key: PKey<Private> = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "svc-account").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert: X509 = builder.build();

    let der = Pkcs12::builder()
        .name("svc-account")
        .pkey(&key)
        .cert(&cert)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap();

    let file = std::env::temp_dir().join(format!(
        "safeguard-client-test-{}-{}.pfx",
        std::process::id(),
        rand_suffix()
    ));
    std::fs::write(&file, der).unwrap();
    file
}

#[allow(dead_code)]
fn rand_suffix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}
