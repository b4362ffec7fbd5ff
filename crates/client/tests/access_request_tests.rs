//! Integration tests for access request checkout and waiting.

mod common;

use std::time::Duration;

use common::*;
use safeguard_client::{AccessRequest, CancellationToken, ClientError, WaitOptions};
use secrecy::ExposeSecret;

const REQUEST: &str = "/service/core/v4/AccessRequests/42";
const CHECKOUT: &str = "/service/core/v4/AccessRequests/42/CheckOutPassword";

fn fixture_request(name: &str) -> AccessRequest {
    serde_json::from_value(load_fixture(&format!("access_requests/{name}.json"))).unwrap()
}

fn fast_wait() -> WaitOptions {
    WaitOptions::default()
        .with_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(20))
}

async fn mount_checkout(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(CHECKOUT))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#""Pa$$w0rd-42""#))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_terminal_request_fails_without_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = session_client(&server.uri());
    let err = client
        .check_out_password(&fixture_request("denied"), &fast_wait(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClientError::RequestTerminal { id, state } => {
            assert_eq!(id, "42");
            assert_eq!(state, "Denied");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_pending_without_wait_is_not_ready() {
    let server = MockServer::start().await;
    mount_checkout(&server, 0).await;

    let client = session_client(&server.uri());
    let err = client
        .check_out_password(
            &fixture_request("pending"),
            &WaitOptions::no_wait(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RequestNotReady { ref state, .. } if state == "PendingApproval"));
}

fn request_in_state(state: &str) -> AccessRequest {
    serde_json::from_value(serde_json::json!({ "Id": "42", "State": state })).unwrap()
}

#[tokio::test]
async fn test_plain_pending_without_wait_is_not_ready() {
    let server = MockServer::start().await;
    mount_checkout(&server, 0).await;

    let client = session_client(&server.uri());
    let err = client
        .check_out_password(
            &request_in_state("Pending"),
            &WaitOptions::no_wait(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RequestNotReady { ref state, .. } if state == "Pending"));
}

#[tokio::test]
async fn test_plain_pending_polls_until_request_available() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Id": "42", "State": "Pending" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "Id": "42", "State": "RequestAvailable" })),
        )
        .mount(&server)
        .await;
    mount_checkout(&server, 1).await;

    let client = session_client(&server.uri());
    let password = client
        .check_out_password(&request_in_state("Pending"), &fast_wait(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(password.expose_secret(), "Pa$$w0rd-42");
    assert_eq!(request_count(&server, REQUEST).await, 2);
}

#[tokio::test]
async fn test_checked_out_request_fetches_once() {
    let server = MockServer::start().await;
    mount_checkout(&server, 1).await;

    let client = session_client(&server.uri());
    let password = client
        .check_out_password(
            &fixture_request("checked_out"),
            &fast_wait(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(password.expose_secret(), "Pa$$w0rd-42");
    assert_eq!(request_count(&server, REQUEST).await, 0);
}

#[tokio::test]
async fn test_pending_request_polls_until_available() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("access_requests/pending.json")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("access_requests/available.json")),
        )
        .mount(&server)
        .await;
    mount_checkout(&server, 1).await;

    let client = session_client(&server.uri());
    let password = client
        .check_out_password(&fixture_request("pending"), &fast_wait(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(password.expose_secret(), "Pa$$w0rd-42");
    assert_eq!(request_count(&server, REQUEST).await, 3);
}

#[tokio::test]
async fn test_request_turning_terminal_while_waiting() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("access_requests/denied.json")))
        .mount(&server)
        .await;
    mount_checkout(&server, 0).await;

    let client = session_client(&server.uri());
    let err = client
        .check_out_password(&fixture_request("pending"), &fast_wait(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RequestTerminal { ref state, .. } if state == "Denied"));
}

#[tokio::test]
async fn test_wait_deadline_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("access_requests/pending.json")))
        .mount(&server)
        .await;
    mount_checkout(&server, 0).await;

    let options = fast_wait().with_timeout(Duration::from_millis(150));
    let client = session_client(&server.uri());
    let err = client
        .check_out_password(&fixture_request("pending"), &options, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_millis(150)));
}

#[tokio::test]
async fn test_cancel_stops_waiting() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("access_requests/pending.json")))
        .mount(&server)
        .await;
    mount_checkout(&server, 0).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let client = session_client(&server.uri());
    let err = client
        .check_out_password(&fixture_request("pending"), &fast_wait(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn test_poll_failure_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "Code": 70000,
            "Message": "Access request not found."
        })))
        .mount(&server)
        .await;

    let client = session_client(&server.uri());
    let err = client
        .check_out_password(&fixture_request("pending"), &fast_wait(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ApiError { status: 404, .. }));
}

#[tokio::test]
async fn test_bound_request_checks_out_through_its_client() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(REQUEST))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("access_requests/available.json")),
        )
        .mount(&server)
        .await;
    mount_checkout(&server, 1).await;

    let client = session_client(&server.uri());
    let request = client.get_access_request("42").await.unwrap();
    assert_eq!(request.state, "RequestAvailable");

    let password = request
        .check_out_password(&fast_wait(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(password.expose_secret(), "Pa$$w0rd-42");

    let refreshed = request.refresh().await.unwrap();
    assert_eq!(refreshed.id, "42");
}
