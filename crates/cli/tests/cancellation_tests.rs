//! Integration tests for graceful Ctrl+C/SIGINT handling.
//!
//! These tests are Unix-only because they send SIGINT to child process.
//! We assert:
//! - exit code is 130
//! - stderr contains cancellation message

#![cfg(unix)]

mod common;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use tokio::sync::Notify;

fn safeguard_cli_bin() -> &'static std::path::Path {
    assert_cmd::cargo::cargo_bin!("safeguard-cli")
}

fn send_sigint(pid: u32) {
    // SAFETY: standard Unix kill syscall
    unsafe {
        libc::kill(pid as i32, libc::SIGINT);
    }
}

async fn run_until_sigint(server: &MockServer, args: &[&str], request_seen: Arc<Notify>) {
    let child = tokio::process::Command::new(safeguard_cli_bin())
        .env("DOTENV_DISABLED", "1")
        .env("SAFEGUARD_APPLIANCE_URL", server.uri())
        .env("SAFEGUARD_ACCESS_TOKEN", "test-token")
        .env_remove("SAFEGUARD_USERNAME")
        .env_remove("SAFEGUARD_CERT_PATH")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn safeguard-cli");

    let pid = child.id().expect("child pid");
    tokio::time::timeout(Duration::from_secs(5), request_seen.notified())
        .await
        .expect("expected a request before SIGINT");
    send_sigint(pid);

    let output = tokio::time::timeout(Duration::from_secs(5), child.wait_with_output())
        .await
        .expect("process should exit promptly")
        .expect("wait_with_output ok");

    assert_eq!(output.status.code(), Some(130));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Operation cancelled by user"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_checkout_wait_ctrl_c_exits_130_with_message() {
    let server = MockServer::start().await;
    mount_me(&server).await;

    // The request never leaves PendingApproval; signal once polling has started.
    let request_seen = Arc::new(Notify::new());
    let request_seen_clone = Arc::clone(&request_seen);
    let pending = load_fixture("access_requests/pending.json");
    Mock::given(method("GET"))
        .and(path(format!("{CORE}/AccessRequests/42")))
        .respond_with(move |_req: &wiremock::Request| {
            request_seen_clone.notify_one();
            ResponseTemplate::new(200).set_body_json(pending.clone())
        })
        .mount(&server)
        .await;

    run_until_sigint(
        &server,
        &["checkout", "42", "--wait-timeout", "60", "--poll-interval-ms", "100"],
        request_seen,
    )
    .await;
}

#[tokio::test]
async fn test_events_ctrl_c_exits_130_with_message() {
    let server = MockServer::start().await;
    mount_me(&server).await;

    // Hold the feed open without sending anything.
    let request_seen = Arc::new(Notify::new());
    let request_seen_clone = Arc::clone(&request_seen);
    Mock::given(method("GET"))
        .and(path("/service/event/signalr"))
        .respond_with(move |_req: &wiremock::Request| {
            request_seen_clone.notify_one();
            ResponseTemplate::new(200).set_delay(Duration::from_secs(60))
        })
        .mount(&server)
        .await;

    run_until_sigint(&server, &["events"], request_seen).await;
}
