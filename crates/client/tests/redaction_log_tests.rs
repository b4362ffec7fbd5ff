//! Diagnostic logs never carry credentials or checked-out secrets.

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};

use common::*;
use safeguard_client::{AccessRequest, CancellationToken, SafeguardClient, WaitOptions};
use secrecy::{ExposeSecret, SecretString};
use tracing::Level;

const USER_TOKEN: &str = "appliance-user-token-9a8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d";
const RSTS_TOKEN: &str = "rsts-access-token-4f1c2d9e8b7a6f5e4d3c2b1a";
const PASSWORD: &str = "hunter2-very-secret";
const CHECKED_OUT: &str = "Pa$$w0rd-42";

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_debug_logs_hide_tokens_and_secrets() {
    let server = MockServer::start().await;
    mount_token_exchange(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{CORE}/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("identity/me.json")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{CORE}/AccessRequests/42/CheckOutPassword")))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("\"{CHECKED_OUT}\"")))
        .mount(&server)
        .await;

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = SafeguardClient::builder()
        .appliance_url(server.uri())
        .build()
        .unwrap();
    client
        .login_password(
            "admin",
            SecretString::new(PASSWORD.to_string().into()),
            "local",
        )
        .await
        .unwrap();
    client.me().await.unwrap();

    let request: AccessRequest =
        serde_json::from_value(load_fixture("access_requests/available.json")).unwrap();
    client
        .check_out_password(&request, &WaitOptions::default(), &CancellationToken::new())
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("Sending request"), "nothing captured: {output}");
    assert!(!output.contains(USER_TOKEN));
    assert!(!output.contains(RSTS_TOKEN));
    assert!(!output.contains(PASSWORD));
    assert!(!output.contains(CHECKED_OUT));

    // Ordinary JSON bodies are still visible for debugging.
    assert!(output.contains("alice@example.com"));
    assert!(output.contains("appl...5c4d"));
}

#[tokio::test]
async fn test_checkout_secret_with_quotes_and_spaces_is_hidden() {
    for secret in [r#""Zq7\"Lm9xT2""#, r#""correct horse battery""#] {
        let server = MockServer::start().await;
        mount_token_exchange(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{CORE}/AccessRequests/42/CheckOutPassword")))
            .respond_with(ResponseTemplate::new(200).set_body_string(secret))
            .mount(&server)
            .await;

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = SafeguardClient::builder()
            .appliance_url(server.uri())
            .build()
            .unwrap();
        client
            .login_password(
                "admin",
                SecretString::new(PASSWORD.to_string().into()),
                "local",
            )
            .await
            .unwrap();

        let request: AccessRequest =
            serde_json::from_value(load_fixture("access_requests/available.json")).unwrap();
        let password = client
            .check_out_password(&request, &WaitOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            password.expose_secret(),
            serde_json::from_str::<String>(secret).unwrap()
        );

        let output = logs.contents();
        assert!(output.contains("Received response"), "nothing captured: {output}");
        assert!(!output.contains("Lm9xT2"), "secret logged: {output}");
        assert!(!output.contains("horse"), "secret logged: {output}");
    }
}
