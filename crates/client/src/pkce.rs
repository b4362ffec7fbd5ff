//! Authorization code flow with PKCE.
//!
//! Responsibilities:
//! - Generate the code verifier and S256 challenge.
//! - Build the browser authorization URL.
//! - Accept exactly one OAuth redirect on a local port and extract the code.
//! - Open the system browser.
//!
//! Invariants:
//! - The verifier is 32 random bytes, base64url encoded without padding.
//! - The listener answers one request and then closes; a second browser hit
//!   gets a refused connection.

use std::fmt;
use std::process::Stdio;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use crate::error::{ClientError, Result};

/// Longest request line accepted from the browser.
const MAX_REQUEST_LINE: usize = 8 * 1024;

/// Code verifier and its derived challenge.
pub struct PkcePair {
    verifier: SecretString,
    challenge: String,
}

impl fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkcePair")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

impl PkcePair {
    /// Fresh random verifier.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = challenge_for(&verifier);
        Self {
            verifier: SecretString::new(verifier.into()),
            challenge,
        }
    }

    pub fn verifier(&self) -> &str {
        self.verifier.expose_secret()
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// `base64url(SHA-256(verifier))`.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Redirect target for a local listener port.
pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}/")
}

/// Browser URL that starts the authorization code flow.
pub fn authorization_url(appliance: &str, challenge: &str, redirect_uri: &str) -> Result<Url> {
    let base = format!("{}/RSTS/Login", appliance.trim_end_matches('/'));
    Url::parse_with_params(
        &base,
        &[
            ("response_type", "code"),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge),
            ("redirect_uri", redirect_uri),
        ],
    )
    .map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))
}

/// Local listener that receives the OAuth redirect.
#[derive(Debug)]
pub struct RedirectListener {
    listener: TcpListener,
    port: u16,
}

impl RedirectListener {
    /// Bind `127.0.0.1:<port>`. Port 0 picks a free port.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        redirect_uri(self.port)
    }

    /// Accept one request and return its authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AuthFailed`] when the redirect carries an OAuth
    /// error or no code, and [`ClientError::Io`] when the listener fails.
    pub async fn accept_code(self) -> Result<String> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::debug!(%peer, "Received OAuth redirect connection");

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half).take(MAX_REQUEST_LINE as u64);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;

        let outcome = parse_redirect(&request_line);
        let (status, body) = match &outcome {
            Ok(_) => ("200 OK", "Login complete. You may close this window."),
            Err(_) => ("400 Bad Request", "Login failed. Return to the terminal for details."),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        write_half.write_all(response.as_bytes()).await?;
        write_half.shutdown().await?;

        outcome
    }
}

/// Extract the authorization code from an HTTP request line.
pub fn parse_redirect(request_line: &str) -> Result<String> {
    let mut parts = request_line.split_whitespace();
    let target = match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => target,
        _ => return Err(ClientError::AuthFailed("malformed redirect request".to_string())),
    };

    let url = Url::parse(&format!("http://localhost{target}"))
        .map_err(|_| ClientError::AuthFailed("malformed redirect target".to_string()))?;

    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (_, Some(error)) => Err(ClientError::AuthFailed(match description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        })),
        (Some(code), None) if !code.is_empty() => Ok(code),
        _ => Err(ClientError::AuthFailed(
            "redirect did not include an authorization code".to_string(),
        )),
    }
}

/// Opens URLs for the interactive login.
pub trait BrowserLauncher: Send + Sync + fmt::Debug {
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        #[cfg(target_os = "macos")]
        let mut command = {
            let mut c = std::process::Command::new("open");
            c.arg(url);
            c
        };
        #[cfg(windows)]
        let mut command = {
            let mut c = std::process::Command::new("cmd");
            c.args(["/C", "start", ""]).arg(url);
            c
        };
        #[cfg(all(unix, not(target_os = "macos")))]
        let mut command = {
            let mut c = std::process::Command::new("xdg-open");
            c.arg(url);
            c
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
