//! Waiting for and checking out access request secrets.
//!
//! A request is classified by its state string:
//! - terminal: fails at once, whatever the caller asked for
//! - pending: fails at once unless the caller opted to wait, then polls
//!   `AccessRequests/<id>` on a fixed interval
//! - retrievable: exactly one `CheckOutPassword` call
//!
//! A deadline fires [`ClientError::Timeout`]; cancellation fires
//! [`ClientError::Cancelled`].

use std::time::Duration;

use safeguard_config::constants::{DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::client::SafeguardClient;
use crate::client::binding::Bound;
use crate::error::{ClientError, Result};
use crate::models::{AccessRequest, RequestPhase};

/// How long and how often to wait for a pending request.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Poll pending requests instead of failing immediately.
    pub wait: bool,
    /// Deadline for the whole wait.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            wait: true,
            timeout: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Fail immediately on pending requests.
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn request_path(id: &str) -> String {
    format!("AccessRequests/{id}")
}

impl SafeguardClient {
    /// Fetch one access request, bound to this client.
    pub async fn get_access_request(&self, id: &str) -> Result<Bound<'_, AccessRequest>> {
        let request: AccessRequest = self.get_json(&request_path(id)).await?;
        Ok(Bound::new(self, request))
    }

    /// Check out the password an access request grants.
    ///
    /// # Errors
    ///
    /// - [`ClientError::RequestTerminal`] for terminal requests, with no call made
    /// - [`ClientError::RequestNotReady`] for pending requests when `options.wait` is false
    /// - [`ClientError::Timeout`] when the deadline passes while pending
    /// - [`ClientError::Cancelled`] when `cancel` fires while pending
    #[instrument(skip(self, request, options, cancel), fields(id = %request.id, state = %request.state))]
    pub async fn check_out_password(
        &self,
        request: &AccessRequest,
        options: &WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<SecretString> {
        let id = match request.phase() {
            RequestPhase::Terminal => {
                return Err(ClientError::RequestTerminal {
                    id: request.id.clone(),
                    state: request.state.clone(),
                });
            }
            RequestPhase::Pending if !options.wait => {
                return Err(ClientError::RequestNotReady {
                    id: request.id.clone(),
                    state: request.state.clone(),
                });
            }
            RequestPhase::Pending => self.wait_until_retrievable(&request.id, options, cancel).await?.id,
            RequestPhase::Retrievable => request.id.clone(),
        };

        self.fetch_password(&id).await
    }

    async fn wait_until_retrievable(
        &self,
        id: &str,
        options: &WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<AccessRequest> {
        info!(
            timeout_secs = options.timeout.as_secs(),
            "Waiting for access request to become available"
        );

        let poll = async {
            loop {
                tokio::time::sleep(options.poll_interval).await;
                let current: AccessRequest = self.get_json(&request_path(id)).await?;
                match current.phase() {
                    RequestPhase::Retrievable => return Ok(current),
                    RequestPhase::Terminal => {
                        return Err(ClientError::RequestTerminal {
                            id: current.id,
                            state: current.state,
                        });
                    }
                    RequestPhase::Pending => {
                        debug!(state = %current.state, "Access request still pending");
                    }
                }
            }
        };

        tokio::select! {
            () = cancel.cancelled() => Err(ClientError::Cancelled),
            waited = tokio::time::timeout(options.timeout, poll) => match waited {
                Ok(outcome) => outcome,
                Err(_) => Err(ClientError::Timeout(options.timeout)),
            },
        }
    }

    async fn fetch_password(&self, id: &str) -> Result<SecretString> {
        let body = self
            .post(&format!("{}/CheckOutPassword", request_path(id)), None)
            .await?;
        parse_password(&body).map(|password| SecretString::new(password.into()))
    }
}

/// The body is a JSON string; plain text is accepted as a fallback.
fn parse_password(body: &[u8]) -> Result<String> {
    let password = match serde_json::from_slice::<String>(body) {
        Ok(password) => password,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    };
    if password.is_empty() {
        return Err(ClientError::InvalidResponse(
            "checkout returned an empty password".to_string(),
        ));
    }
    Ok(password)
}
