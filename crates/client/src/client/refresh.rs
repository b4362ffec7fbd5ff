//! Background session renewal.
//!
//! The refresher waits for the first login, then sleeps until shortly
//! before expiry and logs in again with the stored credential material.
//! A failed renewal is logged and the cycle skipped; the old token stays in
//! place until the next attempt.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::{Credentials, Modality};
use crate::backoff::sleep_or_cancel;
use crate::client::SafeguardClient;
use crate::endpoints::Grant;
use crate::error::Result;

/// How a session is renewed, chosen from the stored credentials.
#[derive(Debug, Clone)]
pub enum RenewalStrategy {
    Password {
        username: String,
        password: SecretString,
        provider: String,
    },
    Certificate {
        path: PathBuf,
        password: Option<SecretString>,
        provider: String,
    },
    /// Interactive and imported sessions need the user to log in again.
    NonRenewable(Modality),
}

/// Result of one renewal attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    Renewed,
    Skipped,
}

impl RenewalStrategy {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        match credentials {
            Credentials::Password {
                username,
                password,
                provider,
            } => RenewalStrategy::Password {
                username: username.clone(),
                password: password.clone(),
                provider: provider.clone(),
            },
            Credentials::Certificate {
                path,
                password,
                provider,
            } => RenewalStrategy::Certificate {
                path: path.clone(),
                password: password.clone(),
                provider: provider.clone(),
            },
            other => RenewalStrategy::NonRenewable(other.modality()),
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            RenewalStrategy::Password { .. } => Modality::Password,
            RenewalStrategy::Certificate { .. } => Modality::Certificate,
            RenewalStrategy::NonRenewable(modality) => *modality,
        }
    }

    /// Log in again with the stored material.
    pub async fn renew(&self, client: &SafeguardClient) -> Result<RenewalOutcome> {
        match self {
            RenewalStrategy::Password {
                username,
                password,
                provider,
            } => {
                let grant = Grant::Password {
                    username,
                    password,
                    provider,
                };
                client
                    .exchange(grant, Credentials::Password {
                        username: username.clone(),
                        password: password.clone(),
                        provider: provider.clone(),
                    })
                    .await?;
            }
            RenewalStrategy::Certificate {
                path,
                password,
                provider,
            } => {
                client
                    .certificate_exchange(path, password.clone(), provider)
                    .await?;
            }
            RenewalStrategy::NonRenewable(modality) => {
                info!(
                    modality = modality.as_str(),
                    "Session cannot be renewed without the user; skipping"
                );
                return Ok(RenewalOutcome::Skipped);
            }
        }
        Ok(RenewalOutcome::Renewed)
    }
}

/// `remaining - margin`, never shorter than `floor`.
pub fn renewal_interval(remaining: TimeDelta, margin: Duration, floor: Duration) -> Duration {
    let margin = TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX);
    remaining
        .checked_sub(&margin)
        .and_then(|wait| wait.to_std().ok())
        .unwrap_or(Duration::ZERO)
        .max(floor)
}

impl SafeguardClient {
    /// Start the background refresher.
    ///
    /// The task idles until the first successful login and stops when
    /// `cancel` fires.
    pub fn spawn_session_refresher(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move { client.run_refresher(cancel).await })
    }

    fn next_renewal_interval(&self) -> Duration {
        let settings = &self.inner.settings;
        renewal_interval(
            self.inner.session.remaining(),
            settings.renewal_margin,
            settings.min_renewal_interval,
        )
    }

    #[instrument(skip_all, name = "session_refresher")]
    async fn run_refresher(&self, cancel: CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Refresher cancelled before login");
                return;
            }
            () = self.inner.auth_finished.wait() => {}
        }

        let mut interval = self.next_renewal_interval();
        debug!(interval_secs = interval.as_secs_f64(), "Session refresher armed");

        loop {
            if sleep_or_cancel(&cancel, interval).await {
                debug!("Session refresher stopped");
                return;
            }

            let Some(credentials) = self.inner.session.credentials() else {
                debug!("No session to renew");
                continue;
            };
            let strategy = RenewalStrategy::from_credentials(&credentials);

            let outcome = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Session refresher stopped during renewal");
                    return;
                }
                outcome = strategy.renew(self) => outcome,
            };

            match outcome {
                Ok(RenewalOutcome::Renewed) => {
                    self.record_renewal(strategy.modality(), true);
                    interval = self.next_renewal_interval();
                    info!(
                        modality = strategy.modality().as_str(),
                        next_secs = interval.as_secs_f64(),
                        "Session renewed"
                    );
                }
                Ok(RenewalOutcome::Skipped) => {}
                Err(e) => {
                    self.record_renewal(strategy.modality(), false);
                    warn!(
                        error = %e,
                        modality = strategy.modality().as_str(),
                        "Session renewal failed; keeping current token until next cycle"
                    );
                }
            }
        }
    }

    fn record_renewal(&self, modality: Modality, success: bool) {
        if let Some(metrics) = self.metrics() {
            metrics.record_renewal(modality.as_str(), success);
        }
    }
}
