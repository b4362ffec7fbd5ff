//! Login flows and session lifecycle on [`SafeguardClient`].
//!
//! Every flow ends in the same exchange: the identity provider token is
//! posted to `Token/LoginResponse` and the returned session token replaces
//! the whole [`SessionState`] in one write.
//!
//! # What this module does NOT handle:
//! - The HTTP shape of the grants (see [`crate::endpoints`])
//! - Scheduling renewals (see `refresh`)
//!
//! # Invariants
//! - The "authentication finished" latch completes only after a session has
//!   been stored.
//! - A failed login leaves any previous session untouched, except for the
//!   access token import which clears its own unverified session.

use std::path::Path;
use std::time::Duration;

use safeguard_config::AuthStrategy;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::auth::{Credentials, SessionState};
use crate::certificate::load_identity;
use crate::client::SafeguardClient;
use crate::endpoints::{self, Grant};
use crate::error::{ClientError, Result};
use crate::models::UserIdentity;
use crate::pkce::{PkcePair, RedirectListener, authorization_url};

impl SafeguardClient {
    /// Log in with the strategy the client was built with.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AuthFailed`] when no strategy was configured,
    /// otherwise whatever the selected flow returns.
    pub async fn login(&self) -> Result<()> {
        let strategy = self
            .inner
            .strategy
            .clone()
            .ok_or_else(|| ClientError::AuthFailed("no authentication strategy configured".to_string()))?;

        match strategy {
            AuthStrategy::Password {
                username,
                password,
                provider,
            } => self.login_password(&username, password, &provider).await,
            AuthStrategy::Certificate {
                path,
                password,
                provider,
            } => self.login_certificate(&path, password, &provider).await,
            AuthStrategy::Interactive { redirect_port } => {
                self.login_interactive(redirect_port).await
            }
            AuthStrategy::AccessToken { token } => self.login_with_access_token(token).await,
        }
    }

    /// Resource owner password login against `provider`.
    #[instrument(skip(self, password))]
    pub async fn login_password(
        &self,
        username: &str,
        password: SecretString,
        provider: &str,
    ) -> Result<()> {
        let grant = Grant::Password {
            username,
            password: &password,
            provider,
        };
        let credentials = Credentials::Password {
            username: username.to_string(),
            password: password.clone(),
            provider: provider.to_string(),
        };
        self.exchange(grant, credentials).await
    }

    /// Client certificate login.
    ///
    /// The grant is sent through a transport carrying the bundle. That
    /// transport replaces the shared one only once the login succeeds, and
    /// then serves every later request.
    #[instrument(skip(self, password), fields(path = %path.display()))]
    pub async fn login_certificate(
        &self,
        path: &Path,
        password: Option<SecretString>,
        provider: &str,
    ) -> Result<()> {
        self.certificate_exchange(path, password, provider).await
    }

    pub(crate) async fn certificate_exchange(
        &self,
        path: &Path,
        password: Option<SecretString>,
        provider: &str,
    ) -> Result<()> {
        let identity = load_identity(path, password.as_ref()).await?;
        let http = self.inner.http_settings.build(Some(identity))?;

        let credentials = Credentials::Certificate {
            path: path.to_path_buf(),
            password,
            provider: provider.to_string(),
        };
        self.exchange_with(&http, Grant::ClientCredentials { provider }, credentials)
            .await?;
        self.replace_http(http);
        Ok(())
    }

    /// Browser login with the authorization code flow and PKCE.
    ///
    /// Binds `127.0.0.1:<redirect_port>` (0 picks a free port), opens the
    /// browser and waits up to the configured interactive timeout for the
    /// redirect.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] when no redirect arrives in time and
    /// [`ClientError::AuthFailed`] when the redirect carries an error or no code.
    #[instrument(skip(self))]
    pub async fn login_interactive(&self, redirect_port: u16) -> Result<()> {
        let appliance = self.appliance_url()?;
        let pkce = PkcePair::generate();
        let listener = RedirectListener::bind(redirect_port).await?;
        let redirect_uri = listener.redirect_uri();
        let url = authorization_url(&appliance, pkce.challenge(), &redirect_uri)?;

        let pending = tokio::spawn(listener.accept_code());

        info!(%redirect_uri, "Waiting for browser login");
        if let Err(e) = self.inner.browser.open(url.as_str()) {
            warn!(error = %e, %url, "Could not open browser; open the URL manually");
        }

        let timeout = self.inner.settings.interactive_timeout;
        let abort = pending.abort_handle();
        let code = match tokio::time::timeout(timeout, pending).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(join)) => {
                return Err(ClientError::AuthFailed(format!(
                    "redirect listener failed: {join}"
                )));
            }
            Err(_) => {
                abort.abort();
                return Err(ClientError::Timeout(timeout));
            }
        };

        let grant = Grant::AuthorizationCode {
            code: &code,
            redirect_uri: &redirect_uri,
            code_verifier: pkce.verifier(),
        };
        self.exchange(grant, Credentials::Interactive).await
    }

    /// Import an exported session token and validate it with a `me` call.
    ///
    /// The imported session cannot be renewed.
    #[instrument(skip(self, token))]
    pub async fn login_with_access_token(&self, token: SecretString) -> Result<()> {
        let state = SessionState::issued_now(
            None,
            token,
            self.inner.settings.session_ttl,
            Credentials::AccessToken,
        );
        self.inner.session.replace(state);

        match self.me().await {
            Ok(identity) => {
                self.inner.auth_finished.complete();
                info!(user = identity.name.as_deref().unwrap_or(identity.id.as_str()), "Imported access token");
                Ok(())
            }
            Err(e) => {
                self.inner.session.clear();
                Err(e)
            }
        }
    }

    /// Run a grant, exchange its token and store the resulting session.
    pub(crate) async fn exchange(&self, grant: Grant<'_>, credentials: Credentials) -> Result<()> {
        self.exchange_with(&self.http(), grant, credentials).await
    }

    async fn exchange_with(
        &self,
        http: &reqwest::Client,
        grant: Grant<'_>,
        credentials: Credentials,
    ) -> Result<()> {
        let appliance = self.appliance_url()?;
        let modality = credentials.modality();

        let raw = endpoints::rsts_token(http, &appliance, grant).await?;
        let session_token = endpoints::login_response(
            http,
            &appliance,
            &self.inner.settings.api_version,
            &raw.access_token,
        )
        .await?;

        let valid_for = raw
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.inner.settings.session_ttl);

        self.inner.session.replace(SessionState::issued_now(
            Some(SecretString::new(raw.access_token.into())),
            session_token,
            valid_for,
            credentials,
        ));
        self.inner.auth_finished.complete();

        info!(
            modality = modality.as_str(),
            valid_for_secs = valid_for.as_secs(),
            "Logged in to appliance"
        );
        Ok(())
    }

    /// The current session token, for `SAFEGUARD_ACCESS_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionExpired`] when there is no session.
    pub fn export_session(&self) -> Result<SecretString> {
        self.inner
            .session
            .session_token()
            .ok_or(ClientError::SessionExpired)
    }

    /// Shell line that exports the current session token.
    pub fn export_session_line(&self) -> Result<String> {
        let token = self.export_session()?;
        Ok(format!(
            "export {}={}",
            safeguard_config::constants::ACCESS_TOKEN_ENV_VAR,
            token.expose_secret()
        ))
    }

    /// Forget the session and its credential material.
    pub fn logout(&self) {
        self.inner.session.clear();
        info!("Logged out");
    }

    /// Identity of the session owner; doubles as a token validation check.
    pub async fn me(&self) -> Result<UserIdentity> {
        self.get_json("me").await
    }
}
