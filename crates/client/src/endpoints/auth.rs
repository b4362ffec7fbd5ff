//! Identity provider token grants and the appliance token exchange.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::endpoints::send_checked;
use crate::error::{ClientError, Result};
use crate::models::{LoginRequest, LoginResponse, RstsTokenResponse};

/// Scope prefix the identity provider expects before a provider id.
const PROVIDER_SCOPE_PREFIX: &str = "rsts:sts:primaryproviderid:";

/// An OAuth grant sent to the identity provider token endpoint.
#[derive(Debug)]
pub enum Grant<'a> {
    /// Resource owner password credentials.
    Password {
        username: &'a str,
        password: &'a SecretString,
        provider: &'a str,
    },
    /// Client credentials; the caller is identified by its TLS certificate.
    ClientCredentials { provider: &'a str },
    /// Authorization code obtained through the browser, with its PKCE verifier.
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
        code_verifier: &'a str,
    },
}

impl Grant<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::ClientCredentials { .. } => "client_credentials",
            Grant::AuthorizationCode { .. } => "authorization_code",
        }
    }

    fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![("grant_type", self.kind().to_string())];
        match self {
            Grant::Password {
                username,
                password,
                provider,
            } => {
                form.push(("username", username.to_string()));
                form.push(("password", password.expose_secret().to_string()));
                form.push(("scope", provider_scope(provider)));
            }
            Grant::ClientCredentials { provider } => {
                form.push(("scope", provider_scope(provider)));
            }
            Grant::AuthorizationCode {
                code,
                redirect_uri,
                code_verifier,
            } => {
                form.push(("code", code.to_string()));
                form.push(("redirect_uri", redirect_uri.to_string()));
                form.push(("code_verifier", code_verifier.to_string()));
            }
        }
        form
    }
}

/// `rsts:sts:primaryproviderid:<provider>`, unless already qualified.
pub fn provider_scope(provider: &str) -> String {
    if provider.starts_with(PROVIDER_SCOPE_PREFIX) {
        provider.to_string()
    } else {
        format!("{PROVIDER_SCOPE_PREFIX}{provider}")
    }
}

/// Request a raw identity provider token.
///
/// # Errors
///
/// A non-success response becomes [`ClientError::AuthFailed`] carrying the
/// status and response detail.
#[instrument(skip(http, grant), fields(grant = grant.kind()))]
pub async fn rsts_token(http: &Client, appliance: &str, grant: Grant<'_>) -> Result<RstsTokenResponse> {
    let url = format!("{appliance}/RSTS/oauth2/token");
    debug!(%url, "Requesting identity provider token");

    let builder = http
        .post(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&grant.form());

    let response = send_checked(builder).await.map_err(|e| match e {
        ClientError::ApiError {
            status, message, ..
        } => ClientError::AuthFailed(format!("identity provider returned {status}: {message}")),
        other => other,
    })?;

    response
        .json::<RstsTokenResponse>()
        .await
        .map_err(|e| ClientError::InvalidResponse(format!("token response: {e}")))
}

/// Exchange a raw identity provider token for an appliance session token.
#[instrument(skip(http, sts_token))]
pub async fn login_response(
    http: &Client,
    appliance: &str,
    api_version: &str,
    sts_token: &str,
) -> Result<SecretString> {
    let url = format!("{appliance}/service/core/{api_version}/Token/LoginResponse");
    let builder = http
        .post(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&LoginRequest {
            sts_access_token: sts_token,
        });

    let response = send_checked(builder).await.map_err(|e| match e {
        ClientError::ApiError {
            status, message, ..
        } => ClientError::AuthFailed(format!("token exchange returned {status}: {message}")),
        other => other,
    })?;

    let login: LoginResponse = response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(format!("login response: {e}")))?;

    if !login.is_success() {
        return Err(ClientError::AuthFailed(format!(
            "token exchange status {}",
            login.status
        )));
    }

    login
        .user_token
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::new(t.into()))
        .ok_or_else(|| ClientError::InvalidResponse("login response has no UserToken".to_string()))
}
