//! Token endpoint and token exchange response types.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::opt_u64_from_string_or_number;

/// Response from the identity provider token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RstsTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, when the provider reports one.
    #[serde(default, deserialize_with = "opt_u64_from_string_or_number")]
    pub expires_in: Option<u64>,
}

/// Body posted to `Token/LoginResponse`.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    #[serde(rename = "StsAccessToken")]
    pub sts_access_token: &'a str,
}

/// Response from `Token/LoginResponse`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginResponse {
    pub status: String,
    #[serde(default)]
    pub user_token: Option<String>,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}
