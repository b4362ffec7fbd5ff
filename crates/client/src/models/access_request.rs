//! Access request types and lifecycle classification.
//!
//! Invariants:
//! - [`RequestPhase::classify`] is a pure function of the state string.
//! - State names compare case-insensitively.
//! - A state this client does not recognize is treated as terminal, so an
//!   unexpected appliance state fails fast instead of polling forever.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::serde_helpers::string_from_string_or_number;

const PENDING_STATES: &[&str] = &[
    "New",
    "Pending",
    "PendingApproval",
    "Approved",
    "PendingTimeRequested",
    "PendingAccountRestored",
    "PendingPasswordReset",
    "PendingAccountSuspended",
    "PendingAcknowledgment",
];

const RETRIEVABLE_STATES: &[&str] = &["RequestAvailable", "PasswordCheckedOut"];

const TERMINAL_STATES: &[&str] = &[
    "Complete",
    "Completed",
    "Expired",
    "Denied",
    "Canceled",
    "Cancelled",
    "Revoked",
    "Closed",
    "Reclaimed",
    "PendingReview",
    "RequestCheckedIn",
];

/// Where an access request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Not yet retrievable; may become so later.
    Pending,
    /// The secret can be fetched now.
    Retrievable,
    /// The request can never yield a secret.
    Terminal,
}

impl RequestPhase {
    pub fn classify(state: &str) -> Self {
        let state = state.trim();
        let known = |set: &[&str]| set.iter().any(|s| s.eq_ignore_ascii_case(state));
        if known(RETRIEVABLE_STATES) {
            RequestPhase::Retrievable
        } else if known(PENDING_STATES) {
            RequestPhase::Pending
        } else {
            if !known(TERMINAL_STATES) {
                tracing::debug!(state, "Unrecognized access request state, treating as terminal");
            }
            RequestPhase::Terminal
        }
    }
}

/// An access request as returned by `AccessRequests/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessRequest {
    #[serde(deserialize_with = "string_from_string_or_number")]
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub asset_name: Option<String>,
    #[serde(default)]
    pub access_request_type: Option<String>,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AccessRequest {
    pub fn phase(&self) -> RequestPhase {
        RequestPhase::classify(&self.state)
    }
}
