//! The authenticated caller, as returned by `me`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::serde_helpers::string_from_string_or_number;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserIdentity {
    #[serde(deserialize_with = "string_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
