//! Cluster membership types.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::string_from_string_or_number;

/// One appliance in the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterMember {
    #[serde(default, deserialize_with = "string_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ipv4_address: Option<String>,
    #[serde(default)]
    pub is_leader: bool,
}

impl ClusterMember {
    /// First label of the member's hostname.
    pub fn host_label(&self) -> Option<&str> {
        self.name
            .trim()
            .split('.')
            .next()
            .filter(|label| !label.is_empty())
    }
}
