//! Appliance event notifications.

use serde::{Deserialize, Serialize};

/// An event pushed by the appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "Data", default)]
    pub payload: serde_json::Value,
}

/// One record of the event feed.
#[derive(Debug, Deserialize)]
pub(crate) struct Frame {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
}

/// Record type carrying events.
pub(crate) const FRAME_INVOCATION: u8 = 1;
/// Keep-alive record.
pub(crate) const FRAME_PING: u8 = 6;
/// Server is closing the connection.
pub(crate) const FRAME_CLOSE: u8 = 7;
