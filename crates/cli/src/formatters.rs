//! Output formatters for CLI commands.
//!
//! Provides two output formats: a human-readable key/value table and JSON.

use anyhow::Result;
use serde::Serialize;
use safeguard_client::{Event, UserIdentity};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl OutputFormat {
    /// Parse from string.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!("Invalid output format: {}. Valid options: json, table", s),
        }
    }
}

/// Session summary printed by `login`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutput {
    pub appliance: String,
    pub modality: String,
    pub issued_at: Option<String>,
    pub expires_at: Option<String>,
}

/// Read and write origins printed by `leader`.
#[derive(Debug, Clone, Serialize)]
pub struct OriginsOutput {
    pub read: String,
    pub write: String,
}

/// Formatter trait for different output types.
pub trait Formatter {
    fn format_session(&self, session: &SessionOutput) -> Result<String>;

    fn format_identity(&self, identity: &UserIdentity) -> Result<String>;

    fn format_origins(&self, origins: &OriginsOutput) -> Result<String>;

    /// One event, on a single line so streams can be piped.
    fn format_event(&self, event: &Event) -> Result<String>;
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_session(&self, session: &SessionOutput) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string_pretty(session)?))
    }

    fn format_identity(&self, identity: &UserIdentity) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string_pretty(identity)?))
    }

    fn format_origins(&self, origins: &OriginsOutput) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string_pretty(origins)?))
    }

    fn format_event(&self, event: &Event) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string(event)?))
    }
}

/// Key/value table formatter.
pub struct TableFormatter;

fn rows(pairs: &[(&str, &str)]) -> String {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(k, v)| format!("{:<width$}  {}\n", k, v, width = width))
        .collect()
}

impl Formatter for TableFormatter {
    fn format_session(&self, session: &SessionOutput) -> Result<String> {
        Ok(rows(&[
            ("Appliance", &session.appliance),
            ("Modality", &session.modality),
            ("Issued", session.issued_at.as_deref().unwrap_or("-")),
            ("Expires", session.expires_at.as_deref().unwrap_or("-")),
        ]))
    }

    fn format_identity(&self, identity: &UserIdentity) -> Result<String> {
        Ok(rows(&[
            ("Id", &identity.id),
            ("Name", identity.name.as_deref().unwrap_or("-")),
            ("Display Name", identity.display_name.as_deref().unwrap_or("-")),
            ("Email", identity.email_address.as_deref().unwrap_or("-")),
        ]))
    }

    fn format_origins(&self, origins: &OriginsOutput) -> Result<String> {
        Ok(rows(&[("Read", &origins.read), ("Write", &origins.write)]))
    }

    fn format_event(&self, event: &Event) -> Result<String> {
        Ok(format!(
            "{}  {}  {}\n",
            event.time.as_deref().unwrap_or("-"),
            event.name,
            event.payload
        ))
    }
}

/// Get a formatter for the specified format.
pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Table => Box::new(TableFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        serde_json::from_value(serde_json::json!({
            "Id": 7,
            "Name": "alice",
            "EmailAddress": "alice@example.com"
        }))
        .unwrap()
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_table_identity_aligns_keys() {
        let output = TableFormatter.format_identity(&identity()).unwrap();
        assert!(output.contains("Id            7\n"));
        assert!(output.contains("Display Name  -\n"));
        assert!(output.contains("Email         alice@example.com\n"));
    }

    #[test]
    fn test_json_identity() {
        let output = JsonFormatter.format_identity(&identity()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["Id"], "7");
        assert_eq!(value["Name"], "alice");
    }

    #[test]
    fn test_event_is_single_line() {
        let event = Event {
            name: "AccessRequestAvailable".to_string(),
            time: None,
            payload: serde_json::json!({"RequestId": "5"}),
        };
        for format in [OutputFormat::Json, OutputFormat::Table] {
            let output = get_formatter(format).format_event(&event).unwrap();
            assert_eq!(output.matches('\n').count(), 1);
            assert!(output.contains("AccessRequestAvailable"));
        }
    }
}
