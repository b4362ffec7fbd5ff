//! Login command implementation.

use anyhow::Result;
use safeguard_client::{CancellationToken, SafeguardClient};
use tracing::info;

use crate::formatters::{OutputFormat, SessionOutput, get_formatter};

/// Log in and report the session, or print an export line for the token.
pub async fn run(
    client: &SafeguardClient,
    export: bool,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    info!("Logging in to {}", client.appliance_url()?);
    super::login(client, cancel).await?;

    if export {
        println!("{}", client.export_session_line()?);
        return Ok(());
    }

    let session = client.session();
    let output = SessionOutput {
        appliance: client.appliance_url()?,
        modality: session
            .modality()
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "-".to_string()),
        issued_at: session.issued_at().map(|t| t.to_rfc3339()),
        expires_at: session.expires_at().map(|t| t.to_rfc3339()),
    };
    print!("{}", get_formatter(format).format_session(&output)?);

    Ok(())
}
