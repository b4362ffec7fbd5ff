//! Checkout command implementation.

use anyhow::{Context, Result};
use safeguard_client::{CancellationToken, SafeguardClient, WaitOptions};
use secrecy::ExposeSecret;
use tracing::info;

use crate::cancellation::Cancelled;
use crate::formatters::OutputFormat;

/// Check out the password granted by access request `id` and print it.
///
/// The client's own wait loop observes `cancel`, so a Ctrl+C while waiting
/// surfaces as `ClientError::Cancelled`.
pub async fn run(
    client: &SafeguardClient,
    id: &str,
    options: &WaitOptions,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    super::login(client, cancel).await?;

    let request = tokio::select! {
        res = client.get_access_request(id) => {
            res.with_context(|| format!("Failed to fetch access request {id}"))?
        }
        _ = cancel.cancelled() => return Err(Cancelled.into()),
    };
    info!(id, state = %request.state, "Fetched access request");

    let password = request.check_out_password(options, cancel).await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "id": request.id, "password": password.expose_secret() })
        ),
        OutputFormat::Table => println!("{}", password.expose_secret()),
    }
    Ok(())
}
