//! Me command implementation.

use anyhow::{Context, Result};
use safeguard_client::{CancellationToken, SafeguardClient};

use crate::cancellation::Cancelled;
use crate::formatters::{OutputFormat, get_formatter};

/// Show the identity owning the session.
pub async fn run(
    client: &SafeguardClient,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    super::login(client, cancel).await?;

    let identity = tokio::select! {
        res = client.me() => res.context("Failed to fetch identity")?,
        _ = cancel.cancelled() => return Err(Cancelled.into()),
    };

    print!("{}", get_formatter(format).format_identity(&identity)?);
    Ok(())
}
