//! Leader command implementation.

use anyhow::{Context, Result};
use safeguard_client::{CancellationToken, SafeguardClient};

use crate::cancellation::Cancelled;
use crate::formatters::{OriginsOutput, OutputFormat, get_formatter};

/// Show where reads go and where writes go.
pub async fn run(
    client: &SafeguardClient,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    super::login(client, cancel).await?;

    let read = client.resolve_read_origin()?;
    let write = tokio::select! {
        res = client.resolve_write_origin() => res.context("Failed to resolve cluster leader")?,
        _ = cancel.cancelled() => return Err(Cancelled.into()),
    };

    print!(
        "{}",
        get_formatter(format).format_origins(&OriginsOutput { read, write })?
    );
    Ok(())
}
