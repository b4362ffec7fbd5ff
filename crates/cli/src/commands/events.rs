//! Events command implementation.

use anyhow::{Context, Result};
use safeguard_client::{CancellationToken, SafeguardClient};
use tracing::debug;

use crate::cancellation::Cancelled;
use crate::formatters::{OutputFormat, get_formatter};

/// Stream appliance events until interrupted or `count` events arrive.
///
/// The session refresher runs alongside so long streams survive expiry.
pub async fn run(
    client: &SafeguardClient,
    count: Option<usize>,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    super::login(client, cancel).await?;

    let mut subscription = client
        .subscribe_events(cancel)
        .context("Failed to subscribe to events")?;
    let refresher_cancel = cancel.child_token();
    let refresher = client.spawn_session_refresher(refresher_cancel.clone());
    let formatter = get_formatter(format);

    let mut received = 0usize;
    let result: Result<()> = loop {
        if count.is_some_and(|limit| received >= limit) {
            break Ok(());
        }
        let event = tokio::select! {
            event = subscription.recv() => event,
            _ = cancel.cancelled() => break Err(Cancelled.into()),
        };
        let Some(event) = event else {
            debug!("Event stream ended");
            break Ok(());
        };
        received += 1;
        match formatter.format_event(&event) {
            Ok(line) => print!("{}", line),
            Err(e) => break Err(e),
        }
    };

    subscription.shutdown().await;
    refresher_cancel.cancel();
    let _ = refresher.await;
    result
}
