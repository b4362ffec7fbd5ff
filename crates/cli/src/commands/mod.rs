//! CLI command implementations.

pub mod checkout;
pub mod events;
pub mod leader;
pub mod login;
pub mod me;

use anyhow::{Context, Result};
use safeguard_client::{MetricsCollector, SafeguardClient};
use safeguard_config::Config;

/// Build a client from the loaded configuration.
///
/// Metrics are only recorded when an exporter is installed.
pub fn build_client(config: &Config, metrics_enabled: bool) -> Result<SafeguardClient> {
    let mut builder = SafeguardClient::builder().from_config(config);
    if metrics_enabled {
        builder = builder.metrics(MetricsCollector::new());
    }
    builder.build().context("Failed to create client")
}

/// Authenticate with the configured strategy, honoring cancellation.
pub async fn login(client: &SafeguardClient, cancel: &safeguard_client::CancellationToken) -> Result<()> {
    tokio::select! {
        res = client.login() => res.context("Login failed"),
        _ = cancel.cancelled() => Err(crate::cancellation::Cancelled.into()),
    }
}
