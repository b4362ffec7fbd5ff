//! Command dispatch logic.
//!
//! Responsibilities:
//! - Route parsed CLI arguments to the matching command handler.
//! - Build the shared client once per invocation.
//!
//! Does NOT handle:
//! - CLI structure definitions (see `args` module).
//! - Configuration loading (see `main()`).
//!
//! Invariants:
//! - All commands receive the process-wide cancellation token.

use std::time::Duration;

use anyhow::Result;
use safeguard_client::{CancellationToken, WaitOptions};
use safeguard_config::Config;

use crate::args::{Cli, Commands};
use crate::commands;
use crate::formatters::OutputFormat;

/// Dispatch CLI commands to their respective handlers.
pub(crate) async fn run_command(
    cli: Cli,
    config: Config,
    metrics_enabled: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let format = OutputFormat::from_str(&cli.output)?;
    let client = commands::build_client(&config, metrics_enabled)?;

    match cli.command {
        Commands::Login { export } => {
            commands::login::run(&client, export, format, cancel).await?;
        }
        Commands::Me => {
            commands::me::run(&client, format, cancel).await?;
        }
        Commands::Leader => {
            commands::leader::run(&client, format, cancel).await?;
        }
        Commands::Checkout {
            id,
            no_wait,
            wait_timeout,
            poll_interval_ms,
        } => {
            let options = if no_wait {
                WaitOptions::no_wait()
            } else {
                WaitOptions::default()
                    .with_timeout(Duration::from_secs(wait_timeout))
                    .with_poll_interval(Duration::from_millis(poll_interval_ms))
            };
            commands::checkout::run(&client, &id, &options, format, cancel).await?;
        }
        Commands::Events { count } => {
            commands::events::run(&client, count, format, cancel).await?;
        }
    }

    Ok(())
}
