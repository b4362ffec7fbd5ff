//! Safeguard CLI - Command-line access to a Safeguard appliance.
//!
//! Responsibilities:
//! - Parse command-line arguments and environment variables.
//! - Authenticate, check out secrets and stream events via the shared client library.
//! - Map failures to structured exit codes.
//!
//! Does NOT handle:
//! - Protocol or session logic (see `crates/client`).
//!
//! Invariants:
//! - `load_dotenv()` is called BEFORE CLI parsing to allow `.env` to provide clap defaults.
//! - Logs go to stderr; stdout carries only command output.

mod args;
mod cancellation;
mod commands;
mod dispatch;
mod error;
mod formatters;

use args::Cli;
use cancellation::{install_ctrl_c_handler, is_cancelled_error, print_cancelled_message};
use clap::Parser;
use dispatch::run_command;
use error::{ExitCode, ExitCodeExt};
use safeguard_client::CancellationToken;
use safeguard_config::{Config, ConfigLoader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    // Load .env file BEFORE CLI parsing so clap env defaults can read .env values
    if let Err(e) = ConfigLoader::new().load_dotenv() {
        eprintln!("Failed to load environment: {}", e);
        std::process::exit(ExitCode::ConfigurationError.as_i32());
    }

    let cli = Cli::parse();

    // Initialize OpenTelemetry tracing if OTLP endpoint is configured
    let tracing_guard = if let Some(ref endpoint) = cli.otlp_endpoint {
        let service_name = cli
            .otel_service_name
            .clone()
            .unwrap_or_else(|| "safeguard-cli".to_string());

        let config = safeguard_client::TracingConfig::new()
            .with_otlp_endpoint(endpoint)
            .with_service_name(service_name)
            .with_stderr_logs(true);

        match config.init() {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Failed to initialize OpenTelemetry tracing: {}", e);
                std::process::exit(ExitCode::GeneralError.as_i32());
            }
        }
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        None
    };

    let metrics_exporter = if let Some(ref bind_addr) = cli.metrics_bind {
        match safeguard_client::MetricsExporter::install(bind_addr) {
            Ok(exporter) => {
                tracing::info!("Metrics exporter started on http://{}/metrics", bind_addr);
                Some(exporter)
            }
            Err(e) => {
                eprintln!("Failed to start metrics exporter: {}", e);
                std::process::exit(ExitCode::GeneralError.as_i32());
            }
        }
    } else {
        None
    };

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to build configuration: {:#}", e);
            std::process::exit(ExitCode::ConfigurationError.as_i32());
        }
    };

    let cancel = CancellationToken::new();
    install_ctrl_c_handler(cancel.clone());

    let exit_code = match run_command(cli, config, metrics_exporter.is_some(), &cancel).await {
        Ok(()) => ExitCode::Success,
        Err(e) if is_cancelled_error(&e) => {
            print_cancelled_message();
            ExitCode::Interrupted
        }
        Err(e) => {
            eprintln!("{:#}", e);
            e.exit_code()
        }
    };

    // Shutdown tracing to ensure all spans are flushed
    if let Some(guard) = tracing_guard {
        guard.shutdown();
    }

    std::process::exit(exit_code.as_i32());
}

/// Environment first, then command-line overrides.
fn build_config(cli: &Cli) -> Result<Config, safeguard_config::ConfigError> {
    let mut loader = ConfigLoader::new().from_env()?;

    if let Some(ref url) = cli.appliance_url {
        loader = loader.with_appliance_url(url.clone());
    }
    if let Some(ref username) = cli.username {
        loader = loader.with_username(username.clone());
    }
    if let Some(ref password) = cli.password {
        loader = loader.with_password(password.clone());
    }
    if let Some(ref provider) = cli.provider {
        loader = loader.with_provider(provider.clone());
    }
    if let Some(ref path) = cli.cert_path {
        loader = loader.with_certificate_path(path.clone());
    }
    if let Some(ref password) = cli.cert_password {
        loader = loader.with_certificate_password(password.clone());
    }
    if let Some(ref token) = cli.access_token {
        loader = loader.with_access_token(token.clone());
    }
    if cli.interactive {
        loader = loader.with_interactive(true);
    }
    if let Some(port) = cli.redirect_port {
        loader = loader.with_redirect_port(port);
    }
    if let Some(timeout_secs) = cli.timeout {
        loader = loader.with_timeout(std::time::Duration::from_secs(timeout_secs));
    }
    if let Some(ref version) = cli.api_version {
        loader = loader.with_api_version(version.clone());
    }
    if cli.skip_verify {
        loader = loader.with_skip_verify(true);
    }

    loader.build()
}
