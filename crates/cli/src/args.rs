//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Parse command-line arguments and `SAFEGUARD_*` environment variables.
//!
//! Non-responsibilities:
//! - Does not execute commands (see `dispatch` module).
//! - Does not choose the authentication strategy (see `safeguard_config::ConfigLoader`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "safeguard-cli")]
#[command(about = "Safeguard CLI - Authenticate to a Safeguard appliance and check out secrets", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  safeguard-cli -a https://sg.example.com -u admin login --export\n  safeguard-cli me\n  safeguard-cli checkout 42 --wait-timeout 120\n  safeguard-cli --cert-path svc.pfx events --count 10\n"
)]
pub struct Cli {
    /// Appliance URL (e.g., https://sg.example.com)
    #[arg(short, long, global = true, env = "SAFEGUARD_APPLIANCE_URL")]
    pub appliance_url: Option<String>,

    /// Username for password authentication
    #[arg(short, long, global = true, env = "SAFEGUARD_USERNAME")]
    pub username: Option<String>,

    /// Password for password authentication
    #[arg(short, long, global = true, env = "SAFEGUARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Identity provider for password authentication (default: local)
    #[arg(long, global = true, env = "SAFEGUARD_PROVIDER")]
    pub provider: Option<String>,

    /// Client certificate bundle (PKCS#12 or PEM) for certificate authentication
    #[arg(long, global = true, env = "SAFEGUARD_CERT_PATH", value_name = "FILE")]
    pub cert_path: Option<PathBuf>,

    /// Password protecting the certificate bundle
    #[arg(long, global = true, env = "SAFEGUARD_CERT_PASSWORD", hide_env_values = true)]
    pub cert_password: Option<String>,

    /// Previously exported session token (takes precedence over other credentials)
    #[arg(short = 't', long, global = true, env = "SAFEGUARD_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Log in through the browser
    #[arg(short, long, global = true)]
    pub interactive: bool,

    /// Local port receiving the browser redirect (0 picks a free port)
    #[arg(long, global = true, env = "SAFEGUARD_REDIRECT_PORT")]
    pub redirect_port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "SAFEGUARD_TIMEOUT")]
    pub timeout: Option<u64>,

    /// REST API version segment (default: v4)
    #[arg(long, global = true, env = "SAFEGUARD_API_VERSION")]
    pub api_version: Option<String>,

    /// Skip TLS certificate verification (for self-signed certificates)
    #[arg(long, global = true, env = "SAFEGUARD_SKIP_VERIFY")]
    pub skip_verify: bool,

    /// Output format (table, json)
    #[arg(short, long, global = true, default_value = "table")]
    pub output: String,

    /// OTLP collector endpoint for trace export
    #[arg(long, global = true, env = "SAFEGUARD_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Service name reported with exported traces
    #[arg(long, global = true, env = "OTEL_SERVICE_NAME")]
    pub otel_service_name: Option<String>,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long, global = true, value_name = "ADDR")]
    pub metrics_bind: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate and report the session
    Login {
        /// Print a shell line exporting the session token
        #[arg(long)]
        export: bool,
    },

    /// Show the authenticated user
    Me,

    /// Show the origins used for reads and writes
    Leader,

    /// Check out the password granted by an access request
    Checkout {
        /// Access request id
        id: String,

        /// Fail immediately if the request is not yet available
        #[arg(long)]
        no_wait: bool,

        /// Maximum time to wait for a pending request, in seconds
        #[arg(long, default_value = "300")]
        wait_timeout: u64,

        /// Delay between status checks while waiting, in milliseconds
        #[arg(long, default_value = "1000")]
        poll_interval_ms: u64,
    },

    /// Stream appliance events until interrupted
    Events {
        /// Stop after this many events
        #[arg(short, long)]
        count: Option<usize>,
    },
}
