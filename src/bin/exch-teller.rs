use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use exch_teller::{
    bin_utils::{ConsoleCommand, Service},
    client::http::HttpBackend,
    config::{BackendConfig, DEFAULT_LOCAL_URL, DEFAULT_REMOTE_URL},
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Admin console for player balances", long_about = None)]
struct Args {
    /// Base URL of the phone-keyed backend.
    #[arg(long, env = "EXCH_REMOTE_URL", default_value = DEFAULT_REMOTE_URL)]
    remote_url: String,

    /// Base URL of the id-keyed backend.
    #[arg(long, env = "EXCH_LOCAL_URL", default_value = DEFAULT_LOCAL_URL)]
    local_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "EXCH_TIMEOUT_SECS", default_value_t = 20)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: ConsoleCommand,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = BackendConfig::new(
        &args.remote_url,
        &args.local_url,
        Duration::from_secs(args.timeout_secs),
    )
    .context("Invalid backend configuration")?;
    let backend = HttpBackend::new(&config).context("Failed to build HTTP client")?;

    let service = Service {
        backend: Arc::new(backend),
        output: &mut std::io::stdout(),
        timeout: config.request_timeout,
    };
    if service.run(args.command).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
