use anyhow::Result;
use clap::Parser;
use ghost_scan::scan_cli::{handle_scan_command, ScanCli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghost_scan=info")),
        )
        .with_target(false)
        .init();

    handle_scan_command(ScanCli::parse()).await
}
