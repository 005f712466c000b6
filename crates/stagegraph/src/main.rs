//! Stagegraph CLI binary.

use anyhow::Result;
use stagegraph::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the stagegraph CLI.
///
/// Uses tokio's current_thread runtime; every command is a short sequence of
/// file reads and writes.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=stagegraph=debug stagegraph chains --item kitchen-1
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stagegraph=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting stagegraph CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Stagegraph CLI completed successfully");
    Ok(())
}
