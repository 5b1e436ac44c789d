//! Binary crate for the `meteocat` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Writing the collected datasets to CSV / JSON files

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cmd.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    cmd.run().await
}
