mod auth;
mod cli;
mod collector;
mod config;
mod error;
mod model;
mod output;
mod providers;
mod report;
mod storage;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded before the logger so RUST_LOG from .env takes effect.
    let dotenv = dotenvy::dotenv();

    env_logger::init();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => debug!("No .env file found"),
        Err(err) => warn!("Failed to load .env file: {err}"),
    }

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting metrix deployment collector");
    cli.execute().await?;

    Ok(())
}
