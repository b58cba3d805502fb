mod api;
mod auth;
mod cli;
mod commands;
mod config;
mod encryption;
mod error;
mod output;
mod pipeline;
mod settings;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting gocd {}", env!("CARGO_PKG_VERSION"));
    let exit_code = cli.execute().await?;

    std::process::exit(exit_code);
}
