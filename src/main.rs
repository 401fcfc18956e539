// chesslens - terminal client for the chess game analysis service
//
// The client core (analysis runs, simulated progress, session monitoring,
// notifications) talks to the backend through the ChessApi trait and to
// time through the Scheduler trait. The shell and one-shot commands in
// cli.rs / shell.rs are thin front-ends over App.

mod advice;
mod analysis;
mod api;
mod app;
mod cli;
mod config;
mod debounce;
mod error;
mod export;
mod logging;
mod models;
mod navigation;
mod notifications;
mod progress;
mod render;
mod scheduler;
mod search;
mod session;
mod shell;

use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config inspection runs before logging so its output stays clean
    if let Some(Commands::Config { show, path }) = cli.command {
        return cli::handle_config(show, path);
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _log_guard = logging::init(&config.logging);

    tracing::info!("chesslens {} using {}", VERSION, config.server_url);

    cli::run(cli.command.unwrap_or(Commands::Shell), config).await
}
