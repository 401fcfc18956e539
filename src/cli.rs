// CLI module - command-line argument parsing and handlers
//
// Without a subcommand the interactive shell starts. The one-shot
// subcommands run a single core operation, render what it reports, tear the
// core down and exit:
// - quick / advanced: run an analysis and print the summary
// - status: show the server-side session
// - open: check the session and print the URL of a view
// - config --show / --path: inspect configuration

use crate::analysis::NoInputs;
use crate::app::App;
use crate::config::{Config, VERSION};
use crate::models::AnalysisKind;
use crate::navigation::Route;
use crate::render;
use crate::shell::{self, ShellInputs};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

/// How long a one-shot command waits for the renderer to flush
const RENDER_DRAIN: Duration = Duration::from_secs(1);

/// chesslens - terminal client for the chess game analysis service
#[derive(Parser)]
#[command(name = "chesslens")]
#[command(version = VERSION)]
#[command(about = "Terminal client for the chess game analysis service", long_about = None)]
pub struct Cli {
    /// Analysis server URL (overrides config file and CHESSLENS_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive shell (default)
    Shell,

    /// Quick analysis of a player's recent games
    Quick {
        username: String,

        /// Number of games to analyze
        #[arg(short = 'n', long)]
        max_games: Option<u32>,

        /// Write the result to the export directory as JSON
        #[arg(long)]
        export: bool,
    },

    /// Advanced analysis (stored server-side for the detailed views)
    Advanced {
        username: String,

        /// Number of games to analyze
        #[arg(short = 'n', long)]
        max_games: Option<u32>,

        /// Write the result to the export directory as JSON
        #[arg(long)]
        export: bool,
    },

    /// Show the server-side analysis session
    Status,

    /// Check the session and print the URL of a detailed view
    Open {
        /// deep_analysis, statistics or filter_games
        route: Route,
    },

    /// Inspect configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Handle `config`; needs no runtime or logging
pub fn handle_config(show: bool, path: bool) -> anyhow::Result<()> {
    if path {
        match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine config path"),
        }
    } else if show {
        let config = Config::load()?;
        println!("# Effective configuration (env > file > defaults)");
        println!();
        print!("{}", config.to_toml());
    } else {
        println!("Usage: chesslens config [--show|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --path    Show config file path");
    }
    Ok(())
}

/// Run the selected front-end against the configured server
pub async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Shell => {
            let inputs = Arc::new(ShellInputs::default());
            let app = Arc::new(App::connect(config, inputs.clone())?);
            shell::run(app, inputs).await
        }
        Commands::Config { show, path } => handle_config(show, path),
        command => one_shot(command, config).await,
    }
}

async fn one_shot(command: Commands, config: Config) -> anyhow::Result<()> {
    let app = App::connect(config, Arc::new(NoInputs))?;
    let renderer = shell::spawn_renderer(&app);

    let outcome = execute(&app, command).await;

    app.teardown();
    drop(app);
    // Dropping the app closes the channels; let the renderer print what is left
    let _ = tokio::time::timeout(RENDER_DRAIN, renderer).await;

    outcome
}

async fn execute(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Quick {
            username,
            max_games,
            export,
        } => {
            let result = app.quick(&username, max_games).await?;
            println!("{}", render::quick_summary(&result));
            if export {
                app.export(AnalysisKind::Quick)?;
            }
        }
        Commands::Advanced {
            username,
            max_games,
            export,
        } => {
            let result = app.advanced(&username, max_games).await?;
            println!("{}", render::advanced_summary(&result));
            if export {
                app.export(AnalysisKind::Advanced)?;
            }
        }
        Commands::Status => match app.status().await {
            Some(session) => println!("{}", render::session_summary(&session, app.unix_time())),
            None => anyhow::bail!("Could not reach the analysis server"),
        },
        Commands::Open { route } => {
            let url = app.open(route).await?;
            println!("{}", url);
        }
        Commands::Shell | Commands::Config { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_one_shot_quick() {
        let cli = Cli::try_parse_from(["chesslens", "quick", "magnus", "-n", "50", "--export"])
            .unwrap();
        match cli.command {
            Some(Commands::Quick {
                username,
                max_games,
                export,
            }) => {
                assert_eq!(username, "magnus");
                assert_eq!(max_games, Some(50));
                assert!(export);
            }
            _ => panic!("expected quick"),
        }
    }

    #[test]
    fn test_parse_open_route_and_global_server() {
        let cli = Cli::try_parse_from([
            "chesslens",
            "open",
            "statistics",
            "--server",
            "http://example.org",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://example.org"));
        assert!(matches!(
            cli.command,
            Some(Commands::Open {
                route: Route::Statistics
            })
        ));
        assert!(Cli::try_parse_from(["chesslens", "open", "settings"]).is_err());
    }

    #[test]
    fn test_no_subcommand_means_shell() {
        let cli = Cli::try_parse_from(["chesslens"]).unwrap();
        assert!(cli.command.is_none());
    }
}
