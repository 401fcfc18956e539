//! Interactive line-oriented shell
//!
//! Reads one command per line from stdin. Analysis runs are spawned so the
//! prompt stays responsive (and the busy guard can be seen doing its job);
//! everything the core reports arrives through the renderer task.

use crate::analysis::InputControl;
use crate::app::App;
use crate::models::AnalysisKind;
use crate::navigation::Route;
use crate::render;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

const HELP: &str = "\
Commands:
  quick [username] [games]      Quick analysis of recent games
  advanced [username] [games]   Advanced analysis (kept on the server for a while)
  search <text>                 Look up a player as you type
  select <username>             Use a player for the next analysis
  open <view>                   deep_analysis | statistics | filter_games
  export basic|advanced         Save the latest result as JSON
  status                        Show the server-side analysis session
  clear                         Dismiss all notifications
  help                          Show this help
  quit                          Leave the shell";

/// Input lock for the shell prompt
#[derive(Default)]
pub struct ShellInputs {
    disabled: AtomicBool,
}

impl ShellInputs {
    pub fn enabled(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }
}

impl InputControl for ShellInputs {
    fn set_enabled(&self, enabled: bool) {
        self.disabled.store(!enabled, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quick {
        username: Option<String>,
        max_games: Option<u32>,
    },
    Advanced {
        username: Option<String>,
        max_games: Option<u32>,
    },
    Search(String),
    Select(String),
    Open(Route),
    Export(AnalysisKind),
    Status,
    Clear,
    Help,
    Quit,
}

/// Parse one input line; `Ok(None)` for a blank line
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_lowercase().as_str() {
        "quick" | "q" => {
            let (username, max_games) = analysis_args(&rest)?;
            Command::Quick {
                username,
                max_games,
            }
        }
        "advanced" | "a" => {
            let (username, max_games) = analysis_args(&rest)?;
            Command::Advanced {
                username,
                max_games,
            }
        }
        "search" | "s" => Command::Search(rest.join(" ")),
        "select" => match rest.as_slice() {
            [username] => Command::Select(username.to_string()),
            _ => return Err("Usage: select <username>".to_string()),
        },
        "open" => match rest.as_slice() {
            [view] => Command::Open(view.parse()?),
            _ => return Err("Usage: open deep_analysis|statistics|filter_games".to_string()),
        },
        "export" => match rest.as_slice() {
            ["basic"] | ["quick"] => Command::Export(AnalysisKind::Quick),
            ["advanced"] => Command::Export(AnalysisKind::Advanced),
            _ => return Err("Usage: export basic|advanced".to_string()),
        },
        "status" => Command::Status,
        "clear" | "esc" => Command::Clear,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{}'. Type help for a list.", other)),
    };
    Ok(Some(command))
}

fn analysis_args(args: &[&str]) -> Result<(Option<String>, Option<u32>), String> {
    let games = |s: &str| {
        s.parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("'{}' is not a valid number of games", s))
    };
    match args {
        [] => Ok((None, None)),
        [username] => Ok((Some(username.to_string()), None)),
        [username, count] => Ok((Some(username.to_string()), Some(games(count)?))),
        _ => Err("Usage: quick|advanced [username] [games]".to_string()),
    }
}

/// Print notifications, progress and search suggestions as they happen
///
/// Finishes once the notification channel closes (the app was dropped).
pub fn spawn_renderer(app: &App) -> JoinHandle<()> {
    let mut events = app.notifications().subscribe();
    let mut analysis = app.analysis().progress().subscribe();
    let mut navigation = app.navigator().progress().subscribe();
    let mut suggestions = app.search().subscribe();

    tokio::spawn(async move {
        let mut analysis_open = true;
        let mut navigation_open = true;
        let mut suggestions_open = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if let Some(line) = render::event_line(&event) {
                            println!("{}", line);
                        }
                    }
                    None => break,
                },
                changed = analysis.changed(), if analysis_open => match changed {
                    Ok(()) => {
                        if let Some(line) = render::progress_line(&analysis.borrow_and_update()) {
                            println!("{}", line);
                        }
                    }
                    Err(_) => analysis_open = false,
                },
                changed = navigation.changed(), if navigation_open => match changed {
                    Ok(()) => {
                        if let Some(line) = render::progress_line(&navigation.borrow_and_update()) {
                            println!("{}", line);
                        }
                    }
                    Err(_) => navigation_open = false,
                },
                changed = suggestions.changed(), if suggestions_open => match changed {
                    Ok(()) => {
                        if let Some(player) = suggestions.borrow_and_update().as_ref() {
                            println!("{}", render::suggestion_line(player));
                        }
                    }
                    Err(_) => suggestions_open = false,
                },
            }
        }
    })
}

fn prompt(inputs: &ShellInputs) {
    if inputs.enabled() {
        print!("chesslens> ");
    } else {
        print!("chesslens (busy)> ");
    }
    let _ = std::io::stdout().flush();
}

/// Run the shell until `quit` or end of input
pub async fn run(app: Arc<App>, inputs: Arc<ShellInputs>) -> anyhow::Result<()> {
    let renderer = spawn_renderer(&app);
    app.start(true);

    println!(
        "chesslens {} - connected to {}",
        crate::config::VERSION,
        app.config().server_url
    );
    println!("Type help for a list of commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&inputs);
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse(&line) {
            Ok(None) => {}
            Err(message) => println!("{}", message),
            Ok(Some(Command::Quit)) => {
                if !app.analysis().is_busy() {
                    break;
                }
                println!("An analysis is still running. Quit anyway? [y/N]");
                match lines.next_line().await? {
                    Some(answer) if answer.trim().eq_ignore_ascii_case("y") => break,
                    _ => {}
                }
            }
            Ok(Some(command)) => dispatch(&app, command).await,
        }
    }

    app.teardown();
    renderer.abort();
    Ok(())
}

async fn dispatch(app: &Arc<App>, command: Command) {
    match command {
        Command::Quick {
            username,
            max_games,
        } => {
            let username = resolve_username(app, username);
            let app = app.clone();
            tokio::spawn(async move {
                // Failures were already reported as notifications
                if let Ok(result) = app.quick(&username, max_games).await {
                    println!("{}", render::quick_summary(&result));
                }
            });
        }
        Command::Advanced {
            username,
            max_games,
        } => {
            let username = resolve_username(app, username);
            let app = app.clone();
            tokio::spawn(async move {
                if let Ok(result) = app.advanced(&username, max_games).await {
                    println!("{}", render::advanced_summary(&result));
                }
            });
        }
        Command::Search(text) => app.search().on_input(&text),
        Command::Select(username) => {
            app.search().select(&username);
        }
        Command::Open(route) => {
            if let Ok(url) = app.open(route).await {
                println!("Open {} in your browser", url);
            }
        }
        Command::Export(kind) => {
            let _ = app.export(kind);
        }
        Command::Status => match app.status().await {
            Some(session) => println!("{}", render::session_summary(&session, app.unix_time())),
            None => println!("Could not reach the analysis server"),
        },
        Command::Clear => app.clear_notifications(),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

/// Explicit username, else the selected search suggestion, else empty (rejected by validation)
fn resolve_username(app: &App, username: Option<String>) -> String {
    username
        .or_else(|| app.search().selected())
        .unwrap_or_default()
}
