//! Configuration for the chesslens client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/chesslens/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod logging;
mod serialization;
mod timing;


pub use logging::{FileLogging, LogRotation, LoggingConfig};
pub use timing::{FileTiming, Timing};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_MAX_GAMES: u32 = 25;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analysis web service
    pub server_url: String,

    /// Games requested when a command does not say
    pub default_max_games: u32,

    /// Timer intervals, delays and request deadlines
    pub timing: Timing,

    /// Where JSON exports are written
    pub export_dir: PathBuf,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_max_games: DEFAULT_MAX_GAMES,
            timing: Timing::default(),
            export_dir: default_export_dir(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure; every field optional so partial files work
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub server_url: Option<String>,
    pub default_max_games: Option<u32>,

    /// Optional [timing] section
    pub timing: Option<FileTiming>,

    /// Optional [export] section
    pub export: Option<FileExport>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileExport {
    pub dir: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/chesslens/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("chesslens").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Read the config file if there is one
    ///
    /// A file that exists but does not parse is an error: a broken config
    /// should fail loudly, not silently fall back to defaults.
    fn load_file_config() -> anyhow::Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse_file_config(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Cannot read config file {}", path.display())),
        }
    }

    pub(crate) fn parse_file_config(contents: &str) -> Result<FileConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load configuration: env vars > file > defaults
    pub fn load() -> anyhow::Result<Self> {
        let file = Self::load_file_config()?;
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        // Server URL: env > file > default
        let server_url = env("CHESSLENS_SERVER_URL")
            .or(file.server_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        // Max games: file > default
        let default_max_games = file
            .default_max_games
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_GAMES);

        // Export dir: env > file > default
        let export_dir = env("CHESSLENS_EXPORT_DIR")
            .or(file.export.and_then(|e| e.dir))
            .map(PathBuf::from)
            .unwrap_or_else(default_export_dir);

        let timing = Timing::from_file(file.timing);

        // Log level: env > file > default
        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(level) = env("CHESSLENS_LOG_LEVEL") {
            logging.level = level;
        }

        Self {
            server_url,
            default_max_games,
            timing,
            export_dir,
            logging,
        }
    }
}
