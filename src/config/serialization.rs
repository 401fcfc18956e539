//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize the config as a commented TOML file
    pub fn to_toml(&self) -> String {
        let t = &self.timing;
        format!(
            r#"# chesslens configuration
# Environment variables override these values:
#   CHESSLENS_SERVER_URL, CHESSLENS_LOG_LEVEL, CHESSLENS_EXPORT_DIR

# Analysis web service
server_url = {server_url:?}

# Games requested when a command does not say (the server may cap it)
default_max_games = {max_games}

[timing]
progress_tick_ms = {tick}
progress_collapse_ms = {collapse}
session_poll_secs = {poll}
# Warn when an advanced analysis has less than this left
expiry_warning_secs = {warning}
search_debounce_ms = {debounce}
notification_ms = {notification}
quick_timeout_secs = {quick}
advanced_timeout_secs = {advanced}
search_timeout_secs = {search}
session_timeout_secs = {session}

[export]
dir = {export_dir:?}

[logging]
# trace, debug, info, warn, error (RUST_LOG overrides)
level = {level:?}
file_enabled = {file_enabled}
file_dir = {file_dir:?}
# hourly, daily, never
file_rotation = {rotation:?}
file_prefix = {prefix:?}
"#,
            server_url = self.server_url,
            max_games = self.default_max_games,
            tick = t.progress_tick_ms,
            collapse = t.progress_collapse_ms,
            poll = t.session_poll_secs,
            warning = t.expiry_warning_secs,
            debounce = t.search_debounce_ms,
            notification = t.notification_ms,
            quick = t.quick_timeout_secs,
            advanced = t.advanced_timeout_secs,
            search = t.search_timeout_secs,
            session = t.session_timeout_secs,
            export_dir = self.export_dir.display().to_string(),
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display().to_string(),
            rotation = self.logging.file_rotation.as_str(),
            prefix = self.logging.file_prefix,
        )
    }
}
