//! Timer and deadline configuration
//!
//! Stored as plain integers (milliseconds or seconds, per field name) so the
//! TOML stays readable; the accessors hand each component its own config type.

use crate::analysis::AnalysisConfig;
use crate::progress::ProgressConfig;
use crate::search::SearchConfig;
use crate::session::MonitorConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub progress_tick_ms: u64,
    pub progress_collapse_ms: u64,
    pub session_poll_secs: u64,
    pub expiry_warning_secs: u64,
    pub search_debounce_ms: u64,
    pub notification_ms: u64,
    pub quick_timeout_secs: u64,
    pub advanced_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub session_timeout_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            progress_tick_ms: 800,
            progress_collapse_ms: 1000,
            session_poll_secs: 60,
            expiry_warning_secs: 3600,
            search_debounce_ms: 500,
            notification_ms: 5000,
            quick_timeout_secs: 30,
            advanced_timeout_secs: 60,
            search_timeout_secs: 10,
            session_timeout_secs: 10,
        }
    }
}

/// Timing settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileTiming {
    pub progress_tick_ms: Option<u64>,
    pub progress_collapse_ms: Option<u64>,
    pub session_poll_secs: Option<u64>,
    pub expiry_warning_secs: Option<u64>,
    pub search_debounce_ms: Option<u64>,
    pub notification_ms: Option<u64>,
    pub quick_timeout_secs: Option<u64>,
    pub advanced_timeout_secs: Option<u64>,
    pub search_timeout_secs: Option<u64>,
    pub session_timeout_secs: Option<u64>,
}

impl Timing {
    /// Create from file config with defaults; zero values fall back to defaults
    pub fn from_file(file: Option<FileTiming>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        let pick = |value: Option<u64>, default: u64| value.filter(|v| *v > 0).unwrap_or(default);

        Self {
            progress_tick_ms: pick(file.progress_tick_ms, defaults.progress_tick_ms),
            progress_collapse_ms: pick(file.progress_collapse_ms, defaults.progress_collapse_ms),
            session_poll_secs: pick(file.session_poll_secs, defaults.session_poll_secs),
            expiry_warning_secs: pick(file.expiry_warning_secs, defaults.expiry_warning_secs),
            search_debounce_ms: pick(file.search_debounce_ms, defaults.search_debounce_ms),
            notification_ms: pick(file.notification_ms, defaults.notification_ms),
            quick_timeout_secs: pick(file.quick_timeout_secs, defaults.quick_timeout_secs),
            advanced_timeout_secs: pick(file.advanced_timeout_secs, defaults.advanced_timeout_secs),
            search_timeout_secs: pick(file.search_timeout_secs, defaults.search_timeout_secs),
            session_timeout_secs: pick(file.session_timeout_secs, defaults.session_timeout_secs),
        }
    }

    pub fn progress(&self) -> ProgressConfig {
        ProgressConfig {
            tick_interval: Duration::from_millis(self.progress_tick_ms),
            collapse_delay: Duration::from_millis(self.progress_collapse_ms),
        }
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(self.session_poll_secs),
            expiry_warning: Duration::from_secs(self.expiry_warning_secs),
            request_timeout: Duration::from_secs(self.session_timeout_secs),
        }
    }

    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            quick_timeout: Duration::from_secs(self.quick_timeout_secs),
            advanced_timeout: Duration::from_secs(self.advanced_timeout_secs),
            ..AnalysisConfig::default()
        }
    }

    pub fn search(&self) -> SearchConfig {
        SearchConfig {
            debounce_window: Duration::from_millis(self.search_debounce_ms),
            timeout: Duration::from_secs(self.search_timeout_secs),
        }
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}
