//! Session-gated navigation to the analysis views
//!
//! The detailed views only make sense while the server still holds a valid
//! analysis. Every navigation re-checks the session first; a denied
//! navigation leaves the current location untouched.

use crate::error::SessionExpiredError;
use crate::notifications::{NotificationKind, NotificationQueue};
use crate::progress::ProgressSimulator;
use crate::session::SessionMonitor;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DENIED_DURATION: Duration = Duration::from_millis(6000);
const NAVIGATING_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    DeepAnalysis,
    Statistics,
    FilterGames,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::DeepAnalysis, Route::Statistics, Route::FilterGames];

    pub fn path(self) -> &'static str {
        match self {
            Route::DeepAnalysis => "/deep_analysis",
            Route::Statistics => "/statistics",
            Route::FilterGames => "/filter_games",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::DeepAnalysis => "deep analysis",
            Route::Statistics => "statistics",
            Route::FilterGames => "game filter",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        match name {
            "deep_analysis" | "deep" => Ok(Route::DeepAnalysis),
            "statistics" | "stats" => Ok(Route::Statistics),
            "filter_games" | "filter" => Ok(Route::FilterGames),
            _ => {
                let expected: Vec<&str> = Route::ALL
                    .iter()
                    .map(|r| r.path().trim_start_matches('/'))
                    .collect();
                Err(format!(
                    "unknown route '{}' (expected one of: {})",
                    s,
                    expected.join(", ")
                ))
            }
        }
    }
}

pub struct Navigator {
    monitor: Arc<SessionMonitor>,
    notifications: NotificationQueue,
    progress: ProgressSimulator,
    base_url: String,
    location: Mutex<Option<Route>>,
}

impl Navigator {
    pub fn new(
        monitor: Arc<SessionMonitor>,
        notifications: NotificationQueue,
        progress: ProgressSimulator,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            monitor,
            notifications,
            progress,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            location: Mutex::new(None),
        }
    }

    #[allow(dead_code)]
    pub fn location(&self) -> Option<Route> {
        *self.location.lock().unwrap()
    }

    pub fn progress(&self) -> &ProgressSimulator {
        &self.progress
    }

    /// Check the session and, if it is still valid, move to `route`
    ///
    /// Returns the full URL of the view on success.
    pub async fn navigate(&self, route: Route) -> Result<String, SessionExpiredError> {
        self.progress.start(vec![
            "Checking analysis session...".to_string(),
            format!("Loading {}...", route.title()),
        ]);

        match self.monitor.check_now().await {
            Ok(session) => {
                self.progress.finish();
                self.notifications.enqueue(
                    format!("Navigating to {}...", route.title()),
                    NotificationKind::Info,
                    NAVIGATING_DURATION,
                );
                *self.location.lock().unwrap() = Some(route);
                tracing::info!(
                    "Navigated to {} (analysis for {})",
                    route,
                    session.username.as_deref().unwrap_or("unknown")
                );
                Ok(format!("{}{}", self.base_url, route.path()))
            }
            Err(err) => {
                self.progress.stop();
                self.notifications.enqueue(
                    format!("{}. Please run the analysis again.", err),
                    NotificationKind::Error,
                    DENIED_DURATION,
                );
                tracing::info!("Navigation to {} denied: {}", route, err);
                Err(err)
            }
        }
    }
}
