//! Composition root
//!
//! [`App`] wires the client core together around one shared scheduler and
//! notification queue, and owns startup and teardown. Front-ends (the shell
//! and the one-shot CLI commands) only talk to the core through it.

use crate::analysis::{AnalysisController, InputControl};
use crate::api::{ChessApi, HttpChessApi, CONNECT_TIMEOUT};
use crate::config::Config;
use crate::error::{AnalysisError, ExportError, SessionExpiredError};
use crate::export::Exporter;
use crate::models::{AdvancedAnalysis, AnalysisKind, AnalysisSession, QuickAnalysis};
use crate::navigation::{Navigator, Route};
use crate::notifications::{NotificationKind, NotificationQueue};
use crate::progress::ProgressSimulator;
use crate::scheduler::{SharedScheduler, TimerHandle, TokioScheduler};
use crate::search::PlayerSearch;
use crate::session::SessionMonitor;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WELCOME_DELAY: Duration = Duration::from_millis(1500);
const WELCOME_DURATION: Duration = Duration::from_millis(4000);
const SESSION_REFRESH_DELAY: Duration = Duration::from_secs(1);

const WELCOME_MESSAGES: [&str; 3] = [
    "Welcome to chesslens, the chess game analyzer!",
    "Discover the patterns in your play with a full analysis",
    "Ready to analyze your games? Enter a username to start",
];

pub struct App {
    config: Config,
    scheduler: SharedScheduler,
    notifications: NotificationQueue,
    analysis: Arc<AnalysisController>,
    monitor: Arc<SessionMonitor>,
    search: PlayerSearch,
    navigator: Navigator,
    exporter: Exporter,
    welcome_timer: Mutex<Option<TimerHandle>>,
    refresh_timer: Mutex<Option<TimerHandle>>,
}

impl App {
    pub fn new(
        config: Config,
        api: Arc<dyn ChessApi>,
        scheduler: SharedScheduler,
        inputs: Arc<dyn InputControl>,
    ) -> Self {
        let timing = &config.timing;
        let notifications =
            NotificationQueue::with_default_duration(scheduler.clone(), timing.notification_duration());

        let analysis = Arc::new(AnalysisController::new(
            api.clone(),
            notifications.clone(),
            ProgressSimulator::new(scheduler.clone(), timing.progress()),
            inputs,
            scheduler.clone(),
            timing.analysis(),
        ));
        let monitor = Arc::new(SessionMonitor::new(
            api.clone(),
            notifications.clone(),
            scheduler.clone(),
            timing.monitor(),
        ));
        let search = PlayerSearch::new(
            api,
            notifications.clone(),
            scheduler.clone(),
            timing.search(),
        );
        let navigator = Navigator::new(
            monitor.clone(),
            notifications.clone(),
            ProgressSimulator::new(scheduler.clone(), timing.progress()),
            config.server_url.clone(),
        );
        let exporter = Exporter::new(config.export_dir.clone());

        Self {
            config,
            scheduler,
            notifications,
            analysis,
            monitor,
            search,
            navigator,
            exporter,
            welcome_timer: Mutex::new(None),
            refresh_timer: Mutex::new(None),
        }
    }

    /// Production wiring: HTTP backend and tokio timers
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(config: Config, inputs: Arc<dyn InputControl>) -> anyhow::Result<Self> {
        let api = HttpChessApi::new(config.server_url.clone(), CONNECT_TIMEOUT)?;
        let scheduler: SharedScheduler = Arc::new(TokioScheduler::new());
        Ok(Self::new(config, Arc::new(api), scheduler, inputs))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn analysis(&self) -> &AnalysisController {
        &self.analysis
    }

    #[allow(dead_code)]
    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    pub fn search(&self) -> &PlayerSearch {
        &self.search
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Wall-clock time as seen by the core's scheduler
    pub fn unix_time(&self) -> i64 {
        self.scheduler.unix_time()
    }

    /// Start background session monitoring and queue the welcome message
    pub fn start(&self, welcome: bool) {
        self.monitor.start();

        if welcome {
            let notifications = self.notifications.clone();
            let timer = self.scheduler.schedule(
                WELCOME_DELAY,
                Box::new(move || {
                    if let Some(message) = WELCOME_MESSAGES.choose(&mut rand::thread_rng()) {
                        notifications.enqueue(*message, NotificationKind::Info, WELCOME_DURATION);
                    }
                }),
            );
            self.replace_timer(&self.welcome_timer, Some(timer));
        }
    }

    pub async fn quick(
        &self,
        username: &str,
        max_games: Option<u32>,
    ) -> Result<QuickAnalysis, AnalysisError> {
        let max_games = max_games.unwrap_or(self.config.default_max_games);
        self.analysis.start_quick_analysis(username, max_games).await
    }

    /// Run an advanced analysis and refresh the session shortly after success
    pub async fn advanced(
        &self,
        username: &str,
        max_games: Option<u32>,
    ) -> Result<AdvancedAnalysis, AnalysisError> {
        let max_games = max_games.unwrap_or(self.config.default_max_games);
        let result = self
            .analysis
            .start_advanced_analysis(username, max_games)
            .await?;
        self.schedule_session_refresh();
        Ok(result)
    }

    pub async fn open(&self, route: Route) -> Result<String, SessionExpiredError> {
        self.navigator.navigate(route).await
    }

    pub async fn status(&self) -> Option<AnalysisSession> {
        self.monitor.poll().await
    }

    /// Export the most recent result of `kind`
    pub fn export(&self, kind: AnalysisKind) -> Result<PathBuf, ExportError> {
        let outcome = match kind {
            AnalysisKind::Quick => self
                .analysis
                .last_quick()
                .ok_or(ExportError::NothingToExport("basic"))
                .and_then(|result| self.exporter.export_basic(&result)),
            AnalysisKind::Advanced => self
                .analysis
                .last_advanced()
                .ok_or(ExportError::NothingToExport("advanced"))
                .and_then(|result| self.exporter.export_advanced(&result)),
        };

        match &outcome {
            Ok(path) => {
                self.notifications
                    .success(format!("Exported to {}", path.display()));
            }
            Err(e) => {
                tracing::warn!("Export failed: {}", e);
                self.notifications.error(format!("Export failed: {}", e));
            }
        }
        outcome
    }

    /// Escape gesture: drop every visible notification
    pub fn clear_notifications(&self) {
        self.notifications.clear_all();
    }

    /// Stop every timer the core owns
    pub fn teardown(&self) {
        self.monitor.stop();
        self.analysis.shutdown();
        self.navigator.progress().stop();
        self.search.cancel();
        self.replace_timer(&self.welcome_timer, None);
        self.replace_timer(&self.refresh_timer, None);
        self.notifications.clear_all();
        tracing::debug!("Client core torn down");
    }

    fn schedule_session_refresh(&self) {
        let monitor = Arc::downgrade(&self.monitor);
        let timer = self.scheduler.schedule(
            SESSION_REFRESH_DELAY,
            Box::new(move || {
                if let Some(monitor) = monitor.upgrade() {
                    monitor.refresh();
                }
            }),
        );
        self.replace_timer(&self.refresh_timer, Some(timer));
    }

    /// Store `timer` in `slot`, cancelling whatever was there (a no-op once it fired)
    fn replace_timer(&self, slot: &Mutex<Option<TimerHandle>>, timer: Option<TimerHandle>) {
        let previous = std::mem::replace(&mut *slot.lock().unwrap(), timer);
        if let Some(previous) = previous {
            self.scheduler.cancel(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NoInputs;
    use crate::api::testing::ScriptedApi;
    use crate::models::fixtures;
    use crate::scheduler::Scheduler;
    use crate::scheduler::manual::ManualScheduler;
    use tempfile::TempDir;

    struct Harness {
        api: Arc<ScriptedApi>,
        scheduler: Arc<ManualScheduler>,
        app: App,
        _exports: TempDir,
    }

    fn harness() -> Harness {
        let exports = TempDir::new().unwrap();
        let config = Config {
            export_dir: exports.path().to_path_buf(),
            ..Config::default()
        };
        let api = Arc::new(ScriptedApi::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let app = App::new(config, api.clone(), scheduler.clone(), Arc::new(NoInputs));
        Harness {
            api,
            scheduler,
            app,
            _exports: exports,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_welcome_message_after_delay() {
        let h = harness();
        h.app.start(true);
        settle().await;
        assert!(h.app.notifications().is_empty());

        h.scheduler.advance(WELCOME_DELAY);
        let shown = h.app.notifications().snapshot();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, NotificationKind::Info);
        assert!(WELCOME_MESSAGES.contains(&shown[0].message.as_str()));
        h.app.teardown();
    }

    #[tokio::test]
    async fn test_quick_uses_default_max_games() {
        let h = harness();
        h.api.push_quick(Ok(fixtures::quick("magnus", 5)));
        let result = h.app.quick("magnus", None).await.unwrap();
        assert_eq!(result.games.len(), 5);
    }

    #[tokio::test]
    async fn test_advanced_success_refreshes_session() {
        let h = harness();
        h.api.push_advanced(Ok(fixtures::advanced("magnus")));
        h.app.advanced("magnus", Some(50)).await.unwrap();
        assert_eq!(h.api.count("session"), 0);

        h.scheduler.advance(SESSION_REFRESH_DELAY);
        settle().await;
        assert_eq!(h.api.count("session"), 1);
    }

    #[tokio::test]
    async fn test_advanced_failure_does_not_refresh() {
        let h = harness();
        h.api
            .push_advanced(Err(crate::error::ApiError::server("not enough games")));
        assert!(h.app.advanced("magnus", None).await.is_err());
        h.scheduler.advance(Duration::from_secs(5));
        settle().await;
        assert_eq!(h.api.count("session"), 0);
    }

    #[tokio::test]
    async fn test_export_without_results_fails() {
        let h = harness();
        let err = h.app.export(AnalysisKind::Quick).unwrap_err();
        assert!(matches!(err, ExportError::NothingToExport("basic")));
        let shown = h.app.notifications().snapshot();
        assert_eq!(shown[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_export_after_quick_analysis() {
        let h = harness();
        h.api.push_quick(Ok(fixtures::quick("magnus", 7)));
        h.app.quick("magnus", None).await.unwrap();

        let path = h.app.export(AnalysisKind::Quick).unwrap();
        assert!(path.starts_with(h._exports.path()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_repeated_advanced_runs_keep_one_refresh_timer() {
        let h = harness();
        for _ in 0..3 {
            h.api.push_advanced(Ok(fixtures::advanced("magnus")));
            h.app.advanced("magnus", None).await.unwrap();
        }
        h.scheduler.advance(SESSION_REFRESH_DELAY);
        settle().await;
        assert_eq!(h.api.count("session"), 1);
        assert!(h.app.refresh_timer.lock().unwrap().is_some());

        h.app.teardown();
        assert!(h.app.refresh_timer.lock().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_during_slow_session_check() {
        let h = harness();
        let now = h.scheduler.unix_time();
        h.api.set_session(Ok(fixtures::session(Some(now + 1800))));
        *h.api.session_delay.lock().unwrap() = Some(Duration::from_secs(5));

        h.app.start(false);
        settle().await;
        h.app.teardown();
        assert_eq!(h.scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(h.scheduler.pending(), 0);
        assert!(h.app.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_cancels_every_timer() {
        let h = harness();
        h.app.start(true);
        settle().await;
        h.api.push_quick(Ok(fixtures::quick("magnus", 5)));
        h.api.push_advanced(Ok(fixtures::advanced("magnus")));
        h.app.quick("magnus", None).await.unwrap();
        h.app.advanced("magnus", None).await.unwrap();
        h.app.search().on_input("magnus");
        assert!(h.scheduler.pending() > 0);

        h.app.teardown();
        assert_eq!(h.scheduler.pending(), 0);
        assert!(h.app.notifications().is_empty());
        assert!(!h.app.monitor().is_running());
    }
}
