//! Background session monitor
//!
//! Polls the server-held analysis session on a fixed cadence, independent of
//! any analysis run. The monitor is advisory: failed polls are logged and
//! retried on the next tick, never shown to the user. The one load-bearing
//! entry point is [`SessionMonitor::check_now`], which gates navigation.

use crate::api::ChessApi;
use crate::error::{ApiError, SessionExpiredError};
use crate::models::{AnalysisSession, SessionStatus};
use crate::notifications::{NotificationKind, NotificationQueue};
use crate::scheduler::{SharedScheduler, TimerHandle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Sessions larger than this are worth a log line (the server keeps them in a cookie)
const LARGE_SESSION_KB: f64 = 3.0;

const EXPIRY_WARNING_DURATION: Duration = Duration::from_millis(6000);
const RESTORE_MESSAGE_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Warn when less than this much time is left on an advanced analysis
    pub expiry_warning: Duration,
    /// Deadline for one session status request
    pub request_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            expiry_warning: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct SessionMonitor {
    api: Arc<dyn ChessApi>,
    notifications: NotificationQueue,
    scheduler: SharedScheduler,
    config: MonitorConfig,
    interval: Mutex<Option<TimerHandle>>,
    /// Background polls still in flight
    tasks: Mutex<Vec<AbortHandle>>,
    latest: Mutex<Option<AnalysisSession>>,
}

impl SessionMonitor {
    pub fn new(
        api: Arc<dyn ChessApi>,
        notifications: NotificationQueue,
        scheduler: SharedScheduler,
        config: MonitorConfig,
    ) -> Self {
        Self {
            api,
            notifications,
            scheduler,
            config,
            interval: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            latest: Mutex::new(None),
        }
    }

    /// Run the initial check and start the periodic poll
    ///
    /// Must be called from within a tokio runtime; each tick spawns one poll.
    pub fn start(self: &Arc<Self>) {
        let mut interval = self.interval.lock().unwrap();
        if interval.is_some() {
            return;
        }

        self.spawn_poll(true);

        let weak = Arc::downgrade(self);
        *interval = Some(self.scheduler.schedule_repeating(
            self.config.poll_interval,
            Arc::new(move || {
                if let Some(monitor) = weak.upgrade() {
                    monitor.spawn_poll(false);
                }
            }),
        ));

        tracing::debug!(
            "Session monitor started (every {}s)",
            self.config.poll_interval.as_secs()
        );
    }

    /// Poll once in the background, e.g. right after the server stored a new analysis
    pub fn refresh(self: &Arc<Self>) {
        self.spawn_poll(false);
    }

    /// Cancel the periodic poll and abandon polls still in flight
    pub fn stop(&self) {
        if let Some(timer) = self.interval.lock().unwrap().take() {
            self.scheduler.cancel(timer);
            tracing::debug!("Session monitor stopped");
        }
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.interval.lock().unwrap().is_some()
    }

    /// Most recent successful poll result
    #[allow(dead_code)]
    pub fn latest(&self) -> Option<AnalysisSession> {
        self.latest.lock().unwrap().clone()
    }

    /// Fetch the session once. Failures are logged and yield `None`.
    pub async fn poll(&self) -> Option<AnalysisSession> {
        let status = match self.fetch().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Session check failed: {}", e);
                return None;
            }
        };

        let session = AnalysisSession::from(status);
        tracing::debug!(
            basic = session.has_basic_analysis,
            advanced = session.has_advanced_analysis,
            expires_at = ?session.expires_at,
            "Session status"
        );

        if session.session_size_kb > LARGE_SESSION_KB {
            tracing::warn!("Large session size: {:.2} KB", session.session_size_kb);
        }

        if let Some(message) = self.expiry_warning(&session) {
            self.notifications.enqueue(
                message,
                NotificationKind::Warning,
                EXPIRY_WARNING_DURATION,
            );
        }

        *self.latest.lock().unwrap() = Some(session.clone());
        Some(session)
    }

    /// Poll once and decide whether navigation to analysis views may proceed
    pub async fn check_now(&self) -> Result<AnalysisSession, SessionExpiredError> {
        let session = self
            .poll()
            .await
            .ok_or(SessionExpiredError::Unavailable)?;

        if !session.has_any_analysis() {
            return Err(SessionExpiredError::NoAnalysis);
        }

        if let Some(remaining) = session.seconds_remaining(self.scheduler.unix_time()) {
            if remaining <= 0 {
                return Err(SessionExpiredError::Expired {
                    expired_at: session.expires_at.unwrap_or_default(),
                });
            }
        }

        Ok(session)
    }

    async fn fetch(&self) -> Result<SessionStatus, ApiError> {
        match tokio::time::timeout(self.config.request_timeout, self.api.session_status()).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::timeout()),
        }
    }

    fn spawn_poll(self: &Arc<Self>, announce: bool) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("Session poll skipped: no async runtime");
                return;
            }
        };

        let monitor = Arc::clone(self);
        let task = runtime.spawn(async move {
            if let Some(session) = monitor.poll().await {
                if announce {
                    monitor.announce_restored(&session);
                }
            }
        });

        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task.abort_handle());
    }

    fn expiry_warning(&self, session: &AnalysisSession) -> Option<String> {
        let remaining = session.seconds_remaining(self.scheduler.unix_time())?;
        if remaining >= self.config.expiry_warning.as_secs() as i64 {
            return None;
        }
        if remaining <= 0 {
            // Reported to the user by the navigation guard
            tracing::info!("Advanced analysis expired {}s ago", -remaining);
            return None;
        }
        Some(format!(
            "Your analysis expires in {}",
            format_remaining(remaining)
        ))
    }

    fn announce_restored(&self, session: &AnalysisSession) {
        if !session.has_any_analysis() {
            return;
        }
        if let Some(username) = &session.username {
            let games = session
                .games_count
                .map(|n| format!(" ({} games)", n))
                .unwrap_or_default();
            self.notifications.enqueue(
                format!(
                    "Welcome back! Found a previous analysis for {}{}",
                    username, games
                ),
                NotificationKind::Info,
                RESTORE_MESSAGE_DURATION,
            );
        }
    }
}

/// "2 hours and 5 minutes" / "30 minutes"
fn format_remaining(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{} hours and {} minutes", hours, minutes)
    } else {
        format!("{} minutes", minutes)
    }
}
