//! Analysis run orchestration
//!
//! [`AnalysisController`] owns the single analysis run the client may have
//! in flight. Starting a run is strictly ordered:
//!
//! ```text
//! validate ──→ guard ──→ mark running ──→ disable inputs ──→ start progress ──→ request
//!    │           │                                                               │
//!    ▼           ▼                                                   success ◄───┴───► failure
//! error note  busy note                                          finish progress   stop progress
//!                                                                success note      error note
//!                                              (always) release busy + enable inputs via RunGuard
//! ```
//!
//! The guard check and the busy-flag set happen under one lock before the
//! first await, so two starts can never both pass the guard.

use crate::advice;
use crate::api::ChessApi;
use crate::error::{AnalysisError, ApiError, ApiErrorKind, ValidationError};
use crate::models::{AdvancedAnalysis, AnalysisKind, AnalysisRequest, QuickAnalysis};
use crate::notifications::{NotificationKind, NotificationQueue};
use crate::progress::ProgressSimulator;
use crate::scheduler::{SharedScheduler, TimerHandle};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 25;

const BUSY_MESSAGE: &str = "An analysis is already running, please wait...";
const ADVANCED_ERROR_DURATION: Duration = Duration::from_millis(8000);
const ADVICE_DURATION: Duration = Duration::from_millis(7000);

const QUICK_STEPS: [&str; 5] = [
    "Fetching player info...",
    "Fetching recent games...",
    "Analyzing results...",
    "Computing statistics...",
    "Preparing report...",
];

const ADVANCED_STEPS: [&str; 8] = [
    "Fetching player info...",
    "Collecting games from the archive...",
    "Analyzing openings and defences...",
    "Analyzing strengths and weaknesses...",
    "Computing performance trends...",
    "Preparing advanced statistics...",
    "Building personal recommendations...",
    "Finalizing analysis...",
];

/// Check a username before anything is sent to the server
///
/// Returns the trimmed username on success.
pub fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ValidationError::Empty);
    }

    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(ValidationError::TooShort);
    }
    if len > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong);
    }

    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !allowed {
        return Err(ValidationError::InvalidCharacters);
    }

    Ok(username.to_string())
}

/// Capability to lock the user's input surfaces while a run is active
pub trait InputControl: Send + Sync {
    fn set_enabled(&self, enabled: bool);
}

/// Input control for front-ends with nothing to lock
pub struct NoInputs;

impl InputControl for NoInputs {
    fn set_enabled(&self, _enabled: bool) {}
}

/// The analysis currently in flight
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    pub kind: AnalysisKind,
    pub username: String,
    pub steps: Vec<String>,
    /// Scheduler time the run started at
    pub started_at: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Client-side deadline for a quick analysis request
    pub quick_timeout: Duration,
    /// Client-side deadline for an advanced analysis request
    pub advanced_timeout: Duration,
    /// Pause between the success message and the coaching tip
    pub advice_delay: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            quick_timeout: Duration::from_secs(30),
            advanced_timeout: Duration::from_secs(60),
            advice_delay: Duration::from_secs(2),
        }
    }
}

pub struct AnalysisController {
    api: Arc<dyn ChessApi>,
    notifications: NotificationQueue,
    progress: ProgressSimulator,
    inputs: Arc<dyn InputControl>,
    scheduler: SharedScheduler,
    config: AnalysisConfig,
    /// The busy flag: `Some` while a run is active
    current: Mutex<Option<AnalysisRun>>,
    runs_started: AtomicU64,
    advice_timer: Mutex<Option<TimerHandle>>,
    last_quick: Mutex<Option<QuickAnalysis>>,
    last_advanced: Mutex<Option<AdvancedAnalysis>>,
}

/// Releases the busy flag and re-enables inputs when the run ends, however it ends
struct RunGuard<'a> {
    controller: &'a AnalysisController,
    settled: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            // Caller dropped the future mid-request
            self.controller.progress.stop();
            tracing::debug!("Analysis run abandoned before it settled");
        }
        self.controller.current.lock().unwrap().take();
        self.controller.inputs.set_enabled(true);
    }
}

impl AnalysisController {
    pub fn new(
        api: Arc<dyn ChessApi>,
        notifications: NotificationQueue,
        progress: ProgressSimulator,
        inputs: Arc<dyn InputControl>,
        scheduler: SharedScheduler,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            api,
            notifications,
            progress,
            inputs,
            scheduler,
            config,
            current: Mutex::new(None),
            runs_started: AtomicU64::new(0),
            advice_timer: Mutex::new(None),
            last_quick: Mutex::new(None),
            last_advanced: Mutex::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    #[allow(dead_code)]
    pub fn current_run(&self) -> Option<AnalysisRun> {
        self.current.lock().unwrap().clone()
    }

    /// Number of runs that passed validation and the busy guard
    #[allow(dead_code)]
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> &ProgressSimulator {
        &self.progress
    }

    pub fn last_quick(&self) -> Option<QuickAnalysis> {
        self.last_quick.lock().unwrap().clone()
    }

    pub fn last_advanced(&self) -> Option<AdvancedAnalysis> {
        self.last_advanced.lock().unwrap().clone()
    }

    pub async fn start_quick_analysis(
        &self,
        username: &str,
        max_games: u32,
    ) -> Result<QuickAnalysis, AnalysisError> {
        let (mut run, request) = self.begin(AnalysisKind::Quick, username, max_games)?;

        let outcome = self
            .request(self.config.quick_timeout, self.api.quick_analysis(&request))
            .await;
        run.settled = true;

        match outcome {
            Ok(result) => {
                self.progress.finish();
                *self.last_quick.lock().unwrap() = Some(result.clone());
                self.notifications.success(format!(
                    "Analyzed {} games successfully!",
                    result.games.len()
                ));
                self.schedule_advice(&result);
                tracing::info!(
                    "Quick analysis for {} done: {} games, {:.1}% win rate",
                    result.username,
                    result.games.len(),
                    result.stats.win_rate
                );
                Ok(result)
            }
            Err(err) => Err(self.fail(AnalysisKind::Quick, err)),
        }
    }

    pub async fn start_advanced_analysis(
        &self,
        username: &str,
        max_games: u32,
    ) -> Result<AdvancedAnalysis, AnalysisError> {
        let (mut run, request) = self.begin(AnalysisKind::Advanced, username, max_games)?;

        let outcome = self
            .request(
                self.config.advanced_timeout,
                self.api.advanced_analysis(&request),
            )
            .await;
        run.settled = true;

        match outcome {
            Ok(result) => {
                self.progress.finish();
                *self.last_advanced.lock().unwrap() = Some(result.clone());
                self.notifications.success(format!(
                    "Advanced analysis complete: {} games analyzed",
                    result.total_analyzed
                ));
                tracing::info!(
                    "Advanced analysis for {} done: {} games",
                    result.username,
                    result.total_analyzed
                );
                Ok(result)
            }
            Err(err) => Err(self.fail(AnalysisKind::Advanced, err)),
        }
    }

    /// Cancel timers owned by the controller (teardown)
    pub fn shutdown(&self) {
        self.progress.stop();
        if let Some(timer) = self.advice_timer.lock().unwrap().take() {
            self.scheduler.cancel(timer);
        }
    }

    /// validate → guard → mark running → disable inputs → start progress
    fn begin(
        &self,
        kind: AnalysisKind,
        username: &str,
        max_games: u32,
    ) -> Result<(RunGuard<'_>, AnalysisRequest), AnalysisError> {
        let username = match validate_username(username) {
            Ok(username) => username,
            Err(err) => {
                self.notifications.error(err.to_string());
                return Err(err.into());
            }
        };

        let steps: Vec<String> = match kind {
            AnalysisKind::Quick => QUICK_STEPS.iter().map(|s| s.to_string()).collect(),
            AnalysisKind::Advanced => ADVANCED_STEPS.iter().map(|s| s.to_string()).collect(),
        };

        {
            let mut current = self.current.lock().unwrap();
            if current.is_some() {
                drop(current);
                self.notifications.warning(BUSY_MESSAGE);
                return Err(AnalysisError::Busy);
            }
            *current = Some(AnalysisRun {
                kind,
                username: username.clone(),
                steps: steps.clone(),
                started_at: self.scheduler.now(),
            });
        }
        let guard = RunGuard {
            controller: self,
            settled: false,
        };

        self.runs_started.fetch_add(1, Ordering::SeqCst);
        self.inputs.set_enabled(false);
        self.progress.start(steps);
        tracing::info!("Started {} for {} ({} games)", kind.label(), username, max_games);

        Ok((
            guard,
            AnalysisRequest {
                username,
                max_games,
            },
        ))
    }

    async fn request<T>(
        &self,
        deadline: Duration,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                // Only our wait is over; the server may still complete the work
                tracing::warn!("Request exceeded {}s deadline", deadline.as_secs());
                Err(ApiError::timeout())
            }
        }
    }

    fn fail(&self, kind: AnalysisKind, err: ApiError) -> AnalysisError {
        self.progress.stop();
        if err.kind == ApiErrorKind::Timeout {
            // The server may still be working on it
            tracing::warn!("{} outcome unknown: {}", kind.label(), err);
        } else {
            tracing::error!("{} failed: {}", kind.label(), err);
        }

        let message = failure_message(kind, &err);
        match kind {
            AnalysisKind::Quick => {
                self.notifications.error(message);
            }
            AnalysisKind::Advanced => {
                self.notifications
                    .enqueue(message, NotificationKind::Error, ADVANCED_ERROR_DURATION);
            }
        }
        err.into()
    }

    fn schedule_advice(&self, result: &QuickAnalysis) {
        let Some(tip) = advice::pick(&result.stats, &mut rand::thread_rng()) else {
            return;
        };

        let notifications = self.notifications.clone();
        let timer = self.scheduler.schedule(
            self.config.advice_delay,
            Box::new(move || {
                notifications.enqueue(tip, NotificationKind::Info, ADVICE_DURATION);
            }),
        );
        if let Some(previous) = self.advice_timer.lock().unwrap().replace(timer) {
            self.scheduler.cancel(previous);
        }
    }
}

/// User-facing copy for a failed request, by failure category
fn failure_message(kind: AnalysisKind, err: &ApiError) -> String {
    match (kind, err.kind) {
        (AnalysisKind::Quick, ApiErrorKind::NotFound) => {
            "Player not found. Check the username.".to_string()
        }
        (AnalysisKind::Advanced, ApiErrorKind::NotFound) => {
            "Player not found, or not enough games to analyze".to_string()
        }
        (AnalysisKind::Quick, ApiErrorKind::Timeout) => {
            "No answer from the server in time. The analysis may still finish there; try again shortly."
                .to_string()
        }
        (AnalysisKind::Advanced, ApiErrorKind::Timeout) => {
            "The advanced analysis is taking longer than expected and may still finish on the server. Try again shortly or with fewer games."
                .to_string()
        }
        (_, ApiErrorKind::Network) => "Could not connect to the server".to_string(),
        (AnalysisKind::Quick, ApiErrorKind::Server) => {
            format!("Analysis failed: {}", err.message)
        }
        (AnalysisKind::Advanced, ApiErrorKind::Server) => {
            format!("Advanced analysis failed: {}", err.message)
        }
    }
}
