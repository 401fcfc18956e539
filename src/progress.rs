//! Simulated progress indicator
//!
//! The backend reports no progress, so the indicator is synthesized: a fixed
//! tick adds a random 2-10% at a time, walking through the step labels of the
//! current operation. The simulation never passes 95% on its own; only
//! [`ProgressSimulator::finish`] (driven by the real outcome) shows 100%.
//!
//! ```text
//!   start()          finish()             collapse delay
//! Idle ──→ Running ──────────→ Completing ──────────────→ Idle
//!            │                                              ▲
//!            └──────────────── stop() ──────────────────────┘
//! ```

use crate::scheduler::{SharedScheduler, TimerHandle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Share of the bar the simulation may fill; the rest waits for real completion
pub const SIMULATED_CEILING: f64 = 95.0;

const MIN_INCREMENT: f64 = 2.0;
const MAX_INCREMENT: f64 = 10.0;
const FALLBACK_LABEL: &str = "Finishing up...";
const COMPLETE_LABEL: &str = "Complete!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Idle,
    Running,
    Completing,
}

/// What the indicator currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub state: ProgressState,
    pub percent: f64,
    pub label: String,
    pub step_index: usize,
    pub total_steps: usize,
    /// False once the indicator has collapsed
    pub visible: bool,
}

impl ProgressSnapshot {
    fn idle() -> Self {
        Self {
            state: ProgressState::Idle,
            percent: 0.0,
            label: String::new(),
            step_index: 0,
            total_steps: 0,
            visible: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub tick_interval: Duration,
    pub collapse_delay: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(800),
            collapse_delay: Duration::from_millis(1000),
        }
    }
}

struct SimState {
    snapshot: ProgressSnapshot,
    steps: Vec<String>,
    tick: Option<TimerHandle>,
    collapse: Option<TimerHandle>,
    rng: StdRng,
}

impl SimState {
    fn step_cap(&self) -> f64 {
        let total = self.steps.len().max(1);
        if self.snapshot.step_index + 1 >= total {
            // Exact, so the last step always reaches the ceiling and the tick stops
            return SIMULATED_CEILING;
        }
        (self.snapshot.step_index + 1) as f64 * (SIMULATED_CEILING / total as f64)
    }
}

#[derive(Clone)]
pub struct ProgressSimulator {
    scheduler: SharedScheduler,
    config: ProgressConfig,
    state: Arc<Mutex<SimState>>,
    updates: Arc<watch::Sender<ProgressSnapshot>>,
}

impl ProgressSimulator {
    pub fn new(scheduler: SharedScheduler, config: ProgressConfig) -> Self {
        Self::with_rng(scheduler, config, StdRng::from_entropy())
    }

    /// Use a specific RNG (seeded in tests for reproducible increments)
    pub fn with_rng(scheduler: SharedScheduler, config: ProgressConfig, rng: StdRng) -> Self {
        let (updates, _) = watch::channel(ProgressSnapshot::idle());
        Self {
            scheduler,
            config,
            state: Arc::new(Mutex::new(SimState {
                snapshot: ProgressSnapshot::idle(),
                steps: Vec::new(),
                tick: None,
                collapse: None,
                rng,
            })),
            updates: Arc::new(updates),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.updates.subscribe()
    }

    #[allow(dead_code)]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().unwrap().snapshot.clone()
    }

    /// Begin a new simulation, cancelling whatever was running before
    pub fn start(&self, steps: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        self.cancel_timers(&mut state);

        let label = steps
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_LABEL.to_string());
        state.snapshot = ProgressSnapshot {
            state: ProgressState::Running,
            percent: 0.0,
            label,
            step_index: 0,
            total_steps: steps.len(),
            visible: true,
        };
        state.steps = steps;

        let weak = Arc::downgrade(&self.state);
        let updates = self.updates.clone();
        let scheduler = self.scheduler.clone();
        state.tick = Some(self.scheduler.schedule_repeating(
            self.config.tick_interval,
            Arc::new(move || tick(&weak, &updates, &scheduler)),
        ));

        self.publish(&state);
    }

    /// Real work finished: jump to 100%, then collapse after the delay
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        if state.snapshot.state == ProgressState::Idle {
            return;
        }
        self.cancel_timers(&mut state);

        state.snapshot.state = ProgressState::Completing;
        state.snapshot.percent = 100.0;
        state.snapshot.label = COMPLETE_LABEL.to_string();

        let weak = Arc::downgrade(&self.state);
        let updates = self.updates.clone();
        state.collapse = Some(self.scheduler.schedule(
            self.config.collapse_delay,
            Box::new(move || collapse(&weak, &updates)),
        ));

        self.publish(&state);
    }

    /// Forced stop: back to Idle without claiming completion
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        self.cancel_timers(&mut state);
        if state.snapshot.state == ProgressState::Idle && !state.snapshot.visible {
            return;
        }
        state.snapshot.state = ProgressState::Idle;
        state.snapshot.visible = false;
        self.publish(&state);
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().snapshot.state != ProgressState::Idle
    }

    fn cancel_timers(&self, state: &mut SimState) {
        if let Some(timer) = state.tick.take() {
            self.scheduler.cancel(timer);
        }
        if let Some(timer) = state.collapse.take() {
            self.scheduler.cancel(timer);
        }
    }

    fn publish(&self, state: &SimState) {
        self.updates.send_replace(state.snapshot.clone());
    }
}

fn tick(
    weak: &Weak<Mutex<SimState>>,
    updates: &watch::Sender<ProgressSnapshot>,
    scheduler: &SharedScheduler,
) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap();
    if state.snapshot.state != ProgressState::Running {
        return;
    }

    let increment = state.rng.gen_range(MIN_INCREMENT..=MAX_INCREMENT);
    let cap = state.step_cap();
    state.snapshot.percent = (state.snapshot.percent + increment).min(cap);

    if state.snapshot.percent >= cap && state.snapshot.step_index + 1 < state.steps.len() {
        state.snapshot.step_index += 1;
        state.snapshot.label = state.steps[state.snapshot.step_index].clone();
    }

    if state.snapshot.percent >= SIMULATED_CEILING {
        if let Some(timer) = state.tick.take() {
            scheduler.cancel(timer);
        }
    }

    updates.send_replace(state.snapshot.clone());
}

fn collapse(weak: &Weak<Mutex<SimState>>, updates: &watch::Sender<ProgressSnapshot>) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap();
    if state.snapshot.state != ProgressState::Completing {
        return;
    }
    state.collapse = None;
    state.snapshot.state = ProgressState::Idle;
    state.snapshot.visible = false;
    updates.send_replace(state.snapshot.clone());
}
