//! Trigger coalescing
//!
//! A [`Debouncer`] wraps one operation behind a quiet window. Each trigger
//! replaces the pending execution (and its arguments); the operation only
//! runs once triggers stop arriving for a full window.

use crate::scheduler::{SharedScheduler, TimerHandle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Quiet window for search-as-you-type
pub const SEARCH_WINDOW: Duration = Duration::from_millis(500);

#[derive(Default)]
struct Pending {
    timer: Option<TimerHandle>,
    /// Bumped on every trigger/cancel; a firing timer only runs if it is still current
    generation: u64,
}

pub struct Debouncer<A: Send + 'static> {
    scheduler: SharedScheduler,
    window: Duration,
    action: Arc<dyn Fn(A) + Send + Sync>,
    pending: Arc<Mutex<Pending>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new(
        scheduler: SharedScheduler,
        window: Duration,
        action: impl Fn(A) + Send + Sync + 'static,
    ) -> Self {
        Self {
            scheduler,
            window,
            action: Arc::new(action),
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Schedule the action with `args`, replacing any pending execution
    pub fn trigger(&self, args: A) {
        let mut pending = self.pending.lock().unwrap();
        if let Some(timer) = pending.timer.take() {
            self.scheduler.cancel(timer);
        }
        pending.generation += 1;
        let generation = pending.generation;

        let shared = self.pending.clone();
        let action = self.action.clone();
        let timer = self.scheduler.schedule(
            self.window,
            Box::new(move || {
                {
                    let mut pending = shared.lock().unwrap();
                    if pending.generation != generation {
                        return;
                    }
                    pending.timer = None;
                }
                action(args);
            }),
        );
        pending.timer = Some(timer);
    }

    /// Drop the pending execution, if any
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap();
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    #[allow(dead_code)]
    pub fn is_pending(&self) -> bool {
        self.pending.lock().unwrap().timer.is_some()
    }
}
