//! Timer scheduling for the client core
//!
//! Every timed behaviour in the client (progress ticks, notification
//! auto-dismiss, session polling, debounce windows) goes through the
//! [`Scheduler`] trait instead of calling `tokio::time` directly. Components
//! hold a [`SharedScheduler`] and keep the [`TimerHandle`]s they receive so
//! they can cancel deterministically on teardown.
//!
//! # Implementations
//!
//! - [`TokioScheduler`]: production timers, one spawned task per timer
//! - `ManualScheduler` (tests only): virtual time advanced by hand
//!
//! # Callback contract
//!
//! Callbacks run without any scheduler lock held, so they may freely
//! schedule or cancel other timers (including their own handle).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[cfg(test)]
pub mod manual;

/// One-shot timer callback
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Repeating timer callback, invoked once per period
pub type RepeatingTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Shared scheduler reference passed to every component
pub type SharedScheduler = Arc<dyn Scheduler>;

/// Opaque handle identifying a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn id(self) -> u64 {
        self.0
    }
}

/// Injectable timer and clock source
pub trait Scheduler: Send + Sync {
    /// Monotonic time elapsed since the scheduler was created
    fn now(&self) -> Duration;

    /// Wall-clock time as Unix epoch seconds (session expiry is server time)
    fn unix_time(&self) -> i64;

    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Run `task` every `period`, first run one period from now
    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle;

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// Scheduler backed by tokio timers
///
/// Each timer is a spawned task. The registry maps live handles to the
/// task's abort handle; a timer that finds itself missing from the registry
/// when it wakes has been cancelled and does nothing.
pub struct TokioScheduler {
    runtime: Handle,
    origin: Instant,
    next_id: AtomicU64,
    timers: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioScheduler {
    /// Create a scheduler on the current tokio runtime
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime, same as `tokio::spawn`.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            origin: Instant::now(),
            next_id: AtomicU64::new(1),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of timers that have not fired or been cancelled yet
    #[allow(dead_code)]
    pub fn pending(&self) -> usize {
        self.timers.lock().unwrap().len()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn unix_time(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timers = self.timers.clone();

        // Hold the registry lock across spawn so the timer cannot observe
        // the registry before its own entry is inserted.
        let mut registry = self.timers.lock().unwrap();
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let live = timers.lock().unwrap().remove(&id).is_some();
            if live {
                task();
            }
        });
        registry.insert(id, join.abort_handle());

        TimerHandle::new(id)
    }

    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timers = self.timers.clone();

        let mut registry = self.timers.lock().unwrap();
        let join = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !timers.lock().unwrap().contains_key(&id) {
                    break;
                }
                task();
            }
        });
        registry.insert(id, join.abort_handle());

        TimerHandle::new(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        match self.timers.lock().unwrap().remove(&handle.id()) {
            Some(abort) => {
                abort.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Ok(mut timers) = self.timers.lock() {
            for (_, abort) in timers.drain() {
                abort.abort();
            }
        }
    }
}
