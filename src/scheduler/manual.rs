//! Virtual-time scheduler for tests
//!
//! Nothing fires until the test calls [`ManualScheduler::advance`]. Timers
//! fire in due-time order (ties broken by creation order), and the virtual
//! clock is set to each timer's due time before its callback runs.

use super::{RepeatingTask, Scheduler, Task, TimerHandle};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Wall-clock epoch the virtual clock starts at (2024-01-01T00:00:00Z)
pub const DEFAULT_EPOCH: i64 = 1_704_067_200;

enum Callback {
    Once(Task),
    Repeating { period: Duration, task: RepeatingTask },
}

struct Entry {
    due: Duration,
    callback: Callback,
}

struct State {
    now: Duration,
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

pub struct ManualScheduler {
    epoch: i64,
    state: Mutex<State>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_EPOCH)
    }

    /// Create a scheduler whose wall clock starts at `epoch` seconds
    pub fn starting_at(epoch: i64) -> Self {
        Self {
            epoch,
            state: Mutex::new(State {
                now: Duration::ZERO,
                next_id: 1,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// Number of live timers
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Move virtual time forward, firing every timer that comes due
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().unwrap().now + by;

        loop {
            let task = {
                let mut state = self.state.lock().unwrap();
                let next = state
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.due <= target)
                    .min_by_key(|(id, entry)| (entry.due, **id))
                    .map(|(id, _)| *id);

                let Some(id) = next else {
                    state.now = target;
                    return;
                };

                let entry = state.entries.remove(&id).expect("entry selected above");
                state.now = entry.due;

                match entry.callback {
                    Callback::Once(task) => task,
                    Callback::Repeating { period, task } => {
                        // Re-arm before running so the callback can cancel itself
                        state.entries.insert(
                            id,
                            Entry {
                                due: entry.due + period,
                                callback: Callback::Repeating {
                                    period,
                                    task: task.clone(),
                                },
                            },
                        );
                        Box::new(move || task()) as Task
                    }
                }
            };

            task();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.state.lock().unwrap().now
    }

    fn unix_time(&self) -> i64 {
        self.epoch + self.now().as_secs() as i64
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.entries.insert(
            id,
            Entry {
                due,
                callback: Callback::Once(task),
            },
        );
        TimerHandle::new(id)
    }

    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + period;
        state.entries.insert(
            id,
            Entry {
                due,
                callback: Callback::Repeating { period, task },
            },
        );
        TimerHandle::new(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .entries
            .remove(&handle.id())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fires_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (delay, label) in [(300, "c"), (100, "a"), (200, "b")] {
            let log = log.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || log.lock().unwrap().push(label)),
            );
        }

        scheduler.advance(Duration::from_millis(250));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(scheduler.now(), Duration::from_millis(250));

        scheduler.advance(Duration::from_millis(50));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_repeating_can_cancel_itself() {
        let scheduler = Arc::new(ManualScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));
        let handle_slot: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));

        let task = {
            let scheduler = scheduler.clone();
            let count = count.clone();
            let handle_slot = handle_slot.clone();
            Arc::new(move || {
                if count.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    if let Some(handle) = *handle_slot.lock().unwrap() {
                        scheduler.cancel(handle);
                    }
                }
            })
        };
        let handle = scheduler.schedule_repeating(Duration::from_secs(1), task);
        *handle_slot.lock().unwrap() = Some(handle);

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_unix_time_follows_virtual_clock() {
        let scheduler = ManualScheduler::starting_at(1_000);
        scheduler.advance(Duration::from_secs(90));
        assert_eq!(scheduler.unix_time(), 1_090);
    }
}
