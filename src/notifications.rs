//! Bounded notification queue
//!
//! User-facing messages that auto-dismiss after a per-message duration.
//! At most [`MAX_VISIBLE`] are shown at once; enqueuing past capacity evicts
//! the oldest first. Every entry owns exactly one dismiss timer, which is
//! cancelled whenever the entry leaves the queue for any other reason.
//!
//! The queue is a cheap clonable handle; all clones share one queue.

use crate::scheduler::{SharedScheduler, TimerHandle};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

/// Maximum number of notifications displayed at once
pub const MAX_VISIBLE: usize = 3;

/// Default display time when the caller does not pick one
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn title(self) -> &'static str {
        match self {
            NotificationKind::Success => "Success",
            NotificationKind::Error => "Error",
            NotificationKind::Warning => "Warning",
            NotificationKind::Info => "Info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Why a notification left the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    /// Its display time ran out
    Expired,
    /// Explicit `dismiss(id)`
    Dismissed,
    /// Pushed out by a newer entry at capacity
    Evicted,
    /// Removed by `clear_all`
    Cleared,
}

/// Lifecycle event for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Shown(Notification),
    Dismissed {
        id: NotificationId,
        reason: DismissReason,
    },
}

struct Entry {
    notification: Notification,
    timer: Option<TimerHandle>,
}

struct QueueState {
    entries: VecDeque<Entry>,
    next_id: u64,
    events: Option<mpsc::UnboundedSender<NotificationEvent>>,
}

impl QueueState {
    fn publish(&self, event: NotificationEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone just means nobody renders anymore
            let _ = tx.send(event);
        }
    }

    fn remove(&mut self, id: NotificationId) -> Option<Entry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.notification.id == id)?;
        self.entries.remove(index)
    }
}

#[derive(Clone)]
pub struct NotificationQueue {
    scheduler: SharedScheduler,
    default_duration: Duration,
    state: Arc<Mutex<QueueState>>,
}

impl NotificationQueue {
    pub fn new(scheduler: SharedScheduler) -> Self {
        Self::with_default_duration(scheduler, DEFAULT_DURATION)
    }

    pub fn with_default_duration(scheduler: SharedScheduler, default_duration: Duration) -> Self {
        Self {
            scheduler,
            default_duration,
            state: Arc::new(Mutex::new(QueueState {
                entries: VecDeque::with_capacity(MAX_VISIBLE),
                next_id: 1,
                events: None,
            })),
        }
    }

    /// Receive `Shown`/`Dismissed` events from now on (replaces any previous subscriber)
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<NotificationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().events = Some(tx);
        rx
    }

    /// Show a message for `duration`, evicting the oldest entry when full
    pub fn enqueue(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> NotificationId {
        let mut state = self.state.lock().unwrap();

        while state.entries.len() >= MAX_VISIBLE {
            let Some(oldest) = state.entries.pop_front() else {
                break;
            };
            if let Some(timer) = oldest.timer {
                self.scheduler.cancel(timer);
            }
            state.publish(NotificationEvent::Dismissed {
                id: oldest.notification.id,
                reason: DismissReason::Evicted,
            });
        }

        let id = NotificationId(state.next_id);
        state.next_id += 1;

        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at: Utc::now(),
            duration,
        };

        tracing::debug!(
            "Notification ({}): {}",
            kind.title().to_lowercase(),
            notification.message
        );

        let weak: Weak<Mutex<QueueState>> = Arc::downgrade(&self.state);
        let timer = self.scheduler.schedule(
            duration,
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    expire(&state, id);
                }
            }),
        );

        state.publish(NotificationEvent::Shown(notification.clone()));
        state.entries.push_back(Entry {
            notification,
            timer: Some(timer),
        });

        id
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, NotificationKind::Success, self.default_duration)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, NotificationKind::Error, self.default_duration)
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, NotificationKind::Warning, self.default_duration)
    }

    #[allow(dead_code)]
    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, NotificationKind::Info, self.default_duration)
    }

    /// Remove a notification. No-op when it is already gone.
    #[allow(dead_code)]
    pub fn dismiss(&self, id: NotificationId) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.remove(id) {
            if let Some(timer) = entry.timer {
                self.scheduler.cancel(timer);
            }
            state.publish(NotificationEvent::Dismissed {
                id,
                reason: DismissReason::Dismissed,
            });
        }
    }

    /// Remove every notification and cancel all their timers
    pub fn clear_all(&self) {
        let mut state = self.state.lock().unwrap();
        let drained: Vec<Entry> = state.entries.drain(..).collect();
        for entry in drained {
            if let Some(timer) = entry.timer {
                self.scheduler.cancel(timer);
            }
            state.publish(NotificationEvent::Dismissed {
                id: entry.notification.id,
                reason: DismissReason::Cleared,
            });
        }
    }

    /// Current notifications, oldest first
    pub fn snapshot(&self) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|entry| entry.notification.clone())
            .collect()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dismiss-timer callback: the timer is spent, so only the entry is removed
fn expire(state: &Mutex<QueueState>, id: NotificationId) {
    let mut state = state.lock().unwrap();
    if state.remove(id).is_some() {
        state.publish(NotificationEvent::Dismissed {
            id,
            reason: DismissReason::Expired,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::manual::ManualScheduler;
    use crate::scheduler::Scheduler;

    fn queue() -> (Arc<ManualScheduler>, NotificationQueue) {
        let scheduler = Arc::new(ManualScheduler::new());
        let queue = NotificationQueue::new(scheduler.clone());
        (scheduler, queue)
    }

    fn messages(queue: &NotificationQueue) -> Vec<String> {
        queue.snapshot().into_iter().map(|n| n.message).collect()
    }

    #[test]
    fn test_enqueue_assigns_unique_ids() {
        let (_, queue) = queue();
        let a = queue.info("first");
        let b = queue.info("second");
        assert_ne!(a, b);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_overflow_evicts_single_oldest() {
        let (scheduler, queue) = queue();
        let mut rx = queue.subscribe();

        let first = queue.info("one");
        queue.info("two");
        queue.info("three");
        assert_eq!(scheduler.pending(), 3);

        queue.warning("four");
        assert_eq!(messages(&queue), vec!["two", "three", "four"]);
        // Evicted entry's timer is gone, the new one is armed
        assert_eq!(scheduler.pending(), 3);

        let mut evicted = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let NotificationEvent::Dismissed { id, reason } = event {
                evicted.push((id, reason));
            }
        }
        assert_eq!(evicted, vec![(first, DismissReason::Evicted)]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let (_, queue) = queue();
        for i in 0..20 {
            queue.info(format!("message {}", i));
            assert!(queue.len() <= MAX_VISIBLE);
        }
        assert_eq!(messages(&queue), vec!["message 17", "message 18", "message 19"]);
    }

    #[test]
    fn test_entries_expire_independently() {
        let (scheduler, queue) = queue();
        queue.enqueue("short", NotificationKind::Info, Duration::from_millis(2000));
        queue.enqueue("long", NotificationKind::Error, Duration::from_millis(6000));

        scheduler.advance(Duration::from_millis(2000));
        assert_eq!(messages(&queue), vec!["long"]);

        scheduler.advance(Duration::from_millis(3999));
        assert_eq!(messages(&queue), vec!["long"]);

        scheduler.advance(Duration::from_millis(1));
        assert!(queue.is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_dismiss_is_idempotent() {
        let (scheduler, queue) = queue();
        let id = queue.success("done");
        queue.dismiss(id);
        queue.dismiss(id);
        assert!(queue.is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_dismiss_of_evicted_id_is_noop() {
        let (_, queue) = queue();
        let evicted = queue.info("a");
        queue.info("b");
        queue.info("c");
        queue.info("d");
        queue.dismiss(evicted);
        assert_eq!(messages(&queue), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_clear_all_cancels_every_timer() {
        let (scheduler, queue) = queue();
        queue.info("a");
        queue.error("b");
        queue.clear_all();
        assert!(queue.is_empty());
        assert_eq!(scheduler.pending(), 0);

        // Nothing fires later against the cleared queue
        scheduler.advance(Duration::from_secs(10));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_default_duration_applies_to_kind_helpers() {
        let scheduler = Arc::new(ManualScheduler::new());
        let queue =
            NotificationQueue::with_default_duration(scheduler.clone(), Duration::from_secs(1));
        queue.warning("careful");
        assert_eq!(queue.snapshot()[0].duration, Duration::from_secs(1));
        scheduler.advance(Duration::from_secs(1));
        assert!(queue.is_empty());
        assert_eq!(scheduler.now(), Duration::from_secs(1));
    }
}
