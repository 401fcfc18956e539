//! Search-as-you-type player lookup
//!
//! Input goes through a [`Debouncer`]; each lookup that actually runs is
//! stamped with a generation number and only publishes its suggestion if no
//! newer lookup (or a clear) happened while it was in flight.

use crate::api::ChessApi;
use crate::debounce::Debouncer;
use crate::models::Player;
use crate::notifications::NotificationQueue;
use crate::scheduler::SharedScheduler;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Shortest query worth sending
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce_window: Duration,
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_window: crate::debounce::SEARCH_WINDOW,
            timeout: Duration::from_secs(10),
        }
    }
}

struct Lookup {
    api: Arc<dyn ChessApi>,
    notifications: NotificationQueue,
    timeout: Duration,
    generation: Mutex<u64>,
    suggestion: watch::Sender<Option<Player>>,
    selected: Mutex<Option<String>>,
}

impl Lookup {
    /// Invalidate in-flight lookups and hide the suggestion
    fn invalidate(&self) -> u64 {
        let mut generation = self.generation.lock().unwrap();
        *generation += 1;
        *generation
    }

    fn hide(&self) {
        self.suggestion.send_if_modified(|current| current.take().is_some());
    }

    async fn run(&self, query: String) -> Option<Player> {
        let generation = self.invalidate();
        tracing::debug!("Player search: {:?}", query);

        let player = match tokio::time::timeout(self.timeout, self.api.search_player(&query)).await
        {
            Ok(Ok(player)) => player,
            Ok(Err(e)) => {
                tracing::warn!("Player search for {:?} failed: {}", query, e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Player search for {:?} timed out after {}s",
                    query,
                    self.timeout.as_secs()
                );
                None
            }
        };

        if *self.generation.lock().unwrap() != generation {
            tracing::debug!("Discarding stale search result for {:?}", query);
            return None;
        }

        self.suggestion.send_replace(player.clone());
        player
    }
}

pub struct PlayerSearch {
    lookup: Arc<Lookup>,
    debouncer: Debouncer<String>,
}

impl PlayerSearch {
    pub fn new(
        api: Arc<dyn ChessApi>,
        notifications: NotificationQueue,
        scheduler: SharedScheduler,
        config: SearchConfig,
    ) -> Self {
        let (suggestion, _) = watch::channel(None);
        let lookup = Arc::new(Lookup {
            api,
            notifications,
            timeout: config.timeout,
            generation: Mutex::new(0),
            suggestion,
            selected: Mutex::new(None),
        });

        let weak = Arc::downgrade(&lookup);
        let debouncer = Debouncer::new(scheduler, config.debounce_window, move |query: String| {
            let Some(lookup) = weak.upgrade() else {
                return;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        lookup.run(query).await;
                    });
                }
                Err(_) => tracing::warn!("Player search skipped: no async runtime"),
            }
        });

        Self { lookup, debouncer }
    }

    /// Current suggestion; `None` while hidden
    pub fn subscribe(&self) -> watch::Receiver<Option<Player>> {
        self.lookup.suggestion.subscribe()
    }

    #[allow(dead_code)]
    pub fn suggestion(&self) -> Option<Player> {
        self.lookup.suggestion.borrow().clone()
    }

    /// Feed the current contents of the username input
    pub fn on_input(&self, text: &str) {
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            self.debouncer.cancel();
            self.lookup.invalidate();
            self.lookup.hide();
            return;
        }
        self.debouncer.trigger(query.to_string());
    }

    /// Look a player up right away, bypassing the debounce window
    pub async fn search_now(&self, query: &str) -> Option<Player> {
        self.debouncer.cancel();
        self.lookup.run(query.trim().to_string()).await
    }

    /// Accept a suggestion into the username input
    pub fn select(&self, username: &str) -> String {
        self.debouncer.cancel();
        self.lookup.invalidate();
        self.lookup.hide();

        let username = username.trim().to_string();
        *self.lookup.selected.lock().unwrap() = Some(username.clone());
        self.lookup
            .notifications
            .success(format!("Selected player: {}", username));
        username
    }

    pub fn selected(&self) -> Option<String> {
        self.lookup.selected.lock().unwrap().clone()
    }

    /// Drop any pending or in-flight lookup (teardown)
    pub fn cancel(&self) {
        self.debouncer.cancel();
        self.lookup.invalidate();
    }
}

/// One-line description of a suggestion
pub fn describe(player: &Player) -> String {
    let mut parts = vec![match &player.title {
        Some(title) => format!("{} {}", title, player.username),
        None => player.username.clone(),
    }];
    if let Some(name) = &player.name {
        parts.push(name.clone());
    }
    if let Some(code) = player.country_code() {
        parts.push(code.to_string());
    }
    if player.followers > 0 {
        parts.push(format!("{} followers", player.followers));
    }
    if player.is_streamer {
        parts.push("streamer".to_string());
    }
    parts.join(" · ")
}
