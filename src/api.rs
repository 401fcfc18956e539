//! Analysis backend boundary
//!
//! [`ChessApi`] is the seam between the client core and the remote service.
//! Implementations classify every failure into an [`ApiErrorKind`] here, at
//! the boundary, so callers never have to look at status codes or messages.

use crate::error::ApiError;
use crate::models::{
    AdvancedAnalysis, AdvancedAnalysisResponse, AnalysisRequest, Player, PlayerSearchResponse,
    QuickAnalysis, QuickAnalysisResponse, SessionStatus,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Time allowed to establish a connection to the backend
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ChessApi: Send + Sync {
    /// Current server-side analysis session
    async fn session_status(&self) -> Result<SessionStatus, ApiError>;

    /// Look up a player by (partial) username; `Ok(None)` when nobody matches
    async fn search_player(&self, username: &str) -> Result<Option<Player>, ApiError>;

    async fn quick_analysis(&self, request: &AnalysisRequest) -> Result<QuickAnalysis, ApiError>;

    async fn advanced_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AdvancedAnalysis, ApiError>;
}

/// Responses that carry the backend's `{ success, error }` envelope
trait Envelope {
    fn success(&self) -> bool;
    fn error(&self) -> Option<&str>;
}

impl Envelope for QuickAnalysisResponse {
    fn success(&self) -> bool {
        self.success
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Envelope for AdvancedAnalysisResponse {
    fn success(&self) -> bool {
        self.success
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Envelope for PlayerSearchResponse {
    fn success(&self) -> bool {
        self.success
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// HTTP implementation against the analysis web service
///
/// Keeps a cookie store so the server can tie analyses to this client's session.
pub struct HttpChessApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChessApi {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Analysis backend: {}", base_url);

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request whose body uses the `{ success, error }` envelope
    async fn send<T>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Envelope,
    {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        classify(status, &text)
    }
}

/// Map a status code and raw body onto the envelope type or a typed error
///
/// 404 is `NotFound`; any other non-success status, `success: false`, or a
/// body that does not parse is `Server`, carrying the backend's `error` text
/// when there is one.
fn classify<T>(status: StatusCode, text: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + Envelope,
{
    let body: Option<T> = serde_json::from_str(text).ok();
    let backend_error = body
        .as_ref()
        .and_then(|b| b.error())
        .map(str::to_string);

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::not_found(
            backend_error.unwrap_or_else(|| "not found".to_string()),
        ));
    }

    match body {
        Some(body) if status.is_success() && body.success() => Ok(body),
        Some(_) => Err(ApiError::server(
            backend_error.unwrap_or_else(|| format!("request failed ({})", status)),
        )),
        None => Err(ApiError::server(format!(
            "unreadable response ({}, {} bytes)",
            status,
            text.len()
        ))),
    }
}

#[async_trait]
impl ChessApi for HttpChessApi {
    async fn session_status(&self) -> Result<SessionStatus, ApiError> {
        let response = self.client.get(self.url("/api/session_status")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::server(format!("session status returned {}", status)));
        }
        Ok(response.json::<SessionStatus>().await?)
    }

    async fn search_player(&self, username: &str) -> Result<Option<Player>, ApiError> {
        let request = self
            .client
            .get(self.url("/api/player_search"))
            .query(&[("username", username)]);

        match self.send::<PlayerSearchResponse>(request).await {
            Ok(body) => Ok(body.player),
            Err(err) if err.kind == crate::error::ApiErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn quick_analysis(&self, request: &AnalysisRequest) -> Result<QuickAnalysis, ApiError> {
        let body: QuickAnalysisResponse = self
            .send(self.client.post(self.url("/analyze")).json(request))
            .await?;

        Ok(QuickAnalysis {
            username: body.username.unwrap_or_else(|| request.username.clone()),
            games: body.games,
            stats: body.stats.unwrap_or_default(),
        })
    }

    async fn advanced_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AdvancedAnalysis, ApiError> {
        let body: AdvancedAnalysisResponse = self
            .send(self.client.post(self.url("/analyze_advanced")).json(request))
            .await?;

        let mut analysis = body
            .analysis
            .ok_or_else(|| ApiError::server("response is missing the analysis summary"))?;
        if analysis.username.is_empty() {
            analysis.username = request.username.clone();
        }
        Ok(analysis)
    }
}

/// Scripted in-memory backend for tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    pub struct ScriptedApi {
        pub session: Mutex<Result<SessionStatus, ApiError>>,
        pub quick: Mutex<VecDeque<Result<QuickAnalysis, ApiError>>>,
        pub advanced: Mutex<VecDeque<Result<AdvancedAnalysis, ApiError>>>,
        pub players: Mutex<HashMap<String, Player>>,
        /// Per-query artificial latency for player lookups
        pub search_delays: Mutex<HashMap<String, Duration>>,
        /// Artificial latency for session status requests
        pub session_delay: Mutex<Option<Duration>>,
        /// Every call, in order: "session", "search:<q>", "quick:<user>", "advanced:<user>"
        pub calls: Mutex<Vec<String>>,
        /// When set, analysis calls wait for a permit before answering
        gate: Mutex<Option<std::sync::Arc<Semaphore>>>,
    }

    impl ScriptedApi {
        pub fn new() -> Self {
            Self {
                session: Mutex::new(Ok(SessionStatus::default())),
                quick: Mutex::new(VecDeque::new()),
                advanced: Mutex::new(VecDeque::new()),
                players: Mutex::new(HashMap::new()),
                search_delays: Mutex::new(HashMap::new()),
                session_delay: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                gate: Mutex::new(None),
            }
        }

        pub fn set_session(&self, session: Result<SessionStatus, ApiError>) {
            *self.session.lock().unwrap() = session;
        }

        pub fn push_quick(&self, result: Result<QuickAnalysis, ApiError>) {
            self.quick.lock().unwrap().push_back(result);
        }

        pub fn push_advanced(&self, result: Result<AdvancedAnalysis, ApiError>) {
            self.advanced.lock().unwrap().push_back(result);
        }

        pub fn add_player(&self, player: Player) {
            self.players
                .lock()
                .unwrap()
                .insert(player.username.clone(), player);
        }

        /// Hold analysis calls until `release` is called
        pub fn hold(&self) -> std::sync::Arc<Semaphore> {
            let gate = std::sync::Arc::new(Semaphore::new(0));
            *self.gate.lock().unwrap() = Some(gate.clone());
            gate
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        async fn wait_gate(&self) {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        }
    }

    #[async_trait]
    impl ChessApi for ScriptedApi {
        async fn session_status(&self) -> Result<SessionStatus, ApiError> {
            self.record("session".to_string());
            let delay = *self.session_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.session.lock().unwrap().clone()
        }

        async fn search_player(&self, username: &str) -> Result<Option<Player>, ApiError> {
            self.record(format!("search:{}", username));
            let delay = self.search_delays.lock().unwrap().get(username).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.players.lock().unwrap().get(username).cloned())
        }

        async fn quick_analysis(
            &self,
            request: &AnalysisRequest,
        ) -> Result<QuickAnalysis, ApiError> {
            self.record(format!("quick:{}", request.username));
            self.wait_gate().await;
            self.quick
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::server("no scripted response")))
        }

        async fn advanced_analysis(
            &self,
            request: &AnalysisRequest,
        ) -> Result<AdvancedAnalysis, ApiError> {
            self.record(format!("advanced:{}", request.username));
            self.wait_gate().await;
            self.advanced
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::server("no scripted response")))
        }
    }
}
