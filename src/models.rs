// Data exchanged with the analysis backend
//
// Wire types mirror the backend's JSON exactly (snake_case, optional fields
// defaulted) so a partially filled response still deserializes. The client
// snapshot types (`AnalysisSession`, `QuickAnalysis`) are what the rest of
// the crate works with once a response has been accepted.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Raw `/api/session_status` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub has_basic_analysis: bool,
    #[serde(default)]
    pub has_advanced_analysis: bool,
    pub basic_analysis_username: Option<String>,
    pub advanced_analysis_username: Option<String>,
    pub basic_analysis_games: Option<u32>,
    pub advanced_analysis_games: Option<u32>,
    /// Unix epoch seconds
    pub analysis_expires_at: Option<i64>,
    #[serde(default)]
    pub session_size_kb: f64,
}

/// Client-side snapshot of the server-held analysis session
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSession {
    pub has_basic_analysis: bool,
    pub has_advanced_analysis: bool,
    pub username: Option<String>,
    pub games_count: Option<u32>,
    pub expires_at: Option<i64>,
    pub session_size_kb: f64,
}

impl AnalysisSession {
    pub fn has_any_analysis(&self) -> bool {
        self.has_basic_analysis || self.has_advanced_analysis
    }

    /// Seconds until the advanced analysis expires, if it has a known expiry
    pub fn seconds_remaining(&self, now: i64) -> Option<i64> {
        if !self.has_advanced_analysis {
            return None;
        }
        self.expires_at.map(|expires| expires - now)
    }
}

impl From<SessionStatus> for AnalysisSession {
    fn from(status: SessionStatus) -> Self {
        // The advanced analysis wins when both exist. The backend reports an
        // absent analysis as 0 games / empty username rather than null.
        Self {
            has_basic_analysis: status.has_basic_analysis,
            has_advanced_analysis: status.has_advanced_analysis,
            username: status
                .advanced_analysis_username
                .filter(|name| !name.is_empty())
                .or(status.basic_analysis_username),
            games_count: status
                .advanced_analysis_games
                .filter(|n| *n > 0)
                .or(status.basic_analysis_games),
            expires_at: status.analysis_expires_at,
            session_size_kb: status.session_size_kb,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player lookup
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub title: Option<String>,
    /// Country resource URL, e.g. `https://api.chess.com/pub/country/DZ`
    pub country: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub is_streamer: bool,
}

impl Player {
    /// Country code from the trailing segment of the country URL
    pub fn country_code(&self) -> Option<&str> {
        self.country
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .filter(|code| !code.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSearchResponse {
    #[serde(default)]
    pub success: bool,
    pub player: Option<Player>,
    pub error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub username: String,
    pub max_games: u32,
}

/// Which backend analysis a run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Quick,
    Advanced,
}

impl AnalysisKind {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Quick => "quick analysis",
            AnalysisKind::Advanced => "advanced analysis",
        }
    }
}

/// One analyzed game as returned by both analysis endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub player_result: String,
    pub player_color: String,
    #[serde(default)]
    pub white_player: String,
    #[serde(default)]
    pub black_player: String,
    #[serde(default)]
    pub opening: String,
    #[serde(default)]
    pub total_moves: u32,
    pub game_quality: Option<f64>,
    #[serde(default)]
    pub time_control: String,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub date: String,
    /// Minutes
    #[serde(default)]
    pub game_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_rate: f64,
    pub white_win_rate: f64,
    pub black_win_rate: f64,
    pub avg_moves: f64,
    #[serde(default)]
    pub avg_quality: f64,
}

/// Raw `/analyze` response
#[derive(Debug, Clone, Deserialize)]
pub struct QuickAnalysisResponse {
    #[serde(default)]
    pub success: bool,
    pub username: Option<String>,
    #[serde(default)]
    pub games: Vec<Game>,
    pub stats: Option<GameStats>,
    pub error: Option<String>,
}

/// Accepted quick analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickAnalysis {
    pub username: String,
    pub games: Vec<Game>,
    pub stats: GameStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningsAnalysis {
    #[serde(default)]
    pub total_openings_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    #[serde(default)]
    pub trend: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrengthsAndWeaknesses {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedStats {
    #[serde(default)]
    pub openings_analysis: OpeningsAnalysis,
    #[serde(default)]
    pub trend_analysis: TrendAnalysis,
    #[serde(default)]
    pub strengths_and_weaknesses: StrengthsAndWeaknesses,
}

/// Advanced analysis summary (the backend keeps the full result server-side)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalysis {
    #[serde(default)]
    pub username: String,
    pub analysis_id: Option<String>,
    pub total_analyzed: u32,
    #[serde(default)]
    pub advanced_stats: AdvancedStats,
    #[serde(default)]
    pub games: Vec<Game>,
}

/// Raw `/analyze_advanced` response
#[derive(Debug, Clone, Deserialize)]
pub struct AdvancedAnalysisResponse {
    #[serde(default)]
    pub success: bool,
    pub analysis: Option<AdvancedAnalysis>,
    pub error: Option<String>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_only_session_reports_basic_count() {
        let body = r#"{
            "has_basic_analysis": true,
            "has_advanced_analysis": false,
            "session_keys": ["basic_analysis"],
            "basic_analysis_username": "hikaru",
            "advanced_analysis_username": null,
            "basic_analysis_games": 25,
            "advanced_analysis_games": 0,
            "session_size_kb": 1.2,
            "timestamp": 1704067200,
            "analysis_expires_at": null,
            "storage_files": 0,
            "storage_size_mb": 0.0
        }"#;
        let status: SessionStatus = serde_json::from_str(body).unwrap();
        let session = AnalysisSession::from(status);
        assert_eq!(session.username.as_deref(), Some("hikaru"));
        assert_eq!(session.games_count, Some(25));
        assert_eq!(session.expires_at, None);
    }

    #[test]
    fn test_session_status_prefers_advanced_fields() {
        let status = SessionStatus {
            has_basic_analysis: true,
            has_advanced_analysis: true,
            basic_analysis_username: Some("basic_user".to_string()),
            advanced_analysis_username: Some("adv_user".to_string()),
            basic_analysis_games: Some(20),
            advanced_analysis_games: Some(80),
            analysis_expires_at: Some(100),
            session_size_kb: 1.5,
        };
        let session = AnalysisSession::from(status);
        assert_eq!(session.username.as_deref(), Some("adv_user"));
        assert_eq!(session.games_count, Some(80));
        assert_eq!(session.seconds_remaining(40), Some(60));
    }

    #[test]
    fn test_basic_only_session_has_no_expiry_countdown() {
        let status: SessionStatus = serde_json::from_str(
            r#"{"has_basic_analysis": true, "has_advanced_analysis": false,
                "basic_analysis_username": "hikaru", "basic_analysis_games": 25,
                "session_size_kb": 2.1}"#,
        )
        .unwrap();
        let session = AnalysisSession::from(status);
        assert!(session.has_any_analysis());
        assert_eq!(session.username.as_deref(), Some("hikaru"));
        assert_eq!(session.seconds_remaining(0), None);
    }

    #[test]
    fn test_quick_response_parses_backend_payload() {
        let body = r#"{
            "success": true,
            "username": "hikaru",
            "games": [{
                "player_result": "win", "player_color": "white",
                "white_player": "hikaru", "black_player": "someone",
                "opening": "Ruy Lopez", "total_moves": 34, "game_quality": 8.2,
                "time_control": "180", "rated": true, "date": "2024-03-01",
                "game_duration": 6
            }],
            "stats": {"total_games": 1, "wins": 1, "losses": 0, "draws": 0,
                      "win_rate": 100.0, "white_win_rate": 100.0, "black_win_rate": 0,
                      "avg_moves": 34.0, "avg_quality": 8.2}
        }"#;
        let response: QuickAnalysisResponse = serde_json::from_str(body).unwrap();
        assert!(response.success);
        assert_eq!(response.games.len(), 1);
        assert_eq!(response.games[0].total_moves, 34);
        assert_eq!(response.stats.unwrap().wins, 1);
    }

    #[test]
    fn test_player_country_code() {
        let player = Player {
            username: "magnus".to_string(),
            name: None,
            avatar: None,
            title: Some("GM".to_string()),
            country: Some("https://api.chess.com/pub/country/NO".to_string()),
            followers: 10,
            is_streamer: false,
        };
        assert_eq!(player.country_code(), Some("NO"));
    }
}
