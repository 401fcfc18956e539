// Plain-text rendering of core state for the terminal front-ends
//
// Pure formatting only; nothing here touches the core.

use crate::models::{AdvancedAnalysis, AnalysisSession, Player, QuickAnalysis};
use crate::notifications::{DismissReason, Notification, NotificationEvent};
use crate::progress::{ProgressSnapshot, ProgressState};
use crate::search;

const BAR_WIDTH: usize = 30;

pub fn notification_line(notification: &Notification) -> String {
    format!(
        "[{}] {}",
        notification.kind.title(),
        notification.message
    )
}

/// Line for a notification lifecycle event; expiries and clears stay silent
pub fn event_line(event: &NotificationEvent) -> Option<String> {
    match event {
        NotificationEvent::Shown(notification) => Some(notification_line(notification)),
        NotificationEvent::Dismissed {
            reason: DismissReason::Evicted,
            id,
        } => Some(format!("  ({} dismissed to make room)", id)),
        NotificationEvent::Dismissed { .. } => None,
    }
}

pub fn progress_line(snapshot: &ProgressSnapshot) -> Option<String> {
    if !snapshot.visible {
        return None;
    }
    let filled = ((snapshot.percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let step = match snapshot.state {
        ProgressState::Running if snapshot.total_steps > 0 => format!(
            " ({}/{})",
            snapshot.step_index + 1,
            snapshot.total_steps
        ),
        _ => String::new(),
    };
    Some(format!(
        "  [{}{}] {:>3.0}% {}{}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        snapshot.percent,
        snapshot.label,
        step
    ))
}

pub fn quick_summary(result: &QuickAnalysis) -> String {
    let s = &result.stats;
    let mut out = format!(
        "Quick analysis for {}\n  Games: {} ({} W / {} L / {} D)\n  Win rate: {:.1}%  (white {:.1}%, black {:.1}%)\n  Average moves: {:.1}",
        result.username,
        s.total_games,
        s.wins,
        s.losses,
        s.draws,
        s.win_rate,
        s.white_win_rate,
        s.black_win_rate,
        s.avg_moves
    );
    if s.avg_quality > 0.0 {
        out.push_str(&format!("\n  Average quality: {:.1}/10", s.avg_quality));
    }
    for game in result.games.iter().take(5) {
        out.push_str(&format!(
            "\n    {:<5} as {:<5} {} vs {} ({} moves, {})",
            game.player_result,
            game.player_color,
            game.white_player,
            game.black_player,
            game.total_moves,
            if game.opening.is_empty() {
                "unknown opening"
            } else {
                game.opening.as_str()
            }
        ));
    }
    out
}

pub fn advanced_summary(result: &AdvancedAnalysis) -> String {
    let stats = &result.advanced_stats;
    let mut out = format!(
        "Advanced analysis for {}\n  Games analyzed: {}\n  Distinct openings: {}\n  Trend: {}",
        result.username,
        result.total_analyzed,
        stats.openings_analysis.total_openings_count,
        if stats.trend_analysis.trend.is_empty() {
            "n/a"
        } else {
            stats.trend_analysis.trend.as_str()
        }
    );
    for strength in &stats.strengths_and_weaknesses.strengths {
        out.push_str(&format!("\n  + {}", strength));
    }
    for weakness in &stats.strengths_and_weaknesses.weaknesses {
        out.push_str(&format!("\n  - {}", weakness));
    }
    out.push_str("\n  Details: open deep_analysis | statistics | filter_games");
    out
}

pub fn session_summary(session: &AnalysisSession, now: i64) -> String {
    if !session.has_any_analysis() {
        return "No analysis in this session".to_string();
    }
    let kind = if session.has_advanced_analysis {
        "advanced"
    } else {
        "basic"
    };
    let mut out = format!(
        "Session: {} analysis for {}",
        kind,
        session.username.as_deref().unwrap_or("unknown")
    );
    if let Some(games) = session.games_count {
        out.push_str(&format!(" ({} games)", games));
    }
    match session.seconds_remaining(now) {
        Some(remaining) if remaining > 0 => {
            out.push_str(&format!(", expires in {}m", remaining / 60))
        }
        Some(_) => out.push_str(", expired"),
        None => {}
    }
    out.push_str(&format!(", {:.2} KB", session.session_size_kb));
    out
}

pub fn suggestion_line(player: &Player) -> String {
    format!(
        "  Suggestion: {}  (select {} to use)",
        search::describe(player),
        player.username
    )
}
