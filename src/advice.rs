// Coaching tips derived from quick-analysis statistics

use crate::models::GameStats;
use rand::seq::SliceRandom;
use rand::Rng;

/// Every tip that applies to these stats, in a stable order
pub fn tips(stats: &GameStats) -> Vec<&'static str> {
    let mut tips = Vec::new();

    if stats.win_rate > 70.0 {
        tips.push("Excellent results! Keep playing the same way");
    } else if stats.win_rate > 50.0 {
        tips.push("Good results! Try the advanced analysis for deeper improvements");
    } else if stats.win_rate < 40.0 {
        tips.push("There is room to improve. Focus on the basic openings");
    }

    if stats.avg_moves < 25.0 {
        tips.push("Your games are short! Take more time over your decisions");
    } else if stats.avg_moves > 60.0 {
        tips.push("Your games run long! Endgame accuracy may need work");
    }

    if stats.white_win_rate > stats.black_win_rate + 20.0 {
        tips.push("Stronger with white - work on your defences with black");
    } else if stats.black_win_rate > stats.white_win_rate + 10.0 {
        tips.push("Great defence! Try a more attacking style with white");
    }

    tips
}

/// One applicable tip picked at random, if any apply
pub fn pick<R: Rng + ?Sized>(stats: &GameStats, rng: &mut R) -> Option<&'static str> {
    tips(stats).choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stats(win_rate: f64, avg_moves: f64, white: f64, black: f64) -> GameStats {
        GameStats {
            win_rate,
            avg_moves,
            white_win_rate: white,
            black_win_rate: black,
            ..GameStats::default()
        }
    }

    #[test]
    fn test_balanced_average_player_gets_no_tips() {
        assert!(tips(&stats(45.0, 40.0, 45.0, 45.0)).is_empty());
        assert_eq!(pick(&stats(45.0, 40.0, 45.0, 45.0), &mut StdRng::seed_from_u64(1)), None);
    }

    #[test]
    fn test_each_category_contributes_one_tip() {
        let tips = tips(&stats(75.0, 20.0, 90.0, 50.0));
        assert_eq!(tips.len(), 3);
        assert!(tips[0].starts_with("Excellent"));
        assert!(tips[1].contains("short"));
        assert!(tips[2].contains("white"));
    }

    #[test]
    fn test_black_advantage_threshold_is_ten_points() {
        assert!(tips(&stats(45.0, 40.0, 40.0, 51.0))
            .iter()
            .any(|t| t.starts_with("Great defence")));
        assert!(tips(&stats(45.0, 40.0, 40.0, 50.0)).is_empty());
    }

    #[test]
    fn test_pick_returns_an_applicable_tip() {
        let stats = stats(30.0, 70.0, 50.0, 50.0);
        let all = tips(&stats);
        let picked = pick(&stats, &mut StdRng::seed_from_u64(42)).unwrap();
        assert!(all.contains(&picked));
    }
}
