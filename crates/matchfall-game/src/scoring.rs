use matchfall_matcher::Match;

use crate::ScoringConfig;

/// Score earned by one cascade step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// Points awarded, bonuses included.
    pub score: u64,
    /// Matched tiles times the base score, before the multiplier.
    pub base_points: u64,
    /// Cascade multiplier applied to `base_points`.
    pub multiplier: f64,
    /// Cascade step the score was computed for.
    pub combo_count: u32,
    /// Tiles covered by the matches.
    pub tiles_cleared: usize,
}

/// Scores the matches of cascade step `combo_count` (starting at 1).
///
/// Each matched tile is worth `base_score`; the sum is multiplied by
/// `combo_multiplier^(combo_count - 1)` and rounded down. Each match of
/// exactly four then adds `match4_bonus`, and each longer match
/// `match5_bonus`.
///
/// # Examples
///
/// ```
/// use matchfall_core::{Position, TileType};
/// use matchfall_game::{ScoringConfig, calculate_score};
/// use matchfall_matcher::{Direction, Match};
///
/// let run = Match::new(
///     Direction::Horizontal,
///     TileType::new(0),
///     (0..3).map(|x| Position::new(x, 0)).collect(),
/// );
/// let config = ScoringConfig::default();
/// assert_eq!(calculate_score(&[run.clone()], 1, &config).score, 30);
/// assert_eq!(calculate_score(&[run], 2, &config).score, 45);
/// ```
#[must_use]
pub fn calculate_score(matches: &[Match], combo_count: u32, config: &ScoringConfig) -> ScoreBreakdown {
    let tiles_cleared = matches.iter().map(Match::len).sum::<usize>();
    let base_points = tiles_cleared as u64 * config.base_score;
    let exponent = i32::try_from(combo_count.saturating_sub(1)).unwrap_or(i32::MAX);
    let multiplier = config.combo_multiplier.powi(exponent);

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let scaled = (base_points as f64 * multiplier).floor() as u64;
    let bonus = matches
        .iter()
        .map(|m| match m.len() {
            4 => config.match4_bonus,
            len if len >= 5 => config.match5_bonus,
            _ => 0,
        })
        .sum::<u64>();

    ScoreBreakdown {
        score: scaled.saturating_add(bonus),
        base_points,
        multiplier,
        combo_count,
        tiles_cleared,
    }
}
