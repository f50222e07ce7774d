//! Game configuration.
//!
//! Every section derives `serde` with `#[serde(default)]`, so a partial
//! document (for example a JSON file that only sets `board.rows`) fills the
//! remaining fields from [`GameConfig::default`].

use std::{ops::RangeInclusive, time::Duration};

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Allowed board row and column counts.
pub const BOARD_SIZE_RANGE: RangeInclusive<usize> = 4..=20;
/// Allowed tile type counts.
pub const TILE_TYPES_RANGE: RangeInclusive<u8> = 3..=10;
/// Allowed bomb blast radii.
pub const BOMB_RANGE_RANGE: RangeInclusive<usize> = 1..=20;
/// Allowed tile pixel sizes.
pub const TILE_SIZE_RANGE: RangeInclusive<u32> = 32..=128;

/// Errors reported by [`GameConfig::validate`].
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Row count outside [`BOARD_SIZE_RANGE`].
    #[display("board rows must be within 4..=20, got {_0}")]
    Rows(#[error(not(source))] usize),
    /// Column count outside [`BOARD_SIZE_RANGE`].
    #[display("board cols must be within 4..=20, got {_0}")]
    Cols(#[error(not(source))] usize),
    /// Tile type count outside [`TILE_TYPES_RANGE`].
    #[display("tile types must be within 3..=10, got {_0}")]
    TileTypes(#[error(not(source))] u8),
    /// Tile pixel size outside [`TILE_SIZE_RANGE`].
    #[display("tile size must be within 32..=128, got {_0}")]
    TileSize(#[error(not(source))] u32),
    /// Bomb radius outside [`BOMB_RANGE_RANGE`].
    #[display("bomb range must be within 1..=20, got {_0}")]
    BombRange(#[error(not(source))] usize),
    /// Combo multiplier below 1 or not finite.
    #[display("combo multiplier must be a finite number >= 1, got {_0}")]
    ComboMultiplier(#[error(not(source))] f64),
}

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board dimensions and tile variety.
    pub board: BoardConfig,
    /// Animation durations, used as opaque delays by the engine.
    pub animation: AnimationConfig,
    /// Scoring constants.
    pub scoring: ScoringConfig,
    /// Session clock.
    pub timer: TimerConfig,
    /// Special-tile tuning.
    pub special: SpecialConfig,
    /// Rendering hints (validated, not used by the engine).
    pub rendering: RenderingConfig,
}

impl GameConfig {
    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    ///
    /// # Examples
    ///
    /// ```
    /// use matchfall_game::{ConfigError, GameConfig};
    ///
    /// let mut config = GameConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.board.tile_types = 2;
    /// assert_eq!(config.validate(), Err(ConfigError::TileTypes(2)));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let BoardConfig {
            rows,
            cols,
            tile_types,
        } = self.board;
        if !BOARD_SIZE_RANGE.contains(&rows) {
            return Err(ConfigError::Rows(rows));
        }
        if !BOARD_SIZE_RANGE.contains(&cols) {
            return Err(ConfigError::Cols(cols));
        }
        if !TILE_TYPES_RANGE.contains(&tile_types) {
            return Err(ConfigError::TileTypes(tile_types));
        }
        if !TILE_SIZE_RANGE.contains(&self.rendering.tile_size) {
            return Err(ConfigError::TileSize(self.rendering.tile_size));
        }
        if !BOMB_RANGE_RANGE.contains(&self.special.bomb_range) {
            return Err(ConfigError::BombRange(self.special.bomb_range));
        }
        let multiplier = self.scoring.combo_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::ComboMultiplier(multiplier));
        }
        Ok(())
    }
}

/// Board dimensions and tile variety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Number of distinct tile types.
    pub tile_types: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            tile_types: 5,
        }
    }
}

/// Animation durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Swap and swap-back.
    pub swap_ms: u64,
    /// Tile removal.
    pub remove_ms: u64,
    /// Gravity.
    pub fall_ms: u64,
    /// Refill.
    pub spawn_ms: u64,
    /// Pause before a dead board is reshuffled.
    pub shuffle_delay_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            swap_ms: 200,
            remove_ms: 300,
            fall_ms: 400,
            spawn_ms: 200,
            shuffle_delay_ms: 2000,
        }
    }
}

impl AnimationConfig {
    /// Swap duration.
    #[must_use]
    pub fn swap(&self) -> Duration {
        Duration::from_millis(self.swap_ms)
    }

    /// Removal duration.
    #[must_use]
    pub fn remove(&self) -> Duration {
        Duration::from_millis(self.remove_ms)
    }

    /// Gravity duration.
    #[must_use]
    pub fn fall(&self) -> Duration {
        Duration::from_millis(self.fall_ms)
    }

    /// Refill duration.
    #[must_use]
    pub fn spawn(&self) -> Duration {
        Duration::from_millis(self.spawn_ms)
    }

    /// Delay before a reshuffle.
    #[must_use]
    pub fn shuffle_delay(&self) -> Duration {
        Duration::from_millis(self.shuffle_delay_ms)
    }
}

/// Scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per matched tile.
    pub base_score: u64,
    /// Per-cascade-step score growth factor.
    pub combo_multiplier: f64,
    /// Flat bonus for each match of exactly four.
    pub match4_bonus: u64,
    /// Flat bonus for each match of five or more.
    pub match5_bonus: u64,
    /// Per-tile factor (times `base_score`) paid by bomb activations.
    pub special_tile_multiplier: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 10,
            combo_multiplier: 1.5,
            match4_bonus: 20,
            match5_bonus: 50,
            special_tile_multiplier: 2,
        }
    }
}

/// Session clock settings, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Session length.
    pub default_time_secs: u64,
    /// Remaining time at which a warning is emitted.
    pub warning_time_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_time_secs: 60,
            warning_time_secs: 10,
        }
    }
}

impl TimerConfig {
    /// Session length.
    #[must_use]
    pub fn default_time(&self) -> Duration {
        Duration::from_secs(self.default_time_secs)
    }

    /// Warning threshold.
    #[must_use]
    pub fn warning_time(&self) -> Duration {
        Duration::from_secs(self.warning_time_secs)
    }
}

/// Special-tile tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialConfig {
    /// Blast radius of a single bomb (1 gives a 3×3 square).
    pub bomb_range: usize,
}

impl Default for SpecialConfig {
    fn default() -> Self {
        Self { bomb_range: 1 }
    }
}

/// Rendering hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Tile edge length in pixels.
    pub tile_size: u32,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self { tile_size: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.board.rows, 8);
        assert_eq!(config.animation.shuffle_delay(), Duration::from_secs(2));
        assert_eq!(config.timer.default_time(), Duration::from_secs(60));
    }

    #[test]
    fn test_validate_bounds() {
        let check = |f: fn(&mut GameConfig)| {
            let mut config = GameConfig::default();
            f(&mut config);
            config.validate()
        };
        assert_eq!(check(|c| c.board.rows = 3), Err(ConfigError::Rows(3)));
        assert_eq!(check(|c| c.board.rows = 20), Ok(()));
        assert_eq!(check(|c| c.board.cols = 21), Err(ConfigError::Cols(21)));
        assert_eq!(check(|c| c.board.cols = 4), Ok(()));
        assert_eq!(check(|c| c.board.tile_types = 11), Err(ConfigError::TileTypes(11)));
        assert_eq!(check(|c| c.board.tile_types = 3), Ok(()));
        assert_eq!(check(|c| c.rendering.tile_size = 31), Err(ConfigError::TileSize(31)));
        assert_eq!(check(|c| c.rendering.tile_size = 128), Ok(()));
        assert_eq!(
            check(|c| c.scoring.combo_multiplier = 0.5),
            Err(ConfigError::ComboMultiplier(0.5))
        );
        assert!(check(|c| c.scoring.combo_multiplier = f64::NAN).is_err());
        assert_eq!(check(|c| c.special.bomb_range = 0), Err(ConfigError::BombRange(0)));
        assert_eq!(check(|c| c.special.bomb_range = 20), Ok(()));
        assert_eq!(
            check(|c| c.special.bomb_range = usize::MAX),
            Err(ConfigError::BombRange(usize::MAX))
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "board": { "rows": 10 }, "scoring": { "base_score": 5 } }"#)
                .unwrap();
        assert_eq!(config.board.rows, 10);
        assert_eq!(config.board.cols, 8);
        assert_eq!(config.scoring.base_score, 5);
        assert!((config.scoring.combo_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.special.bomb_range, 1);
    }
}
