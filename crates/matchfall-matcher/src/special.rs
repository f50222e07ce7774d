use std::collections::HashSet;

use derive_more::{Display, IsVariant};
use matchfall_core::{Board, Position, SpecialKind, Tile};

use crate::{Direction, Match};

/// Blast radius used when two bombs are swapped together.
pub const COMBO_BOMB_RANGE: usize = 2;

/// The shape of the match set that produced a special tile.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum MatchShape {
    /// A single straight run.
    #[display("{_0}")]
    Line(Direction),
    /// A horizontal and a vertical run sharing a cell (L or T shape).
    #[display("l-shape")]
    LShape,
}

/// A special tile to be created at `position` once the matched tiles are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTileSpawn {
    /// The kind to promote the surviving tile to.
    pub kind: SpecialKind,
    /// The cell that survives the removal and gets promoted.
    pub position: Position,
    /// The match shape that triggered the spawn.
    pub shape: MatchShape,
    /// Length of the triggering run (sum of both runs for an L/T shape).
    pub match_length: usize,
}

/// The rule that resolved a special-tile combo.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum ComboKind {
    /// Two bombs: a 5×5 blast.
    #[display("double bomb: 5x5 blast")]
    DoubleBomb,
    /// A bomb and a row-clear: three rows.
    #[display("bomb + row clear: three rows")]
    BombRows,
    /// A bomb and a col-clear: three columns.
    #[display("bomb + column clear: three columns")]
    BombCols,
    /// A color-bomb and any special: the whole board.
    #[display("color bomb combo: whole board")]
    ColorBomb,
    /// A row-clear and a col-clear: a cross.
    #[display("cross: full row and column")]
    Cross,
}

/// The effect of swapping two special tiles together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialCombo {
    /// The rule that applied.
    pub kind: ComboKind,
    /// Cells to destroy, without duplicates.
    pub positions: Vec<Position>,
}

impl SpecialCombo {
    /// Returns a human-readable description of the combo.
    #[must_use]
    pub fn description(&self) -> String {
        self.kind.to_string()
    }
}

/// Rules for creating, activating, and combining special tiles.
///
/// # Examples
///
/// ```
/// use matchfall_core::{Board, Position, SpecialKind};
/// use matchfall_matcher::{SpecialTileManager, find_matches};
///
/// let manager = SpecialTileManager::default();
/// let board: Board = "
///     00001
///     12340
/// "
/// .parse()
/// .unwrap();
///
/// let spawn = manager
///     .detect_special_tile_generation(&find_matches(&board))
///     .unwrap();
/// assert_eq!(spawn.kind, SpecialKind::Bomb);
/// assert_eq!(spawn.position, Position::new(2, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTileManager {
    bomb_range: usize,
    base_score: u64,
    bomb_multiplier: u64,
}

impl Default for SpecialTileManager {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

impl SpecialTileManager {
    /// Creates a manager with the given bomb blast radius and base score.
    #[must_use]
    pub fn new(bomb_range: usize, base_score: u64) -> Self {
        Self {
            bomb_range,
            base_score,
            bomb_multiplier: 2,
        }
    }

    /// Sets the per-tile factor paid by bomb activations (default 2).
    #[must_use]
    pub fn with_bomb_multiplier(mut self, bomb_multiplier: u64) -> Self {
        self.bomb_multiplier = bomb_multiplier;
        self
    }

    /// Returns the bomb blast radius.
    #[must_use]
    pub fn bomb_range(&self) -> usize {
        self.bomb_range
    }

    /// Decides which special tile, if any, a cascade step's matches produce.
    ///
    /// Matches are examined longest first (ties keep scan order): a run of
    /// five or more yields a color-bomb at its middle cell, otherwise a run
    /// of exactly four yields a bomb there. Only when no run qualifies are
    /// pairs of crossing runs considered; the first crossing in scan order
    /// yields a row-clear if the earlier run is horizontal and a col-clear
    /// otherwise, placed at the shared cell.
    ///
    /// At most one special tile is produced per call.
    #[must_use]
    pub fn detect_special_tile_generation(&self, matches: &[Match]) -> Option<SpecialTileSpawn> {
        let mut by_length = matches.iter().collect::<Vec<_>>();
        by_length.sort_by_key(|m| std::cmp::Reverse(m.len()));

        for m in by_length {
            let kind = match m.len() {
                5.. => SpecialKind::ColorBomb,
                4 => SpecialKind::Bomb,
                _ => continue,
            };
            return Some(SpecialTileSpawn {
                kind,
                position: m.center()?,
                shape: MatchShape::Line(m.direction()),
                match_length: m.len(),
            });
        }

        detect_l_shape(matches)
    }

    /// Returns the cells destroyed when `tile` is activated by a swap.
    ///
    /// - Bomb: the square of radius [`bomb_range`](Self::bomb_range) around
    ///   the tile, clipped to the board.
    /// - Color-bomb: every tile sharing `partner`'s type, plus the color-bomb
    ///   itself. Without a partner nothing is destroyed.
    /// - Row/col-clear: every occupied cell in the tile's row or column.
    ///
    /// An ordinary tile destroys nothing.
    #[must_use]
    pub fn detect_special_tile_activation(
        &self,
        board: &Board,
        tile: &Tile,
        partner: Option<&Tile>,
    ) -> Vec<Position> {
        let pos = tile.position();
        match tile.special() {
            SpecialKind::None => Vec::new(),
            SpecialKind::Bomb => square(board, pos, self.bomb_range),
            SpecialKind::ColorBomb => {
                let Some(partner) = partner else {
                    return Vec::new();
                };
                let mut positions = board
                    .tiles()
                    .filter(|t| t.tile_type() == partner.tile_type())
                    .map(Tile::position)
                    .collect::<Vec<_>>();
                positions.push(pos);
                dedup(positions)
            }
            SpecialKind::RowClear => occupied_row(board, pos.y).collect(),
            SpecialKind::ColClear => occupied_col(board, pos.x).collect(),
        }
    }

    /// Resolves the swap of two special tiles.
    ///
    /// Rules are tried in this order, and the first that applies wins:
    ///
    /// 1. bomb + bomb: a radius-[`COMBO_BOMB_RANGE`] square around `a`;
    /// 2. bomb + line-clear: the three occupied rows (row-clear partner) or
    ///    columns (col-clear partner) centred on the bomb;
    /// 3. color-bomb + any special: every occupied cell;
    /// 4. row-clear + col-clear: the row-clear's row and the col-clear's column.
    ///
    /// Returns `None` unless both tiles are special and the resulting area is
    /// non-empty.
    #[must_use]
    pub fn detect_special_combo(&self, board: &Board, a: &Tile, b: &Tile) -> Option<SpecialCombo> {
        use SpecialKind::{Bomb, ColClear, ColorBomb, RowClear};

        if !a.is_special() || !b.is_special() {
            return None;
        }

        let (kind, positions) = match (a.special(), b.special()) {
            (Bomb, Bomb) => (
                ComboKind::DoubleBomb,
                square(board, a.position(), COMBO_BOMB_RANGE),
            ),
            (Bomb, line @ (RowClear | ColClear)) | (line @ (RowClear | ColClear), Bomb) => {
                let bomb = if a.special().is_bomb() { a } else { b };
                let center = bomb.position();
                if line.is_row_clear() {
                    let rows = band(center.y, board.rows());
                    let positions = rows.flat_map(|y| occupied_row(board, y)).collect::<Vec<_>>();
                    (ComboKind::BombRows, positions)
                } else {
                    let cols = band(center.x, board.cols());
                    let positions = cols.flat_map(|x| occupied_col(board, x)).collect::<Vec<_>>();
                    (ComboKind::BombCols, positions)
                }
            }
            (ColorBomb, _) | (_, ColorBomb) => (
                ComboKind::ColorBomb,
                board.tiles().map(Tile::position).collect(),
            ),
            (RowClear, ColClear) | (ColClear, RowClear) => {
                let (row_tile, col_tile) = if a.special().is_row_clear() {
                    (a, b)
                } else {
                    (b, a)
                };
                let positions = occupied_row(board, row_tile.position().y)
                    .chain(occupied_col(board, col_tile.position().x))
                    .collect::<Vec<_>>();
                (ComboKind::Cross, dedup(positions))
            }
            _ => return None,
        };

        if positions.is_empty() {
            return None;
        }
        log::debug!("special combo {kind}: {} cells", positions.len());
        Some(SpecialCombo { kind, positions })
    }

    /// Extra score for a special activation that cleared `tiles_cleared` tiles.
    ///
    /// Bombs pay the bomb multiplier (double by default) times the base score
    /// per tile, color-bombs five times and line-clears three times. Ordinary
    /// tiles pay nothing.
    #[must_use]
    pub fn calculate_special_bonus(&self, kind: SpecialKind, tiles_cleared: usize) -> u64 {
        let factor = match kind {
            SpecialKind::None => 0,
            SpecialKind::Bomb => self.bomb_multiplier,
            SpecialKind::ColorBomb => 5,
            SpecialKind::RowClear | SpecialKind::ColClear => 3,
        };
        tiles_cleared as u64 * self.base_score * factor
    }
}

fn detect_l_shape(matches: &[Match]) -> Option<SpecialTileSpawn> {
    for (i, first) in matches.iter().enumerate() {
        for second in &matches[i + 1..] {
            if first.direction() == second.direction() {
                continue;
            }
            let Some(&position) = first.positions().iter().find(|&&p| second.contains(p)) else {
                continue;
            };
            let kind = match first.direction() {
                Direction::Horizontal => SpecialKind::RowClear,
                Direction::Vertical => SpecialKind::ColClear,
            };
            return Some(SpecialTileSpawn {
                kind,
                position,
                shape: MatchShape::LShape,
                match_length: first.len() + second.len(),
            });
        }
    }
    None
}

/// All on-board cells within Chebyshev distance `range` of `center`.
fn square(board: &Board, center: Position, range: usize) -> Vec<Position> {
    let last_row = center.y.saturating_add(range).min(board.rows() - 1);
    let rows = center.y.saturating_sub(range)..=last_row;
    rows.flat_map(|y| {
        let last_col = center.x.saturating_add(range).min(board.cols() - 1);
        let cols = center.x.saturating_sub(range)..=last_col;
        cols.map(move |x| Position::new(x, y))
    })
    .collect()
}

/// Indices `center - 1 ..= center + 1`, clipped to `0..len`.
fn band(center: usize, len: usize) -> impl Iterator<Item = usize> {
    center.saturating_sub(1)..(center + 2).min(len)
}

fn occupied_row(board: &Board, y: usize) -> impl Iterator<Item = Position> + '_ {
    (0..board.cols())
        .map(move |x| Position::new(x, y))
        .filter(|&pos| board.get_tile(pos).is_some())
}

fn occupied_col(board: &Board, x: usize) -> impl Iterator<Item = Position> + '_ {
    (0..board.rows())
        .map(move |y| Position::new(x, y))
        .filter(|&pos| board.get_tile(pos).is_some())
}

/// Removes repeated positions, keeping first occurrences in order.
fn dedup(positions: Vec<Position>) -> Vec<Position> {
    let mut seen = HashSet::with_capacity(positions.len());
    positions.into_iter().filter(|&pos| seen.insert(pos)).collect()
}
