use derive_more::{Display, IsVariant};
use matchfall_core::{Board, Position, Tile, TileType};

/// Minimum run length that counts as a match.
pub const MIN_MATCH_LEN: usize = 3;

/// The axis a match runs along.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum Direction {
    /// A run within one row.
    #[display("horizontal")]
    Horizontal,
    /// A run within one column.
    #[display("vertical")]
    Vertical,
}

/// A maximal run of at least [`MIN_MATCH_LEN`] same-typed tiles along one axis.
///
/// Positions are ordered left-to-right for horizontal matches and
/// top-to-bottom for vertical ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    direction: Direction,
    tile_type: TileType,
    positions: Vec<Position>,
}

impl Match {
    /// Creates a match from its parts.
    #[must_use]
    pub fn new(direction: Direction, tile_type: TileType, positions: Vec<Position>) -> Self {
        Self {
            direction,
            tile_type,
            positions,
        }
    }

    /// Returns the axis of the run.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the shared type of the matched tiles.
    #[must_use]
    pub fn tile_type(&self) -> TileType {
        self.tile_type
    }

    /// Returns the run's positions in scan order.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Returns the run length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if the match has no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns `true` if the run covers `pos`.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.positions.contains(&pos)
    }

    /// Returns the run's middle position (index `len / 2`).
    #[must_use]
    pub fn center(&self) -> Option<Position> {
        self.positions.get(self.positions.len() / 2).copied()
    }
}

/// Finds every match on the board.
///
/// Each row is scanned left to right, then each column top to bottom. Empty
/// cells end a run. A run longer than three yields a single match covering
/// the whole run. A tile may belong to both a horizontal and a vertical match.
///
/// # Examples
///
/// ```
/// use matchfall_core::{Board, Position};
/// use matchfall_matcher::find_matches;
///
/// let board: Board = "00000".parse().unwrap();
/// let matches = find_matches(&board);
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].len(), 5);
/// ```
#[must_use]
pub fn find_matches(board: &Board) -> Vec<Match> {
    let mut matches = Vec::new();
    for y in 0..board.rows() {
        let line = (0..board.cols()).map(|x| Position::new(x, y));
        scan_line(board, line, Direction::Horizontal, &mut matches);
    }
    for x in 0..board.cols() {
        let line = (0..board.rows()).map(|y| Position::new(x, y));
        scan_line(board, line, Direction::Vertical, &mut matches);
    }
    matches
}

fn scan_line(
    board: &Board,
    line: impl Iterator<Item = Position>,
    direction: Direction,
    out: &mut Vec<Match>,
) {
    let mut run = Vec::new();
    let mut run_type = None;
    for pos in line {
        let tile_type = board.get_tile(pos).map(Tile::tile_type);
        if tile_type.is_some() && tile_type == run_type {
            run.push(pos);
            continue;
        }
        flush_run(&mut run, run_type, direction, out);
        run_type = tile_type;
        if tile_type.is_some() {
            run.push(pos);
        }
    }
    flush_run(&mut run, run_type, direction, out);
}

fn flush_run(
    run: &mut Vec<Position>,
    run_type: Option<TileType>,
    direction: Direction,
    out: &mut Vec<Match>,
) {
    if let Some(tile_type) = run_type
        && run.len() >= MIN_MATCH_LEN
    {
        out.push(Match::new(direction, tile_type, std::mem::take(run)));
    }
    run.clear();
}

/// Returns `true` if the tile at `pos` is part of a horizontal or vertical
/// run of at least three.
///
/// Only the two axes through `pos` are examined. Special tiles match by type
/// like any other tile.
#[must_use]
pub fn check_match_at_position(board: &Board, pos: Position) -> bool {
    axis_runs(board, pos, false).is_some_and(|(h, v)| h >= MIN_MATCH_LEN || v >= MIN_MATCH_LEN)
}

/// Returns `true` if the tile at `pos` currently completes a run of three,
/// ignoring special tiles.
///
/// A special tile at `pos` never creates a match, and special neighbours end
/// the run. Board generation uses this to pick safe replacement types.
#[must_use]
pub fn would_create_match(board: &Board, pos: Position) -> bool {
    axis_runs(board, pos, true).is_some_and(|(h, v)| h >= MIN_MATCH_LEN || v >= MIN_MATCH_LEN)
}

/// Horizontal and vertical run lengths through `pos`, including `pos` itself.
fn axis_runs(board: &Board, pos: Position, skip_special: bool) -> Option<(usize, usize)> {
    let tile = board.get_tile(pos)?;
    if skip_special && tile.is_special() {
        return None;
    }
    let count = |dx, dy| {
        let mut n = 0;
        let mut cur = pos;
        while let Some(next) = cur.offset(dx, dy) {
            match board.get_tile(next) {
                Some(t) if t.tile_type() == tile.tile_type() && !(skip_special && t.is_special()) => {
                    n += 1;
                    cur = next;
                }
                _ => break,
            }
        }
        n
    };
    Some((1 + count(-1, 0) + count(1, 0), 1 + count(0, -1) + count(0, 1)))
}
