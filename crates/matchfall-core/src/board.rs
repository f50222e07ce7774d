use std::{collections::HashSet, fmt, str::FromStr};

use derive_more::{Display, Error};

use crate::{Position, SpecialKind, Tile, TileId, TileType};

/// Errors reported by [`Board`] construction, parsing, and invariant checks.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The requested board has zero rows or columns.
    #[display("board dimensions must be non-zero, got {rows}x{cols}")]
    InvalidDimensions {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },
    /// A board literal contains no rows.
    #[display("board literal has no rows")]
    EmptyLiteral,
    /// A board literal row has a different width than the first row.
    #[display("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Cells found in the row.
        found: usize,
        /// Cells found in the first row.
        expected: usize,
    },
    /// A board literal contains a character that is neither a digit nor `.`.
    #[display("invalid cell character {ch:?} in row {row}")]
    InvalidCell {
        /// The offending character.
        ch: char,
        /// Zero-based row index.
        row: usize,
    },
    /// A tile records a position different from the slot holding it.
    #[display("tile {id} in slot {slot} records position {recorded}")]
    PositionMismatch {
        /// The tile's identity.
        id: TileId,
        /// The slot the tile occupies.
        slot: Position,
        /// The position stored on the tile.
        recorded: Position,
    },
    /// Two slots hold tiles with the same identity.
    #[display("tile id {id} appears more than once")]
    DuplicateId {
        /// The duplicated identity.
        id: TileId,
    },
    /// A cell is empty where a fully populated board is required.
    #[display("cell {position} is empty")]
    EmptyCell {
        /// The empty cell.
        position: Position,
    },
}

/// A tile that changed position during [`Board::apply_gravity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMove {
    /// The tile after the move (its position equals `to`).
    pub tile: Tile,
    /// The slot the tile left.
    pub from: Position,
    /// The slot the tile landed in.
    pub to: Position,
}

/// A `rows × cols` grid of tiles.
///
/// Cells are `None` only transiently, between a removal and the following
/// refill. Every occupied cell holds a tile whose recorded
/// [`position`](Tile::position) equals the cell, and tile identities are
/// unique across the board. Identities are allocated from a per-board
/// counter, so two boards can reuse the same ids.
///
/// # Text format
///
/// [`Display`](fmt::Display) and [`FromStr`] use one line per row, with a
/// digit per tile type and `.` for an empty cell. Leading whitespace and
/// blank lines are ignored when parsing.
///
/// ```
/// use matchfall_core::{Board, Position};
///
/// let board: Board = "
///     01.
///     210
/// "
/// .parse()
/// .unwrap();
/// assert_eq!(board.rows(), 2);
/// assert_eq!(board.cols(), 3);
/// assert!(board.get_tile(Position::new(2, 0)).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Tile>>,
    next_id: u64,
}

impl Board {
    /// Creates an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidDimensions`] if `rows` or `cols` is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self, BoardError> {
        if rows == 0 || cols == 0 {
            return Err(BoardError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            next_id: 0,
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `true` if `pos` lies on the board.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.cols && pos.y < self.rows
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.cols + pos.x)
    }

    /// Returns every position on the board in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let cols = self.cols;
        (0..self.rows * self.cols).map(move |i| Position::new(i % cols, i / cols))
    }

    /// Returns every tile on the board in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    /// Returns the tile at `pos`, or `None` if the cell is empty or out of range.
    #[must_use]
    pub fn get_tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    /// Places `tile` at `pos`, rewriting the tile's recorded position.
    ///
    /// Passing `None` empties the cell. An out-of-range position is logged
    /// and ignored.
    ///
    /// Returns `true` if the cell was written.
    pub fn set_tile(&mut self, pos: Position, tile: Option<Tile>) -> bool {
        let Some(i) = self.index(pos) else {
            log::warn!("ignoring set_tile at out-of-range position {pos}");
            return false;
        };
        self.cells[i] = tile.map(|mut tile| {
            tile.set_position(pos);
            tile
        });
        true
    }

    /// Creates a new ordinary tile with a fresh identity at `pos`, replacing
    /// whatever the cell held.
    ///
    /// Returns the created tile, or `None` (with a warning) if `pos` is out
    /// of range.
    pub fn spawn_tile(&mut self, pos: Position, tile_type: TileType) -> Option<Tile> {
        let Some(i) = self.index(pos) else {
            log::warn!("ignoring spawn_tile at out-of-range position {pos}");
            return None;
        };
        let tile = Tile::new(TileId::new(self.next_id), tile_type, pos);
        self.next_id += 1;
        self.cells[i] = Some(tile);
        Some(tile)
    }

    /// Returns `true` if both positions are on the board and orthogonally adjacent.
    #[must_use]
    pub fn is_adjacent(&self, a: Position, b: Position) -> bool {
        self.contains(a) && self.contains(b) && a.is_adjacent(b)
    }

    /// Exchanges the tiles at `a` and `b`, updating their recorded positions.
    ///
    /// Adjacency is not required here; callers enforce it.
    ///
    /// Returns `false` and leaves the board untouched if either position is
    /// out of range or empty.
    pub fn swap_tiles(&mut self, a: Position, b: Position) -> bool {
        let (Some(ia), Some(ib)) = (self.index(a), self.index(b)) else {
            return false;
        };
        if self.cells[ia].is_none() || self.cells[ib].is_none() {
            return false;
        }
        self.cells.swap(ia, ib);
        if let Some(tile) = &mut self.cells[ia] {
            tile.set_position(a);
        }
        if let Some(tile) = &mut self.cells[ib] {
            tile.set_position(b);
        }
        true
    }

    /// Empties every listed cell and returns the tiles that were removed.
    ///
    /// Out-of-range positions and already-empty cells are skipped, so the
    /// operation is idempotent per position.
    pub fn remove_tiles(&mut self, positions: &[Position]) -> Vec<Tile> {
        let mut removed = Vec::with_capacity(positions.len());
        for &pos in positions {
            if let Some(i) = self.index(pos)
                && let Some(tile) = self.cells[i].take()
            {
                removed.push(tile);
            }
        }
        removed
    }

    /// Compacts each column toward the bottom row, preserving the relative
    /// order of tiles.
    ///
    /// Only tiles that actually changed slot are reported. Within a column,
    /// moves are listed bottom-first, in the order the column is filled.
    pub fn apply_gravity(&mut self) -> Vec<TileMove> {
        let mut moves = Vec::new();
        for x in 0..self.cols {
            let mut landed = 0;
            for y in (0..self.rows).rev() {
                let from = Position::new(x, y);
                let to = Position::new(x, self.rows - 1 - landed);
                let from_i = y * self.cols + x;
                let Some(mut tile) = self.cells[from_i].take() else {
                    continue;
                };
                landed += 1;
                if from != to {
                    tile.set_position(to);
                    moves.push(TileMove { tile, from, to });
                }
                self.cells[to.y * self.cols + x] = Some(tile);
            }
        }
        moves
    }

    /// Returns the empty cells in column-major, top-to-bottom order.
    #[must_use]
    pub fn empty_positions(&self) -> Vec<Position> {
        (0..self.cols)
            .flat_map(|x| (0..self.rows).map(move |y| Position::new(x, y)))
            .filter(|&pos| self.get_tile(pos).is_none())
            .collect()
    }

    /// Returns `true` if no cell is empty.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Changes the type of the tile at `pos` in place, keeping its identity.
    ///
    /// Returns `false` if the cell is empty or out of range.
    pub fn set_tile_type(&mut self, pos: Position, tile_type: TileType) -> bool {
        match self.index(pos).and_then(|i| self.cells[i].as_mut()) {
            Some(tile) => {
                tile.set_tile_type(tile_type);
                true
            }
            None => false,
        }
    }

    /// Promotes the tile at `pos` to `kind` in place.
    ///
    /// Returns `false` (with a warning) if there is no tile to promote.
    pub fn create_special_tile(&mut self, pos: Position, kind: SpecialKind) -> bool {
        match self.index(pos).and_then(|i| self.cells[i].as_mut()) {
            Some(tile) => {
                tile.set_special(kind);
                true
            }
            None => {
                log::warn!("cannot promote {pos} to {kind}: no tile");
                false
            }
        }
    }

    /// Encodes the type grid as a string, one character per cell and `-` for
    /// empty cells.
    ///
    /// Two boards with the same signature have the same set of legal moves.
    #[must_use]
    pub fn type_signature(&self) -> String {
        let mut sig = String::with_capacity(self.cells.len() * 2);
        for cell in &self.cells {
            match cell {
                Some(tile) => sig.push_str(&tile.tile_type().to_string()),
                None => sig.push('-'),
            }
            sig.push(',');
        }
        sig
    }

    /// Verifies that every tile records its own slot and that identities are
    /// unique.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PositionMismatch`] or [`BoardError::DuplicateId`]
    /// for the first violation found.
    pub fn check_invariants(&self) -> Result<(), BoardError> {
        let mut seen = HashSet::with_capacity(self.cells.len());
        for slot in self.positions() {
            let Some(tile) = self.get_tile(slot) else {
                continue;
            };
            if tile.position() != slot {
                return Err(BoardError::PositionMismatch {
                    id: tile.id(),
                    slot,
                    recorded: tile.position(),
                });
            }
            if !seen.insert(tile.id()) {
                return Err(BoardError::DuplicateId { id: tile.id() });
            }
        }
        Ok(())
    }

    /// Verifies that no cell is empty.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::EmptyCell`] for the first empty cell in row-major order.
    pub fn require_full(&self) -> Result<(), BoardError> {
        match self.positions().find(|&pos| self.get_tile(pos).is_none()) {
            Some(position) => Err(BoardError::EmptyCell { position }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols) {
            for cell in row {
                match cell {
                    Some(tile) => write!(f, "{}", tile.tile_type())?,
                    None => write!(f, ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();
        let Some(first) = lines.first() else {
            return Err(BoardError::EmptyLiteral);
        };
        let cols = first.chars().filter(|c| !c.is_whitespace()).count();
        let mut board = Self::new(lines.len(), cols)?;
        for (y, line) in lines.iter().enumerate() {
            let cells = line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>();
            if cells.len() != cols {
                return Err(BoardError::RaggedRow {
                    row: y,
                    found: cells.len(),
                    expected: cols,
                });
            }
            for (x, ch) in cells.into_iter().enumerate() {
                if ch == '.' {
                    continue;
                }
                let index = ch
                    .to_digit(10)
                    .and_then(|d| u8::try_from(d).ok())
                    .ok_or(BoardError::InvalidCell { ch, row: y })?;
                board.spawn_tile(Position::new(x, y), TileType::new(index));
            }
        }
        Ok(board)
    }
}
