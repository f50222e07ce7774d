//! Seeded board generation for Matchfall.
//!
//! [`BoardGenerator`] owns every random decision the game makes: initial
//! board creation, refilling cells emptied by a cascade, and reshuffling a
//! dead board. Given the same seed it produces the same sequence of boards,
//! which makes engine runs reproducible.
//!
//! # Examples
//!
//! ```
//! use matchfall_generator::BoardGenerator;
//! use matchfall_matcher::find_matches;
//!
//! let mut generator = BoardGenerator::new(8, 8, 5, 42).unwrap();
//! let board = generator.generate().unwrap();
//!
//! assert!(board.is_full());
//! assert!(find_matches(&board).is_empty());
//! ```

use derive_more::{Display, Error, From};
use matchfall_core::{Board, BoardError, Position, Tile, TileType};
use matchfall_matcher::{find_matches, would_create_match};
use rand::prelude::*;
use rand_pcg::Pcg64;

/// Fix-up passes attempted before a board is regenerated from scratch.
pub const MAX_FIX_PASSES: usize = 100;

/// Regenerations attempted before giving up.
pub const MAX_REGENERATIONS: usize = 50;

/// Errors that can occur during board generation.
#[derive(Debug, Display, Error, From, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The board dimensions are invalid.
    #[display("invalid board: {_0}")]
    Board(BoardError),
    /// At least one tile type is required.
    #[display("tile type count must be non-zero")]
    #[from(ignore)]
    NoTileTypes,
    /// Matches survived every fix-up pass of every regeneration round.
    #[display("board still had matches after {rounds} regenerations")]
    #[from(ignore)]
    RegenerationLimitExceeded {
        /// Regeneration rounds attempted.
        rounds: usize,
    },
}

/// A seeded source of boards and tiles.
#[derive(Debug, Clone)]
pub struct BoardGenerator {
    rows: usize,
    cols: usize,
    tile_types: u8,
    seed: u64,
    rng: Pcg64,
}

impl BoardGenerator {
    /// Creates a generator for `rows × cols` boards with `tile_types` types.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Board`] if either dimension is zero, or
    /// [`GenerationError::NoTileTypes`] if `tile_types` is zero.
    pub fn new(
        rows: usize,
        cols: usize,
        tile_types: u8,
        seed: u64,
    ) -> Result<Self, GenerationError> {
        if rows == 0 || cols == 0 {
            return Err(BoardError::InvalidDimensions { rows, cols }.into());
        }
        if tile_types == 0 {
            return Err(GenerationError::NoTileTypes);
        }
        Ok(Self {
            rows,
            cols,
            tile_types,
            seed,
            rng: Pcg64::seed_from_u64(seed),
        })
    }

    /// Creates a generator seeded from the thread-local RNG.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn from_entropy(rows: usize, cols: usize, tile_types: u8) -> Result<Self, GenerationError> {
        Self::new(rows, cols, tile_types, rand::random())
    }

    /// Returns the seed the generator was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of tile types.
    #[must_use]
    pub fn tile_types(&self) -> u8 {
        self.tile_types
    }

    /// Draws a uniformly random tile type.
    pub fn random_type(&mut self) -> TileType {
        TileType::new(self.rng.random_range(0..self.tile_types))
    }

    /// Creates a board with every cell holding a uniformly random type.
    ///
    /// The board may contain matches; see [`generate`](Self::generate).
    ///
    /// # Errors
    ///
    /// Propagates [`BoardError`] from board construction.
    pub fn create_board(&mut self) -> Result<Board, GenerationError> {
        let mut board = Board::new(self.rows, self.cols)?;
        self.fill_board(&mut board);
        Ok(board)
    }

    /// Creates a fully populated board without any initial match.
    ///
    /// # Errors
    ///
    /// See [`create_board`](Self::create_board) and
    /// [`ensure_no_initial_matches`](Self::ensure_no_initial_matches).
    pub fn generate(&mut self) -> Result<Board, GenerationError> {
        let mut board = self.create_board()?;
        self.ensure_no_initial_matches(&mut board)?;
        Ok(board)
    }

    /// Fills every empty cell with a new random tile and returns the new tiles.
    ///
    /// Cells are filled column by column, top to bottom.
    pub fn fill_board(&mut self, board: &mut Board) -> Vec<Tile> {
        board
            .empty_positions()
            .into_iter()
            .filter_map(|pos| {
                let tile_type = self.random_type();
                board.spawn_tile(pos, tile_type)
            })
            .collect()
    }

    /// Retypes tiles until the board contains no match.
    ///
    /// Each pass visits every tile of every current match and gives it the
    /// lowest type that does not complete a run at its cell (special tiles
    /// are ignored by that check), or a random type if every type would.
    /// After [`MAX_FIX_PASSES`] unsuccessful passes the board is regenerated
    /// with fresh tiles and the process restarts.
    ///
    /// On success, [`find_matches`] returns nothing for the board.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::RegenerationLimitExceeded`] if the board
    /// still has matches after [`MAX_REGENERATIONS`] regenerations.
    pub fn ensure_no_initial_matches(&mut self, board: &mut Board) -> Result<(), GenerationError> {
        for round in 0..=MAX_REGENERATIONS {
            if round > 0 {
                log::warn!(
                    "matches remain after {MAX_FIX_PASSES} passes, regenerating board (round {round})"
                );
                self.regenerate(board);
            }
            if self.fix_matches(board) {
                return Ok(());
            }
        }
        Err(GenerationError::RegenerationLimitExceeded {
            rounds: MAX_REGENERATIONS,
        })
    }

    /// Shuffles tile types across all occupied cells, then removes any match
    /// the shuffle produced.
    ///
    /// Tile identities, special kinds and positions stay in place; only the
    /// types are permuted.
    ///
    /// # Errors
    ///
    /// See [`ensure_no_initial_matches`](Self::ensure_no_initial_matches).
    pub fn shuffle_board(&mut self, board: &mut Board) -> Result<(), GenerationError> {
        self.shuffle_types(board);
        self.ensure_no_initial_matches(board)
    }

    /// Fisher–Yates over the types of occupied cells.
    fn shuffle_types(&mut self, board: &mut Board) {
        let occupied = board
            .tiles()
            .map(|tile| (tile.position(), tile.tile_type()))
            .collect::<Vec<_>>();
        let mut types = occupied.iter().map(|&(_, t)| t).collect::<Vec<_>>();
        for i in (1..types.len()).rev() {
            let j = self.rng.random_range(0..=i);
            types.swap(i, j);
        }
        for (&(pos, _), tile_type) in occupied.iter().zip(types) {
            board.set_tile_type(pos, tile_type);
        }
    }

    /// Runs up to [`MAX_FIX_PASSES`] passes; returns `true` once no match remains.
    fn fix_matches(&mut self, board: &mut Board) -> bool {
        for _ in 0..MAX_FIX_PASSES {
            let matches = find_matches(board);
            if matches.is_empty() {
                return true;
            }
            for pos in matches.iter().flat_map(|m| m.positions().iter().copied()) {
                self.retype_safely(board, pos);
            }
        }
        find_matches(board).is_empty()
    }

    fn retype_safely(&mut self, board: &mut Board, pos: Position) {
        for index in 0..self.tile_types {
            board.set_tile_type(pos, TileType::new(index));
            if !would_create_match(board, pos) {
                return;
            }
        }
        let fallback = self.random_type();
        board.set_tile_type(pos, fallback);
    }

    fn regenerate(&mut self, board: &mut Board) {
        for pos in board.positions() {
            let tile_type = self.random_type();
            board.spawn_tile(pos, tile_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use matchfall_core::SpecialKind;
    use proptest::prelude::*;

    use super::*;

    fn type_counts(board: &Board) -> HashMap<TileType, usize> {
        let mut counts = HashMap::new();
        for tile in board.tiles() {
            *counts.entry(tile.tile_type()).or_default() += 1;
        }
        counts
    }

    #[test]
    fn test_new_validates_arguments() {
        assert_eq!(
            BoardGenerator::new(0, 8, 5, 0).unwrap_err(),
            GenerationError::Board(BoardError::InvalidDimensions { rows: 0, cols: 8 })
        );
        assert_eq!(
            BoardGenerator::new(8, 8, 0, 0).unwrap_err(),
            GenerationError::NoTileTypes
        );
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = BoardGenerator::new(8, 8, 5, 7).unwrap().generate().unwrap();
        let b = BoardGenerator::new(8, 8, 5, 7).unwrap().generate().unwrap();
        assert_eq!(a, b);
        let c = BoardGenerator::new(8, 8, 5, 8).unwrap().generate().unwrap();
        assert_ne!(a.to_string(), c.to_string());
    }

    #[test]
    fn test_create_board_is_full_and_in_range() {
        let mut generator = BoardGenerator::new(6, 9, 4, 1).unwrap();
        let board = generator.create_board().unwrap();
        assert_eq!((board.rows(), board.cols()), (6, 9));
        assert!(board.is_full());
        assert!(board.tiles().all(|t| t.tile_type().index() < 4));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_fill_board_fills_only_empty_cells() {
        let mut generator = BoardGenerator::new(8, 8, 5, 3).unwrap();
        let mut board = generator.generate().unwrap();
        let removed = [Position::new(2, 0), Position::new(2, 1), Position::new(5, 0)];
        let kept = *board.get_tile(Position::new(0, 0)).unwrap();
        board.remove_tiles(&removed);

        let spawned = generator.fill_board(&mut board);
        assert_eq!(
            spawned.iter().map(Tile::position).collect::<Vec<_>>(),
            removed.to_vec()
        );
        assert!(board.is_full());
        assert_eq!(board.get_tile(Position::new(0, 0)), Some(&kept));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_ensure_no_initial_matches_on_uniform_board() {
        let mut generator = BoardGenerator::new(8, 8, 3, 11).unwrap();
        let mut board: Board = "00000000\n".repeat(8).parse().unwrap();
        generator.ensure_no_initial_matches(&mut board).unwrap();
        assert!(find_matches(&board).is_empty());
        assert!(board.is_full());
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_single_type_hits_regeneration_limit() {
        let mut generator = BoardGenerator::new(4, 4, 1, 0).unwrap();
        assert_eq!(
            generator.generate(),
            Err(GenerationError::RegenerationLimitExceeded {
                rounds: MAX_REGENERATIONS
            })
        );

        let mut board: Board = "0000\n".repeat(4).parse().unwrap();
        assert!(matches!(
            generator.shuffle_board(&mut board),
            Err(GenerationError::RegenerationLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_shuffle_types_preserves_multiset_and_ids() {
        let mut generator = BoardGenerator::new(8, 8, 5, 5).unwrap();
        let mut board = generator.create_board().unwrap();
        board.create_special_tile(Position::new(4, 4), SpecialKind::Bomb);
        let before = board.clone();

        generator.shuffle_types(&mut board);
        assert_eq!(type_counts(&board), type_counts(&before));
        for pos in board.positions() {
            let (a, b) = (board.get_tile(pos).unwrap(), before.get_tile(pos).unwrap());
            assert_eq!(a.id(), b.id());
            assert_eq!(a.special(), b.special());
        }
        assert_ne!(board.to_string(), before.to_string());
    }

    #[test]
    fn test_shuffle_board_leaves_no_matches() {
        let mut generator = BoardGenerator::new(8, 8, 5, 9).unwrap();
        let mut board = generator.generate().unwrap();
        generator.shuffle_board(&mut board).unwrap();
        assert!(find_matches(&board).is_empty());
        assert!(board.is_full());
        board.check_invariants().unwrap();
    }

    proptest! {
        #[test]
        fn test_generate_postconditions(
            seed in any::<u64>(),
            rows in 4usize..=12,
            cols in 4usize..=12,
            tile_types in 3u8..=7,
        ) {
            let mut generator = BoardGenerator::new(rows, cols, tile_types, seed).unwrap();
            let board = generator.generate().unwrap();
            prop_assert!(board.is_full());
            prop_assert!(find_matches(&board).is_empty());
            prop_assert!(board.check_invariants().is_ok());
            prop_assert!(board.tiles().all(|t| t.tile_type().index() < tile_types));
        }

        #[test]
        fn test_refill_after_gravity_keeps_board_full(seed in any::<u64>(), column in 0usize..8) {
            let mut generator = BoardGenerator::new(8, 8, 5, seed).unwrap();
            let mut board = generator.generate().unwrap();
            let cleared = (2..6).map(|y| Position::new(column, y)).collect::<Vec<_>>();
            board.remove_tiles(&cleared);
            board.apply_gravity();
            let spawned = generator.fill_board(&mut board);
            prop_assert_eq!(spawned.len(), 4);
            prop_assert!(spawned.iter().all(|t| t.position().x == column && t.position().y < 4));
            prop_assert!(board.is_full());
            prop_assert!(board.check_invariants().is_ok());
        }
    }
}
