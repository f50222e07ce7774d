//! Test utilities for match and special-tile detection.
//!
//! This module provides [`BoardTester`], a fluent harness that builds a board
//! from a text literal and asserts what [`find_matches`] and
//! [`SpecialTileManager`] report for it.
//!
//! # Example
//!
//! ```
//! use matchfall_core::SpecialKind;
//! use matchfall_matcher::{Direction, testing::BoardTester};
//!
//! BoardTester::from_str("
//!     11112
//!     23403
//! ")
//! .assert_match_count(1)
//! .assert_match(Direction::Horizontal, &[(0, 0), (1, 0), (2, 0), (3, 0)])
//! .assert_spawn(SpecialKind::Bomb, (2, 0));
//! ```

use std::str::FromStr as _;

use matchfall_core::{Board, Position, SpecialKind};

use crate::{
    Direction, Match, MatchDetector, MatchShape, SpecialTileManager, SpecialTileSpawn,
    find_matches,
};

/// A test harness for match detection.
///
/// # Method Chaining
///
/// All methods return `self`, enabling fluent method chaining for readable tests.
///
/// # Panics
///
/// All assertion methods panic with detailed messages on failure, using
/// `#[track_caller]` to report the correct source location.
#[derive(Debug)]
pub struct BoardTester {
    board: Board,
    manager: SpecialTileManager,
}

impl BoardTester {
    /// Creates a new tester for `board`.
    #[must_use]
    pub fn new(board: Board) -> Self {
        Self {
            board,
            manager: SpecialTileManager::default(),
        }
    }

    /// Creates a new tester from a board literal (see [`Board`]'s text format).
    ///
    /// # Panics
    ///
    /// Panics if the literal cannot be parsed.
    #[track_caller]
    pub fn from_str(s: &str) -> Self {
        let board = Board::from_str(s).unwrap();
        Self::new(board)
    }

    /// Replaces the special-tile manager used by the spawn assertions.
    #[must_use]
    pub fn with_manager(mut self, manager: SpecialTileManager) -> Self {
        self.manager = manager;
        self
    }

    /// Promotes the tile at `(x, y)` to `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the cell is empty.
    #[must_use]
    #[track_caller]
    pub fn with_special(mut self, (x, y): (usize, usize), kind: SpecialKind) -> Self {
        assert!(
            self.board.create_special_tile(Position::new(x, y), kind),
            "no tile at ({x}, {y}) to promote"
        );
        self
    }

    /// Returns the board under test.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    fn matches(&self) -> Vec<Match> {
        find_matches(&self.board)
    }

    fn spawn(&self) -> Option<SpecialTileSpawn> {
        self.manager
            .detect_special_tile_generation(&self.matches())
    }

    /// Asserts that exactly `count` matches are found.
    #[track_caller]
    pub fn assert_match_count(self, count: usize) -> Self {
        let matches = self.matches();
        assert_eq!(
            matches.len(),
            count,
            "expected {count} matches, found {matches:#?}\nboard:\n{}",
            self.board
        );
        self
    }

    /// Asserts that no match is found.
    #[track_caller]
    pub fn assert_no_matches(self) -> Self {
        self.assert_match_count(0)
    }

    /// Asserts that a match with exactly these positions (in order) and this
    /// direction is found.
    #[track_caller]
    pub fn assert_match(self, direction: Direction, positions: &[(usize, usize)]) -> Self {
        let expected = positions
            .iter()
            .map(|&(x, y)| Position::new(x, y))
            .collect::<Vec<_>>();
        let matches = self.matches();
        assert!(
            matches
                .iter()
                .any(|m| m.direction() == direction && m.positions() == expected.as_slice()),
            "no {direction} match at {expected:?}; found {matches:#?}"
        );
        self
    }

    /// Asserts that the matches produce a special tile of `kind` at `(x, y)`.
    #[track_caller]
    pub fn assert_spawn(self, kind: SpecialKind, (x, y): (usize, usize)) -> Self {
        let spawn = self.spawn();
        let Some(spawn) = spawn else {
            panic!("expected {kind} at ({x}, {y}), no special spawned");
        };
        assert_eq!(spawn.kind, kind, "unexpected spawn kind: {spawn:?}");
        assert_eq!(
            spawn.position,
            Position::new(x, y),
            "unexpected spawn position: {spawn:?}"
        );
        self
    }

    /// Asserts the shape and length recorded for the spawned special tile.
    #[track_caller]
    pub fn assert_spawn_shape(self, shape: MatchShape, match_length: usize) -> Self {
        let spawn = self.spawn();
        let Some(spawn) = spawn else {
            panic!("expected a {shape} spawn, no special spawned");
        };
        assert_eq!(spawn.shape, shape);
        assert_eq!(spawn.match_length, match_length);
        self
    }

    /// Asserts that the matches produce no special tile.
    #[track_caller]
    pub fn assert_no_spawn(self) -> Self {
        let spawn = self.spawn();
        assert!(spawn.is_none(), "unexpected spawn: {spawn:?}");
        self
    }

    /// Asserts whether any legal move exists.
    #[track_caller]
    pub fn assert_has_valid_moves(self, expected: bool) -> Self {
        let mut detector = MatchDetector::new();
        assert_eq!(
            detector.has_valid_moves(&self.board),
            expected,
            "board:\n{}",
            self.board
        );
        self
    }
}
