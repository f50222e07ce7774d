use std::collections::HashMap;

use matchfall_core::{Board, Position};

use crate::check_match_at_position;

/// A swap of two adjacent cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    /// The first cell.
    pub from: Position,
    /// The neighbouring cell to the right of or below `from`.
    pub to: Position,
}

/// Legal-move detection with a per-board-state cache.
///
/// The cache is keyed on [`Board::type_signature`], so a board with the same
/// type layout reuses an earlier answer. Call [`clear_cache`](Self::clear_cache)
/// after mutating the board to keep memory bounded.
///
/// # Examples
///
/// ```
/// use matchfall_core::Board;
/// use matchfall_matcher::MatchDetector;
///
/// let mut detector = MatchDetector::new();
/// let board: Board = "
///     0100
///     2341
///     3412
/// "
/// .parse()
/// .unwrap();
/// assert!(detector.has_valid_moves(&board));
/// assert_eq!(detector.cached_len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MatchDetector {
    cache: HashMap<String, bool>,
}

impl MatchDetector {
    /// Creates a detector with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if swapping some pair of adjacent tiles creates a match.
    ///
    /// Each cell is tried against its right and lower neighbour, so every
    /// unordered pair is tested once. The swaps happen on a scratch copy; the
    /// caller's board is never touched. The answer is cached per type layout.
    pub fn has_valid_moves(&mut self, board: &Board) -> bool {
        let key = board.type_signature();
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }
        let found = first_valid_move(board).is_some();
        log::debug!("valid moves on {}x{} board: {found}", board.rows(), board.cols());
        self.cache.insert(key, found);
        found
    }

    /// Drops every cached answer.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Returns the number of cached board states.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Lists every right/down swap that produces a match at either swapped cell.
///
/// Moves are listed in row-major order of `from`, with the right neighbour
/// before the lower one.
#[must_use]
pub fn find_possible_moves(board: &Board) -> Vec<Move> {
    let mut scratch = board.clone();
    candidate_moves(board)
        .filter(|&mv| swap_creates_match(&mut scratch, mv))
        .collect()
}

/// Returns the first swap, in [`find_possible_moves`] order, that creates a match.
#[must_use]
pub fn first_valid_move(board: &Board) -> Option<Move> {
    let mut scratch = board.clone();
    candidate_moves(board).find(|&mv| swap_creates_match(&mut scratch, mv))
}

fn candidate_moves(board: &Board) -> impl Iterator<Item = Move> + use<> {
    let (rows, cols) = (board.rows(), board.cols());
    (0..rows).flat_map(move |y| {
        (0..cols).flat_map(move |x| {
            let from = Position::new(x, y);
            let right = (x + 1 < cols).then(|| Move {
                from,
                to: Position::new(x + 1, y),
            });
            let down = (y + 1 < rows).then(|| Move {
                from,
                to: Position::new(x, y + 1),
            });
            right.into_iter().chain(down)
        })
    })
}

/// Swaps, checks both cells, and swaps back.
fn swap_creates_match(scratch: &mut Board, mv: Move) -> bool {
    if !scratch.swap_tiles(mv.from, mv.to) {
        return false;
    }
    let found =
        check_match_at_position(scratch, mv.from) || check_match_at_position(scratch, mv.to);
    scratch.swap_tiles(mv.from, mv.to);
    found
}
