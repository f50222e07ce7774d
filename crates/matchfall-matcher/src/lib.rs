//! Match detection and special-tile rules for Matchfall boards.
//!
//! - [`find_matches`] scans a [`Board`](matchfall_core::Board) for runs of
//!   three or more same-typed tiles.
//! - [`MatchDetector`] answers "does any legal swap exist?" with a
//!   per-board-state cache, and lists the swaps that would match.
//! - [`SpecialTileManager`] decides which special tile a set of matches
//!   produces, which cells a special tile destroys when activated, and how two
//!   swapped special tiles combine.
//!
//! # Examples
//!
//! ```
//! use matchfall_core::Board;
//! use matchfall_matcher::{Direction, MatchDetector, find_matches};
//!
//! let board: Board = "
//!     00012
//!     12340
//!     23401
//! "
//! .parse()
//! .unwrap();
//!
//! let matches = find_matches(&board);
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].direction(), Direction::Horizontal);
//! assert_eq!(matches[0].len(), 3);
//!
//! let mut detector = MatchDetector::new();
//! assert!(detector.has_valid_moves(&board));
//! ```

pub use self::{detector::*, matches::*, special::*};

mod detector;
mod matches;
mod special;
pub mod testing;
