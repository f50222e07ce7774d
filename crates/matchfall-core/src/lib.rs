//! Core data structures for the Matchfall tile puzzle.
//!
//! This crate provides the board model shared by every other Matchfall crate:
//!
//! - [`Position`]: a cell coordinate on the board
//! - [`Tile`]: a typed game piece with a stable identity and an optional special kind
//! - [`Board`]: the grid of tiles with its primitive operations
//!   (get/set, swap, removal, gravity, special promotion)
//!
//! Randomised operations (creating, refilling and shuffling boards) live in
//! `matchfall-generator`, and match detection lives in `matchfall-matcher`.
//!
//! # Examples
//!
//! ```
//! use matchfall_core::{Board, Position};
//!
//! let mut board: Board = "
//!     012
//!     120
//!     201
//! "
//! .parse()
//! .unwrap();
//!
//! assert!(board.swap_tiles(Position::new(0, 0), Position::new(1, 0)));
//! assert_eq!(board.to_string(), "102\n120\n201\n");
//! ```

pub use self::{board::*, position::*, tile::*};

mod board;
mod position;
mod tile;
