//! Session engine for Matchfall.
//!
//! [`GameEngine`] ties the board, match rules, special tiles, scoring, the
//! session clock and a [`GameState`] machine together. Collaborators observe
//! it through the [`EventBus`] and pace it through an [`Animator`]; a swap is
//! an `async` operation that suspends only while an animation plays.
//!
//! # Examples
//!
//! ```
//! use matchfall_game::{EventKind, GameConfig, GameEngine, block_on};
//!
//! let mut engine = GameEngine::new(GameConfig::default(), 7).unwrap();
//! let events = engine.events_mut().channel();
//! engine.start();
//!
//! if let Some(hint) = engine.hint() {
//!     block_on(engine.handle_swap(hint.from, hint.to));
//! }
//! assert!(events.try_iter().any(|e| e.kind() == EventKind::BoardStable));
//! ```

pub use self::{
    animation::*, config::*, engine::*, error::*, event::*, executor::*, scoring::*, state::*,
};

mod animation;
mod config;
mod engine;
mod error;
mod event;
mod executor;
mod scoring;
mod state;
