use derive_more::{Display, Error, From};
use matchfall_core::BoardError;
use matchfall_generator::GenerationError;

use crate::ConfigError;

/// Errors raised by [`GameEngine`](crate::GameEngine).
///
/// Inside a swap these never reach the caller: the engine reports them as
/// [`GameEvent::Error`](crate::GameEvent::Error) and resets itself.
#[derive(Debug, Display, Error, From)]
pub enum GameError {
    /// The configuration is out of range.
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    /// Board generation or shuffling failed.
    #[display("board generation failed: {_0}")]
    Generation(GenerationError),
    /// The board lost its structural invariants.
    #[display("board invariant violated: {_0}")]
    Board(BoardError),
    /// The board stayed without legal moves after repeated shuffles.
    #[display("no legal move after {attempts} shuffles")]
    #[from(ignore)]
    ShuffleLimitExceeded {
        /// Shuffles attempted.
        attempts: u32,
    },
    /// A cascade did not settle.
    #[display("cascade did not settle after {steps} steps")]
    #[from(ignore)]
    CascadeLimitExceeded {
        /// Steps run.
        steps: u32,
    },
}
