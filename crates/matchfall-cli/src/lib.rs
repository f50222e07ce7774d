//! Headless autoplay driver for the Matchfall engine.
//!
//! Plays whole sessions without a renderer: swaps are chosen by a
//! [`Strategy`], animations finish instantly, and each session is reduced to
//! a [`SessionSummary`].

use std::{cell::Cell, fs, io, path::Path, rc::Rc};

use clap::ValueEnum;
use derive_more::{Display, Error, From};
use matchfall_core::Position;
use matchfall_game::{
    EventKind, GameConfig, GameEngine, GameError, GameSnapshot, SwapOutcome, block_on,
};
use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::Serialize;

/// Errors reported by the driver.
#[derive(Debug, Display, Error, From)]
pub enum CliError {
    /// The config file could not be read.
    #[display("cannot read config: {_0}")]
    Io(io::Error),
    /// The config file is not valid JSON for [`GameConfig`].
    #[display("cannot parse config: {_0}")]
    Json(serde_json::Error),
    /// The engine could not be created.
    #[display("{_0}")]
    Game(GameError),
}

/// Reads a JSON [`GameConfig`]; missing fields take their defaults.
///
/// # Errors
///
/// Returns [`CliError::Io`] or [`CliError::Json`] if the file cannot be read
/// or parsed.
pub fn load_config(path: &Path) -> Result<GameConfig, CliError> {
    let text = fs::read_to_string(path)?;
    let config = serde_json::from_str(&text)?;
    Ok(config)
}

/// How the driver picks swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// Always play the engine's hint.
    #[default]
    Greedy,
    /// Swap a random cell with a random neighbor, matching or not.
    Random,
}

/// Result of one autoplayed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Seed the session was generated from.
    pub seed: u64,
    /// Final counters.
    pub snapshot: GameSnapshot,
    /// Swaps attempted, including reverted ones.
    pub attempts: u32,
    /// Cascade steps over all swaps.
    pub cascades: u32,
    /// Longest cascade of a single swap.
    pub longest_cascade: u32,
    /// Special tiles created.
    pub specials_created: u32,
    /// Dead-board reshuffles.
    pub shuffles: u32,
    /// Final board, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
}

/// Plays up to `max_moves` swaps of one session.
///
/// The session stops early if the strategy has no swap to offer or a swap
/// fails.
///
/// # Errors
///
/// Returns [`CliError::Game`] if the engine cannot be created.
pub fn play_session(
    config: &GameConfig,
    seed: u64,
    max_moves: u32,
    strategy: Strategy,
    keep_board: bool,
) -> Result<SessionSummary, CliError> {
    let mut engine = GameEngine::new(config.clone(), seed)?;
    let shuffles = counter(&mut engine, EventKind::BoardShuffle);
    let specials_created = counter(&mut engine, EventKind::SpecialTileCreated);
    let mut rng = Pcg64::seed_from_u64(seed);

    engine.start();
    let mut attempts = 0;
    let mut cascades = 0;
    let mut longest_cascade = 0;
    while attempts < max_moves {
        let swap = match strategy {
            Strategy::Greedy => engine.hint().map(|m| (m.from, m.to)),
            Strategy::Random => Some(random_swap(&engine, &mut rng)),
        };
        let Some((from, to)) = swap else {
            log::info!("seed {seed:#x}: no swap available");
            break;
        };
        attempts += 1;
        match block_on(engine.handle_swap(from, to)) {
            SwapOutcome::Matched { cascades: steps } | SwapOutcome::Special { cascades: steps } => {
                cascades += steps;
                longest_cascade = longest_cascade.max(steps);
            }
            SwapOutcome::Reverted | SwapOutcome::Ignored => {}
            SwapOutcome::Failed => {
                log::warn!("seed {seed:#x}: swap {from}-{to} failed, stopping");
                break;
            }
        }
    }

    Ok(SessionSummary {
        seed,
        snapshot: engine.snapshot(),
        attempts,
        cascades,
        longest_cascade,
        specials_created: specials_created.get(),
        shuffles: shuffles.get(),
        board: keep_board.then(|| engine.board().to_string()),
    })
}

fn counter(engine: &mut GameEngine, kind: EventKind) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    engine.events_mut().on(kind, move |_| c.set(c.get() + 1));
    count
}

fn random_swap(engine: &GameEngine, rng: &mut Pcg64) -> (Position, Position) {
    let (rows, cols) = (engine.rows(), engine.cols());
    loop {
        let from = Position::new(rng.random_range(0..cols), rng.random_range(0..rows));
        let to = if rng.random() {
            Position::new(from.x + 1, from.y)
        } else {
            Position::new(from.x, from.y + 1)
        };
        if to.x < cols && to.y < rows {
            return (from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_greedy_session() {
        let summary = play_session(&GameConfig::default(), 42, 10, Strategy::Greedy, true).unwrap();
        assert_eq!(summary.attempts, 10);
        assert_eq!(summary.snapshot.moves, 10);
        assert!(summary.cascades >= 1);
        assert!(summary.longest_cascade >= 1);
        assert!(summary.snapshot.score >= 300);
        let board = summary.board.unwrap();
        assert_eq!(board.lines().count(), 8);
    }

    #[test]
    fn test_random_session_is_reproducible() {
        let config = GameConfig::default();
        let a = play_session(&config, 9, 20, Strategy::Random, false).unwrap();
        let b = play_session(&config, 9, 20, Strategy::Random, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.attempts, 20);
        assert!(a.snapshot.moves <= 20);
        assert!(a.board.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = GameConfig::default();
        config.board.tile_types = 1;
        assert!(matches!(
            play_session(&config, 1, 1, Strategy::Greedy, false),
            Err(CliError::Game(GameError::Config(_)))
        ));
    }

    #[test]
    fn test_load_config() {
        let path = std::env::temp_dir().join(format!("matchfall-config-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, r#"{{ "board": {{ "rows": 6, "cols": 10 }} }}"#).unwrap();
        drop(file);

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!((config.board.rows, config.board.cols), (6, 10));
        assert_eq!(config.board.tile_types, 5);

        assert!(matches!(
            load_config(&path.with_extension("missing")),
            Err(CliError::Io(_))
        ));
    }

    #[test]
    fn test_summary_json() {
        let summary = play_session(&GameConfig::default(), 3, 1, Strategy::Greedy, false).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["seed"], 3);
        assert_eq!(json["snapshot"]["moves"], 1);
        assert_eq!(json["snapshot"]["state"], "Playing");
        assert!(json.get("board").is_none());
    }
}
