use std::{collections::HashSet, time::Duration};

use matchfall_core::{Board, BoardError, Position, Tile};
use matchfall_generator::BoardGenerator;
use matchfall_matcher::{
    Match, MatchDetector, Move, SpecialTileManager, find_matches, first_valid_move,
};
use serde::Serialize;

use crate::{
    Animation, BoxedAnimator, EventBus, GameConfig, GameError, GameEvent, GameOverReason,
    GameState, InstantAnimator, StateManager, calculate_score,
};

/// Cascade steps a single swap may trigger before the engine gives up.
pub const MAX_CASCADE_STEPS: u32 = 1000;

/// Reshuffles attempted before a dead board is reported as an error.
pub const MAX_SHUFFLE_ATTEMPTS: u32 = 10;

/// What [`GameEngine::handle_swap`] did with a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The request was dropped by a guard; nothing changed.
    Ignored,
    /// The swap produced no match and was undone.
    Reverted,
    /// The swap matched and the board settled.
    Matched {
        /// Cascade steps run.
        cascades: u32,
    },
    /// A special tile (or pair) fired and the board settled.
    Special {
        /// Cascade steps run after the activation.
        cascades: u32,
    },
    /// Resolution failed; the engine reset itself to the menu.
    Failed,
}

/// Point-in-time view of the session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    /// Total score.
    pub score: u64,
    /// Accepted swaps.
    pub moves: u32,
    /// Cascade counter of the last swap.
    pub combo_count: u32,
    /// Current state.
    pub state: GameState,
    /// Time left on the session clock.
    pub remaining: Duration,
}

/// One match-3 session: board, rules, score, clock and state machine.
///
/// All board mutation happens inside [`handle_swap`](Self::handle_swap),
/// which suspends only while the [`Animator`](crate::Animator) plays a step.
///
/// # Examples
///
/// ```
/// use matchfall_game::{GameConfig, GameEngine, GameState, SwapOutcome, block_on};
///
/// let mut engine = GameEngine::new(GameConfig::default(), 42).unwrap();
/// assert!(engine.start());
///
/// let hint = engine.hint().unwrap();
/// let outcome = block_on(engine.handle_swap(hint.from, hint.to));
/// assert!(matches!(outcome, SwapOutcome::Matched { .. } | SwapOutcome::Special { .. }));
/// assert_eq!(engine.snapshot().moves, 1);
/// assert_eq!(engine.snapshot().state, GameState::Playing);
/// ```
#[derive(Debug)]
pub struct GameEngine {
    config: GameConfig,
    board: Board,
    generator: BoardGenerator,
    detector: MatchDetector,
    specials: SpecialTileManager,
    state: StateManager,
    events: EventBus,
    animator: BoxedAnimator,
    score: u64,
    moves: u32,
    combo_count: u32,
    remaining: Duration,
    clock_running: bool,
    warned: bool,
    processing: bool,
}

impl GameEngine {
    /// Creates an engine in [`GameState::Menu`] with a match-free board that
    /// has at least one legal move.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] if `config` fails validation, or a
    /// generation error if no playable board could be built.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, GameError> {
        config.validate()?;
        let board_config = config.board;
        let generator = BoardGenerator::new(
            board_config.rows,
            board_config.cols,
            board_config.tile_types,
            seed,
        )?;
        Self::with_generator(config, generator)
    }

    /// Like [`new`](Self::new), with a seed drawn from the thread-local RNG.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn from_entropy(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let board_config = config.board;
        let generator = BoardGenerator::from_entropy(
            board_config.rows,
            board_config.cols,
            board_config.tile_types,
        )?;
        Self::with_generator(config, generator)
    }

    fn with_generator(config: GameConfig, mut generator: BoardGenerator) -> Result<Self, GameError> {
        let board = generator.generate()?;
        let specials = SpecialTileManager::new(config.special.bomb_range, config.scoring.base_score)
            .with_bomb_multiplier(config.scoring.special_tile_multiplier);
        log::info!(
            "new {}x{} session, seed {:#x}",
            config.board.cols,
            config.board.rows,
            generator.seed()
        );
        let mut engine = Self {
            remaining: config.timer.default_time(),
            config,
            board,
            generator,
            detector: MatchDetector::new(),
            specials,
            state: StateManager::new(),
            events: EventBus::new(),
            animator: Box::new(InstantAnimator),
            score: 0,
            moves: 0,
            combo_count: 0,
            clock_running: false,
            warned: false,
            processing: false,
        };
        engine.ensure_playable()?;
        Ok(engine)
    }

    /// Replaces the animator.
    #[must_use]
    pub fn with_animator(mut self, animator: BoxedAnimator) -> Self {
        self.animator = animator;
        self
    }

    /// Shuffles a fresh board until it has a legal move, without events.
    fn ensure_playable(&mut self) -> Result<(), GameError> {
        let mut attempts = 0;
        while !self.detector.has_valid_moves(&self.board) {
            if attempts >= MAX_SHUFFLE_ATTEMPTS {
                return Err(GameError::ShuffleLimitExceeded { attempts });
            }
            attempts += 1;
            log::debug!("fresh board has no legal move, shuffling ({attempts})");
            self.generator.shuffle_board(&mut self.board)?;
            self.detector.clear_cache();
        }
        Ok(())
    }

    /// Starts a session from the menu: runs the clock and enables input.
    ///
    /// Returns `false` if the engine is not in [`GameState::Menu`].
    pub fn start(&mut self) -> bool {
        if !self.state.is_state(GameState::Menu) {
            log::warn!("start ignored in state {}", self.state.current());
            return false;
        }
        self.state.set_state(GameState::Playing, &mut self.events);
        self.remaining = self.config.timer.default_time();
        self.clock_running = true;
        self.warned = false;
        self.events.emit(&GameEvent::TimerUpdate {
            remaining: self.remaining,
        });
        self.events.emit(&GameEvent::GameStart);
        self.events.emit(&GameEvent::InputEnabled);
        log::info!("session started");
        true
    }

    /// Pauses a playing session. Returns `false` if not playing.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_state(GameState::Playing) {
            return false;
        }
        self.state.set_state(GameState::Paused, &mut self.events);
        self.clock_running = false;
        self.events.emit(&GameEvent::InputDisabled);
        true
    }

    /// Resumes a paused session. Returns `false` if not paused.
    pub fn resume(&mut self) -> bool {
        if !self.state.is_paused() {
            return false;
        }
        self.state.set_state(GameState::Playing, &mut self.events);
        self.clock_running = true;
        self.events.emit(&GameEvent::InputEnabled);
        true
    }

    /// Returns to the menu with zeroed counters, a full clock and a new board.
    ///
    /// # Errors
    ///
    /// Returns an error if no playable board could be generated. The state
    /// and counters are reset regardless.
    pub fn reset(&mut self) -> Result<(), GameError> {
        self.score = 0;
        self.moves = 0;
        self.combo_count = 0;
        self.processing = false;
        self.remaining = self.config.timer.default_time();
        self.clock_running = false;
        self.warned = false;
        self.state.reset(&mut self.events);

        self.board = self.generator.generate()?;
        self.detector.clear_cache();
        self.ensure_playable()?;
        log::info!("session reset");
        Ok(())
    }

    /// Resets and immediately starts a new session.
    ///
    /// # Errors
    ///
    /// See [`reset`](Self::reset).
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.reset()?;
        self.events.emit(&GameEvent::BoardReset);
        self.start();
        Ok(())
    }

    /// Resolves a swap request between `p1` and `p2`.
    ///
    /// Requests are ignored (with a log) while another swap is in flight,
    /// outside [`GameState::Playing`], or when the cells are out of range,
    /// not adjacent or empty. Otherwise the engine swaps the tiles, fires any
    /// special tile involved, and either reverts a swap without matches or
    /// runs the cascade until the board settles. Input is re-enabled and the
    /// state returns to [`GameState::Playing`] in every case.
    ///
    /// A failure during resolution is reported as [`GameEvent::Error`], after
    /// which the engine resets to the menu and returns
    /// [`SwapOutcome::Failed`].
    pub async fn handle_swap(&mut self, p1: Position, p2: Position) -> SwapOutcome {
        if self.processing {
            log::debug!("swap {p1}-{p2} ignored: a swap is in flight");
            return SwapOutcome::Ignored;
        }
        if !self.state.is_state(GameState::Playing) {
            log::debug!("swap {p1}-{p2} ignored in state {}", self.state.current());
            return SwapOutcome::Ignored;
        }
        if !self.board.is_adjacent(p1, p2) {
            log::debug!("swap {p1}-{p2} ignored: not adjacent cells");
            return SwapOutcome::Ignored;
        }
        if self.board.get_tile(p1).is_none() || self.board.get_tile(p2).is_none() {
            log::debug!("swap {p1}-{p2} ignored: empty cell");
            return SwapOutcome::Ignored;
        }

        self.processing = true;
        self.state.set_state(GameState::Animating, &mut self.events);
        self.events.emit(&GameEvent::InputDisabled);

        let result = self.resolve_swap(p1, p2).await;

        self.processing = false;
        if self.state.is_animating() {
            self.state.set_state(GameState::Playing, &mut self.events);
        }
        self.events.emit(&GameEvent::InputEnabled);

        result.unwrap_or_else(|err| {
            self.recover(&err);
            SwapOutcome::Failed
        })
    }

    async fn resolve_swap(&mut self, p1: Position, p2: Position) -> Result<SwapOutcome, GameError> {
        self.board.swap_tiles(p1, p2);
        let (Some(&tile_a), Some(&tile_b)) = (self.board.get_tile(p2), self.board.get_tile(p1))
        else {
            return Err(BoardError::EmptyCell { position: p2 }.into());
        };

        let activated = self.special_positions(&tile_a, &tile_b);

        self.events.emit(&GameEvent::SwapComplete { from: p1, to: p2 });
        self.animate(Animation::Swap {
            from: p1,
            to: p2,
            duration: self.config.animation.swap(),
        })
        .await;

        if !activated.is_empty() {
            self.count_move();
            let fired = if tile_a.is_special() { tile_a } else { tile_b };
            let bonus = self
                .specials
                .calculate_special_bonus(fired.special(), activated.len());
            self.score += bonus;
            self.events.emit(&GameEvent::ScoreUpdate {
                score: self.score,
                delta: bonus,
                combo: 1,
                multiplier: 1.0,
                special: true,
            });
            self.remove(&activated).await;
            self.fall_and_fill().await?;
            let cascades = self.process_matches().await?;
            return Ok(SwapOutcome::Special { cascades });
        }

        if find_matches(&self.board).is_empty() {
            self.board.swap_tiles(p1, p2);
            self.events.emit(&GameEvent::SwapRevert { from: p1, to: p2 });
            self.animate(Animation::Revert {
                from: p1,
                to: p2,
                duration: self.config.animation.swap(),
            })
            .await;
            self.events.emit(&GameEvent::MatchNone);
            return Ok(SwapOutcome::Reverted);
        }

        self.count_move();
        let cascades = self.process_matches().await?;
        Ok(SwapOutcome::Matched { cascades })
    }

    /// Cells cleared by the special tiles of a swap, announcing the activation.
    ///
    /// Two special tiles fire only through a combo rule; otherwise the swap
    /// is judged like an ordinary one.
    fn special_positions(&mut self, tile_a: &Tile, tile_b: &Tile) -> Vec<Position> {
        match (tile_a.is_special(), tile_b.is_special()) {
            (false, false) => Vec::new(),
            (true, true) => {
                let Some(combo) = self.specials.detect_special_combo(&self.board, tile_a, tile_b)
                else {
                    return Vec::new();
                };
                log::debug!("special combo: {}", combo.description());
                let positions = combo.positions.clone();
                self.events.emit(&GameEvent::SpecialComboActivated {
                    combo,
                    tiles: [*tile_a, *tile_b],
                });
                positions
            }
            (a_special, _) => {
                let (special, partner) = if a_special {
                    (tile_a, tile_b)
                } else {
                    (tile_b, tile_a)
                };
                let positions = self.specials.detect_special_tile_activation(
                    &self.board,
                    special,
                    Some(partner),
                );
                if !positions.is_empty() {
                    log::debug!(
                        "{} at {} fires on {} cells",
                        special.special(),
                        special.position(),
                        positions.len()
                    );
                    self.events.emit(&GameEvent::SpecialTileActivated {
                        tile: *special,
                        positions: positions.clone(),
                    });
                }
                positions
            }
        }
    }

    fn count_move(&mut self) {
        self.moves += 1;
        self.events
            .emit(&GameEvent::MovesUpdate { moves: self.moves });
    }

    async fn animate(&mut self, animation: Animation) {
        self.animator.play(animation).await;
    }

    async fn remove(&mut self, positions: &[Position]) {
        self.events.emit(&GameEvent::RemoveStart {
            positions: positions.to_vec(),
        });
        self.animate(Animation::Remove {
            positions: positions.to_vec(),
            duration: self.config.animation.remove(),
        })
        .await;
        let removed = self.board.remove_tiles(positions);
        self.events.emit(&GameEvent::RemoveComplete { removed });
    }

    /// Runs cascade steps until no match remains, then makes sure the board
    /// still has a legal move. Returns the number of steps run.
    async fn process_matches(&mut self) -> Result<u32, GameError> {
        self.combo_count = 1;
        let mut steps = 0;
        loop {
            let matches = find_matches(&self.board);
            if matches.is_empty() {
                break;
            }
            if steps >= MAX_CASCADE_STEPS {
                return Err(GameError::CascadeLimitExceeded { steps });
            }
            steps += 1;
            self.cascade_step(matches).await?;
            self.combo_count += 1;
        }

        log::debug!("board stable after {steps} cascade steps, score {}", self.score);
        self.events.emit(&GameEvent::BoardStable);
        self.handle_no_moves().await?;
        Ok(steps)
    }

    async fn cascade_step(&mut self, matches: Vec<Match>) -> Result<(), GameError> {
        let combo = self.combo_count;
        let spawn = self.specials.detect_special_tile_generation(&matches);
        let breakdown = calculate_score(&matches, combo, &self.config.scoring);
        let positions = removal_positions(&matches, spawn.map(|s| s.position));

        self.events.emit(&GameEvent::MatchFound {
            total_tiles: breakdown.tiles_cleared,
            matches,
            combo,
            special: spawn,
        });

        self.score += breakdown.score;
        self.events.emit(&GameEvent::ScoreUpdate {
            score: self.score,
            delta: breakdown.score,
            combo,
            multiplier: breakdown.multiplier,
            special: false,
        });
        if combo > 1 {
            self.events.emit(&GameEvent::ComboTrigger {
                combo,
                multiplier: breakdown.multiplier,
            });
        }

        self.events.emit(&GameEvent::RemoveStart {
            positions: positions.clone(),
        });
        self.animate(Animation::Remove {
            positions: positions.clone(),
            duration: self.config.animation.remove(),
        })
        .await;
        let removed = self.board.remove_tiles(&positions);

        if let Some(spawn) = spawn
            && self.board.create_special_tile(spawn.position, spawn.kind)
            && let Some(&tile) = self.board.get_tile(spawn.position)
        {
            log::debug!("created {} at {}", spawn.kind, spawn.position);
            self.events
                .emit(&GameEvent::SpecialTileCreated { tile, spawn });
        }
        self.events.emit(&GameEvent::RemoveComplete { removed });

        self.fall_and_fill().await
    }

    async fn fall_and_fill(&mut self) -> Result<(), GameError> {
        let moves = self.board.apply_gravity();
        if !moves.is_empty() {
            self.events.emit(&GameEvent::FallStart {
                moves: moves.clone(),
            });
            self.animate(Animation::Fall {
                moves: moves.clone(),
                duration: self.config.animation.fall(),
            })
            .await;
            self.events.emit(&GameEvent::FallComplete { moves });
        }

        let tiles = self.generator.fill_board(&mut self.board);
        if !tiles.is_empty() {
            self.events.emit(&GameEvent::SpawnStart {
                tiles: tiles.clone(),
            });
            self.animate(Animation::Spawn {
                tiles: tiles.clone(),
                duration: self.config.animation.spawn(),
            })
            .await;
            self.events.emit(&GameEvent::SpawnComplete { tiles });
        }

        self.board.check_invariants()?;
        self.board.require_full()?;
        self.detector.clear_cache();
        Ok(())
    }

    /// Reshuffles the board while it has no legal move.
    ///
    /// Returns the number of shuffles performed.
    async fn handle_no_moves(&mut self) -> Result<u32, GameError> {
        let mut attempts = 0;
        while !self.detector.has_valid_moves(&self.board) {
            if attempts >= MAX_SHUFFLE_ATTEMPTS {
                return Err(GameError::ShuffleLimitExceeded { attempts });
            }
            attempts += 1;
            log::info!("no legal move left, shuffling (attempt {attempts})");
            self.events.emit(&GameEvent::MovesNone);
            self.events.emit(&GameEvent::BoardShuffleStart);
            self.animate(Animation::ShuffleDelay {
                duration: self.config.animation.shuffle_delay(),
            })
            .await;
            self.generator.shuffle_board(&mut self.board)?;
            self.detector.clear_cache();
            self.events
                .emit(&GameEvent::BoardShuffle { attempt: attempts });
        }
        Ok(attempts)
    }

    fn recover(&mut self, err: &GameError) {
        log::error!("swap resolution failed: {err}");
        self.events.emit(&GameEvent::Error {
            message: err.to_string(),
        });
        if let Err(reset_err) = self.reset() {
            log::error!("reset after failure also failed: {reset_err}");
        }
    }

    /// Advances the session clock by `elapsed`.
    ///
    /// Emits [`GameEvent::TimerUpdate`], a single [`GameEvent::TimerWarning`]
    /// when the warning threshold is first reached, and ends the session with
    /// [`GameOverReason::TimeUp`] once the clock runs out. Does nothing while
    /// the clock is stopped or the engine is not in [`GameState::Playing`].
    pub fn tick(&mut self, elapsed: Duration) {
        if !self.clock_running || !self.state.is_state(GameState::Playing) {
            return;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        let remaining = self.remaining;
        self.events.emit(&GameEvent::TimerUpdate { remaining });

        if !self.warned && remaining <= self.config.timer.warning_time() {
            self.warned = true;
            self.events.emit(&GameEvent::TimerWarning { remaining });
        }
        if remaining.is_zero() {
            self.clock_running = false;
            self.end_game(GameOverReason::TimeUp);
        }
    }

    /// Ends the session with [`GameOverReason::NoMoves`] if the board has no
    /// legal move.
    ///
    /// Returns `true` if no legal move exists.
    pub fn check_game_over(&mut self) -> bool {
        if self.detector.has_valid_moves(&self.board) {
            return false;
        }
        self.events.emit(&GameEvent::MovesNone);
        self.end_game(GameOverReason::NoMoves);
        true
    }

    fn end_game(&mut self, reason: GameOverReason) {
        if !self.state.set_state(GameState::GameOver, &mut self.events) {
            return;
        }
        self.clock_running = false;
        log::info!(
            "game over ({reason}): score {}, moves {}",
            self.score,
            self.moves
        );
        self.events.emit(&GameEvent::GameOver {
            reason,
            final_score: self.score,
            moves: self.moves,
        });
    }

    /// Returns the session counters.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            score: self.score,
            moves: self.moves,
            combo_count: self.combo_count,
            state: self.state.current(),
            remaining: self.remaining,
        }
    }

    /// Returns a swap that would produce a match, if any.
    #[must_use]
    pub fn hint(&self) -> Option<Move> {
        first_valid_move(&self.board)
    }

    /// Returns the tile at `pos`.
    #[must_use]
    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.board.get_tile(pos)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.board.rows()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.board.cols()
    }

    /// Returns the board.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Returns the event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns the event bus for subscribing.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Returns the state machine, e.g. to register enter/exit hooks.
    pub fn state_manager_mut(&mut self) -> &mut StateManager {
        &mut self.state
    }

    /// Returns `true` while a swap is being resolved.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }
}

/// Matched cells in first-seen order, without duplicates or `keep`.
fn removal_positions(matches: &[Match], keep: Option<Position>) -> Vec<Position> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .flat_map(|m| m.positions().iter().copied())
        .filter(|&pos| Some(pos) != keep && seen.insert(pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::Receiver;

    use matchfall_core::{SpecialKind, TileType};
    use matchfall_matcher::{ComboKind, Direction};
    use proptest::prelude::*;

    use super::*;
    use crate::{ChannelAnimator, EventKind, block_on, poll_once};

    fn patterned(f: impl Fn(usize, usize) -> u8) -> Board {
        let mut board = Board::new(8, 8).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                board.spawn_tile(Position::new(x, y), TileType::new(f(x, y)));
            }
        }
        board
    }

    fn dead_board() -> Board {
        patterned(|x, y| ((x + y) % 3) as u8)
    }

    fn playing(board: Board) -> (GameEngine, Receiver<GameEvent>) {
        let mut engine = GameEngine::new(GameConfig::default(), 7).unwrap();
        engine.board = board;
        engine.detector.clear_cache();
        assert!(engine.start());
        let rx = engine.events_mut().channel();
        (engine, rx)
    }

    fn kinds(rx: &Receiver<GameEvent>) -> Vec<EventKind> {
        rx.try_iter().map(|e| e.kind()).collect()
    }

    fn pos(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn test_new_board_is_playable() {
        let engine = GameEngine::new(GameConfig::default(), 1).unwrap();
        assert!(engine.board().is_full());
        assert!(find_matches(engine.board()).is_empty());
        assert!(engine.hint().is_some());
        assert_eq!(engine.snapshot().state, GameState::Menu);
        assert_eq!(engine.snapshot().remaining, Duration::from_secs(60));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = GameConfig::default();
        config.board.rows = 2;
        assert!(matches!(
            GameEngine::new(config, 1),
            Err(GameError::Config(crate::ConfigError::Rows(2)))
        ));

        let mut config = GameConfig::default();
        config.special.bomb_range = usize::MAX;
        assert!(matches!(
            GameEngine::new(config, 1),
            Err(GameError::Config(crate::ConfigError::BombRange(usize::MAX)))
        ));
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = GameEngine::new(GameConfig::default(), 99).unwrap();
        let b = GameEngine::new(GameConfig::default(), 99).unwrap();
        assert_eq!(a.board().type_signature(), b.board().type_signature());
    }

    #[test]
    fn test_start_emits_session_events() {
        let mut engine = GameEngine::new(GameConfig::default(), 3).unwrap();
        let rx = engine.events_mut().channel();
        assert!(engine.start());
        assert_eq!(
            kinds(&rx),
            [
                EventKind::StateChange,
                EventKind::TimerUpdate,
                EventKind::GameStart,
                EventKind::InputEnabled
            ]
        );
        assert!(!engine.start());
    }

    #[test]
    fn test_swap_without_match_reverts() {
        let (mut engine, rx) = playing(dead_board());
        let before = engine.board().type_signature();

        let outcome = block_on(engine.handle_swap(pos(0, 0), pos(1, 0)));
        assert_eq!(outcome, SwapOutcome::Reverted);
        assert_eq!(engine.board().type_signature(), before);
        assert_eq!(engine.snapshot().moves, 0);
        assert_eq!(engine.snapshot().state, GameState::Playing);
        assert!(!engine.is_processing());
        assert_eq!(
            kinds(&rx),
            [
                EventKind::StateChange,
                EventKind::InputDisabled,
                EventKind::SwapComplete,
                EventKind::SwapRevert,
                EventKind::MatchNone,
                EventKind::StateChange,
                EventKind::InputEnabled
            ]
        );
    }

    #[test]
    fn test_swap_with_match_cascades() {
        let mut board = dead_board();
        // column 1 reads 1,2,1,1,... so moving the 2 up completes 1,1,1
        board.set_tile_type(pos(1, 2), TileType::new(1));
        let (mut engine, rx) = playing(board);

        let outcome = block_on(engine.handle_swap(pos(1, 0), pos(1, 1)));
        let SwapOutcome::Matched { cascades } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert!(cascades >= 1);

        let events = rx.try_iter().collect::<Vec<_>>();
        let first_removal = events
            .iter()
            .find_map(|e| match e {
                GameEvent::RemoveStart { positions } => Some(positions.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_removal, [pos(1, 1), pos(1, 2), pos(1, 3)]);
        assert!(events.contains(&GameEvent::MovesUpdate { moves: 1 }));
        assert!(events.iter().any(|e| e.kind() == EventKind::BoardStable));
        assert_eq!(events.last(), Some(&GameEvent::InputEnabled));

        let snapshot = engine.snapshot();
        assert!(snapshot.score >= 30);
        assert_eq!(snapshot.moves, 1);
        assert_eq!(snapshot.state, GameState::Playing);
        assert!(engine.board().is_full());
        assert!(find_matches(engine.board()).is_empty());
        assert!(engine.board().check_invariants().is_ok());
    }

    #[test]
    fn test_four_in_a_row_creates_bomb() {
        let mut board = dead_board();
        // row 0 reads 0,1,2,0,... ; make x=0..=3 "0,0,x,0" with a 0 below x=2
        board.set_tile_type(pos(1, 0), TileType::new(0));
        board.set_tile_type(pos(2, 1), TileType::new(0));
        board.set_tile_type(pos(2, 0), TileType::new(2));
        let (mut engine, rx) = playing(board);

        let outcome = block_on(engine.handle_swap(pos(2, 0), pos(2, 1)));
        assert!(matches!(outcome, SwapOutcome::Matched { .. }));
        let created = rx
            .try_iter()
            .find_map(|e| match e {
                GameEvent::SpecialTileCreated { tile, spawn } => Some((tile, spawn)),
                _ => None,
            })
            .unwrap();
        assert_eq!(created.1.kind, SpecialKind::Bomb);
        assert_eq!(created.1.position, pos(2, 0));
        assert_eq!(created.0.special(), SpecialKind::Bomb);
    }

    #[test]
    fn test_row_clear_activation() {
        let mut board = dead_board();
        board.create_special_tile(pos(0, 0), SpecialKind::RowClear);
        let (mut engine, rx) = playing(board);

        let outcome = block_on(engine.handle_swap(pos(0, 0), pos(1, 0)));
        assert!(matches!(outcome, SwapOutcome::Special { .. }));

        let events = rx.try_iter().collect::<Vec<_>>();
        let activated = events
            .iter()
            .find_map(|e| match e {
                GameEvent::SpecialTileActivated { tile, positions } => Some((*tile, positions.len())),
                _ => None,
            })
            .unwrap();
        assert_eq!(activated.0.special(), SpecialKind::RowClear);
        assert_eq!(activated.0.position(), pos(1, 0));
        assert_eq!(activated.1, 8);
        assert!(events.contains(&GameEvent::ScoreUpdate {
            score: 240,
            delta: 240,
            combo: 1,
            multiplier: 1.0,
            special: true,
        }));
        assert!(engine.snapshot().score >= 240);
        assert_eq!(engine.snapshot().moves, 1);
        assert!(engine.board().is_full());
    }

    #[test]
    fn test_double_bomb_combo() {
        let mut board = dead_board();
        board.create_special_tile(pos(3, 3), SpecialKind::Bomb);
        board.create_special_tile(pos(4, 3), SpecialKind::Bomb);
        let (mut engine, rx) = playing(board);

        let outcome = block_on(engine.handle_swap(pos(3, 3), pos(4, 3)));
        assert!(matches!(outcome, SwapOutcome::Special { .. }));
        let combo = rx
            .try_iter()
            .find_map(|e| match e {
                GameEvent::SpecialComboActivated { combo, .. } => Some(combo),
                _ => None,
            })
            .unwrap();
        assert_eq!(combo.kind, ComboKind::DoubleBomb);
        assert_eq!(combo.positions.len(), 25);
        assert!(engine.snapshot().score >= 500);
        assert!(engine.board().is_full());
    }

    #[test]
    fn test_swap_guards() {
        let mut engine = GameEngine::new(GameConfig::default(), 5).unwrap();
        let hint = engine.hint().unwrap();
        assert_eq!(
            block_on(engine.handle_swap(hint.from, hint.to)),
            SwapOutcome::Ignored
        );

        engine.start();
        assert_eq!(
            block_on(engine.handle_swap(pos(0, 0), pos(2, 0))),
            SwapOutcome::Ignored
        );
        assert_eq!(
            block_on(engine.handle_swap(pos(7, 0), pos(8, 0))),
            SwapOutcome::Ignored
        );

        engine.processing = true;
        assert_eq!(
            block_on(engine.handle_swap(hint.from, hint.to)),
            SwapOutcome::Ignored
        );
        engine.processing = false;

        engine.board.remove_tiles(&[hint.from]);
        assert_eq!(
            block_on(engine.handle_swap(hint.from, hint.to)),
            SwapOutcome::Ignored
        );
        assert_eq!(engine.snapshot().moves, 0);
    }

    #[test]
    fn test_pause_blocks_swaps_and_clock() {
        let (mut engine, _rx) = playing(dead_board());
        assert!(engine.pause());
        assert!(!engine.pause());
        engine.tick(Duration::from_secs(5));
        assert_eq!(engine.snapshot().remaining, Duration::from_secs(60));
        assert_eq!(
            block_on(engine.handle_swap(pos(0, 0), pos(1, 0))),
            SwapOutcome::Ignored
        );
        assert!(engine.resume());
        engine.tick(Duration::from_secs(5));
        assert_eq!(engine.snapshot().remaining, Duration::from_secs(55));
    }

    #[test]
    fn test_clock_stops_while_animating() {
        let (mut engine, rx) = playing(dead_board());
        assert!(engine.state.set_state(GameState::Animating, &mut engine.events));
        kinds(&rx);

        engine.tick(Duration::from_secs(5));
        assert_eq!(engine.snapshot().remaining, Duration::from_secs(60));
        assert!(kinds(&rx).is_empty());

        assert!(engine.state.set_state(GameState::Playing, &mut engine.events));
        engine.tick(Duration::from_secs(5));
        assert_eq!(engine.snapshot().remaining, Duration::from_secs(55));
    }

    #[test]
    fn test_timer_warning_and_time_up() {
        let (mut engine, rx) = playing(dead_board());

        engine.tick(Duration::from_secs(51));
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            [
                GameEvent::TimerUpdate {
                    remaining: Duration::from_secs(9)
                },
                GameEvent::TimerWarning {
                    remaining: Duration::from_secs(9)
                }
            ]
        );

        engine.tick(Duration::from_secs(1));
        assert_eq!(kinds(&rx), [EventKind::TimerUpdate]);

        engine.tick(Duration::from_secs(20));
        let events = rx.try_iter().collect::<Vec<_>>();
        assert_eq!(
            events[0],
            GameEvent::TimerUpdate {
                remaining: Duration::ZERO
            }
        );
        assert_eq!(
            events.last(),
            Some(&GameEvent::GameOver {
                reason: GameOverReason::TimeUp,
                final_score: 0,
                moves: 0
            })
        );
        assert_eq!(engine.snapshot().state, GameState::GameOver);

        engine.tick(Duration::from_secs(1));
        assert!(kinds(&rx).is_empty());
    }

    #[test]
    fn test_check_game_over() {
        let mut engine = GameEngine::new(GameConfig::default(), 11).unwrap();
        engine.start();
        assert!(!engine.check_game_over());

        let (mut engine, rx) = playing(dead_board());
        assert!(engine.check_game_over());
        assert_eq!(engine.snapshot().state, GameState::GameOver);
        let events = kinds(&rx);
        assert_eq!(events.first(), Some(&EventKind::MovesNone));
        assert_eq!(events.last(), Some(&EventKind::GameOver));
    }

    #[test]
    fn test_dead_board_is_shuffled() {
        let (mut engine, rx) = playing(dead_board());
        let attempts = block_on(engine.handle_no_moves()).unwrap();
        assert!(attempts >= 1);
        assert!(engine.detector.has_valid_moves(&engine.board));
        assert!(find_matches(engine.board()).is_empty());

        let events = kinds(&rx);
        assert_eq!(
            &events[..3],
            [
                EventKind::MovesNone,
                EventKind::BoardShuffleStart,
                EventKind::BoardShuffle
            ]
        );
    }

    #[test]
    fn test_recover_resets_to_menu() {
        let (mut engine, rx) = playing(dead_board());
        engine.score = 120;
        engine.moves = 4;
        engine.recover(&GameError::CascadeLimitExceeded {
            steps: MAX_CASCADE_STEPS,
        });

        let events = rx.try_iter().collect::<Vec<_>>();
        assert!(matches!(&events[0], GameEvent::Error { message } if message.contains("1000")));
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, GameState::Menu);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.moves, 0);
        assert!(engine.hint().is_some());
    }

    #[test]
    fn test_restart() {
        let (mut engine, rx) = playing(dead_board());
        engine.score = 50;
        engine.restart().unwrap();
        assert_eq!(engine.snapshot().state, GameState::Playing);
        assert_eq!(engine.snapshot().score, 0);
        let events = kinds(&rx);
        assert!(events.contains(&EventKind::BoardReset));
        assert_eq!(events.last(), Some(&EventKind::InputEnabled));
    }

    #[test]
    fn test_channel_animator_paces_swap() {
        let (animator, requests) = ChannelAnimator::new();
        let mut engine = GameEngine::new(GameConfig::default(), 3)
            .unwrap()
            .with_animator(Box::new(animator));
        engine.board = dead_board();
        engine.start();

        let mut played = Vec::new();
        let outcome = {
            let mut future = Box::pin(engine.handle_swap(pos(0, 0), pos(1, 0)));
            loop {
                if let std::task::Poll::Ready(outcome) = poll_once(future.as_mut()) {
                    break outcome;
                }
                for request in requests.try_iter() {
                    played.push(request.animation.clone());
                    request.finish();
                }
            }
        };

        assert_eq!(outcome, SwapOutcome::Reverted);
        assert_eq!(played.len(), 2);
        assert!(matches!(played[0], Animation::Swap { .. }));
        assert!(matches!(played[1], Animation::Revert { .. }));
    }

    #[test]
    fn test_removal_positions() {
        let row = Match::new(
            Direction::Horizontal,
            TileType::new(0),
            vec![pos(0, 2), pos(1, 2), pos(2, 2)],
        );
        let col = Match::new(
            Direction::Vertical,
            TileType::new(0),
            vec![pos(2, 0), pos(2, 1), pos(2, 2)],
        );
        assert_eq!(
            removal_positions(&[row.clone(), col.clone()], None),
            [pos(0, 2), pos(1, 2), pos(2, 2), pos(2, 0), pos(2, 1)]
        );
        assert_eq!(
            removal_positions(&[row, col], Some(pos(2, 2))),
            [pos(0, 2), pos(1, 2), pos(2, 0), pos(2, 1)]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_greedy_play_keeps_board_settled(seed in any::<u64>()) {
            let mut engine = GameEngine::new(GameConfig::default(), seed).unwrap();
            engine.start();
            let mut last_score = 0;
            for _ in 0..5 {
                let Some(hint) = engine.hint() else { break };
                let outcome = block_on(engine.handle_swap(hint.from, hint.to));
                prop_assert!(
                    matches!(outcome, SwapOutcome::Matched { .. } | SwapOutcome::Special { .. }),
                    "hinted swap gave {:?}", outcome
                );
                let board = engine.board();
                prop_assert!(board.is_full());
                prop_assert!(board.check_invariants().is_ok());
                prop_assert!(find_matches(board).is_empty());
                prop_assert!(engine.hint().is_some());
                prop_assert!(engine.snapshot().score > last_score);
                last_score = engine.snapshot().score;
            }
        }
    }
}
