//! Session events and the publish/subscribe bus that carries them.

use std::{fmt, sync::mpsc, time::Duration};

use derive_more::{Display, IsVariant};
use matchfall_core::{Position, Tile, TileMove};
use matchfall_matcher::{Match, SpecialCombo, SpecialTileSpawn};

use crate::{GameOverReason, GameState};

/// Something that happened in a session.
///
/// Collaborators (rendering, sound, UI) observe these through an
/// [`EventBus`]; the engine never depends on how they react.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A session started.
    GameStart,
    /// The state machine moved.
    StateChange {
        /// Previous state.
        from: GameState,
        /// New state.
        to: GameState,
    },
    /// Swaps are accepted again.
    InputEnabled,
    /// A swap is in flight; further swaps are ignored.
    InputDisabled,
    /// Two tiles were swapped.
    SwapComplete {
        /// First swapped cell.
        from: Position,
        /// Second swapped cell.
        to: Position,
    },
    /// A swap without matches was undone.
    SwapRevert {
        /// First swapped cell.
        from: Position,
        /// Second swapped cell.
        to: Position,
    },
    /// A swap produced no match.
    MatchNone,
    /// A cascade step found matches.
    MatchFound {
        /// The matches, rows first.
        matches: Vec<Match>,
        /// Tiles covered by the matches, counting overlaps twice.
        total_tiles: usize,
        /// Cascade step, starting at 1.
        combo: u32,
        /// The special tile the step will create, if any.
        special: Option<SpecialTileSpawn>,
    },
    /// Tiles are about to be removed.
    RemoveStart {
        /// Cells being cleared.
        positions: Vec<Position>,
    },
    /// Tiles were removed.
    RemoveComplete {
        /// The removed tiles.
        removed: Vec<Tile>,
    },
    /// Tiles are about to fall.
    FallStart {
        /// Planned moves, bottom-most first in each column.
        moves: Vec<TileMove>,
    },
    /// Tiles fell.
    FallComplete {
        /// Applied moves.
        moves: Vec<TileMove>,
    },
    /// New tiles are about to appear.
    SpawnStart {
        /// The new tiles.
        tiles: Vec<Tile>,
    },
    /// New tiles appeared.
    SpawnComplete {
        /// The new tiles.
        tiles: Vec<Tile>,
    },
    /// A match was promoted to a special tile.
    SpecialTileCreated {
        /// The promoted tile.
        tile: Tile,
        /// What produced it.
        spawn: SpecialTileSpawn,
    },
    /// A swapped special tile fired on its own.
    SpecialTileActivated {
        /// The activated tile.
        tile: Tile,
        /// Cells it clears.
        positions: Vec<Position>,
    },
    /// Two swapped special tiles fired together.
    SpecialComboActivated {
        /// The combination and its area.
        combo: SpecialCombo,
        /// The two tiles involved.
        tiles: [Tile; 2],
    },
    /// The score changed.
    ScoreUpdate {
        /// New total.
        score: u64,
        /// Points added.
        delta: u64,
        /// Cascade step; 1 for a special activation.
        combo: u32,
        /// Cascade multiplier applied.
        multiplier: f64,
        /// `true` if the points came from a special activation.
        special: bool,
    },
    /// A cascade went past its first step.
    ComboTrigger {
        /// Cascade step.
        combo: u32,
        /// Multiplier in effect.
        multiplier: f64,
    },
    /// The move counter changed.
    MovesUpdate {
        /// Moves made this session.
        moves: u32,
    },
    /// A cascade settled.
    BoardStable,
    /// The board has no legal move.
    MovesNone,
    /// A reshuffle is about to start.
    BoardShuffleStart,
    /// The board was reshuffled.
    BoardShuffle {
        /// Shuffle attempt, starting at 1.
        attempt: u32,
    },
    /// The board was rebuilt by a restart.
    BoardReset,
    /// The session clock changed.
    TimerUpdate {
        /// Time left.
        remaining: Duration,
    },
    /// The session clock crossed the warning threshold.
    TimerWarning {
        /// Time left.
        remaining: Duration,
    },
    /// The session ended.
    GameOver {
        /// Why it ended.
        reason: GameOverReason,
        /// Score at the end.
        final_score: u64,
        /// Moves made.
        moves: u32,
    },
    /// A swap failed and the engine reset itself.
    Error {
        /// Description of the failure.
        message: String,
    },
}

/// Discriminant of [`GameEvent`], used to subscribe to one kind.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
#[expect(missing_docs)]
pub enum EventKind {
    #[display("game:start")]
    GameStart,
    #[display("state:change")]
    StateChange,
    #[display("input:enabled")]
    InputEnabled,
    #[display("input:disabled")]
    InputDisabled,
    #[display("swap:complete")]
    SwapComplete,
    #[display("swap:revert")]
    SwapRevert,
    #[display("match:none")]
    MatchNone,
    #[display("match:found")]
    MatchFound,
    #[display("remove:start")]
    RemoveStart,
    #[display("remove:complete")]
    RemoveComplete,
    #[display("fall:start")]
    FallStart,
    #[display("fall:complete")]
    FallComplete,
    #[display("spawn:start")]
    SpawnStart,
    #[display("spawn:complete")]
    SpawnComplete,
    #[display("special:created")]
    SpecialTileCreated,
    #[display("special:activated")]
    SpecialTileActivated,
    #[display("special:combo")]
    SpecialComboActivated,
    #[display("score:update")]
    ScoreUpdate,
    #[display("combo:trigger")]
    ComboTrigger,
    #[display("moves:update")]
    MovesUpdate,
    #[display("board:stable")]
    BoardStable,
    #[display("moves:none")]
    MovesNone,
    #[display("shuffle:start")]
    BoardShuffleStart,
    #[display("shuffle:complete")]
    BoardShuffle,
    #[display("board:reset")]
    BoardReset,
    #[display("timer:update")]
    TimerUpdate,
    #[display("timer:warning")]
    TimerWarning,
    #[display("game:over")]
    GameOver,
    #[display("error")]
    Error,
}

impl GameEvent {
    /// Returns the event's kind.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GameStart => EventKind::GameStart,
            Self::StateChange { .. } => EventKind::StateChange,
            Self::InputEnabled => EventKind::InputEnabled,
            Self::InputDisabled => EventKind::InputDisabled,
            Self::SwapComplete { .. } => EventKind::SwapComplete,
            Self::SwapRevert { .. } => EventKind::SwapRevert,
            Self::MatchNone => EventKind::MatchNone,
            Self::MatchFound { .. } => EventKind::MatchFound,
            Self::RemoveStart { .. } => EventKind::RemoveStart,
            Self::RemoveComplete { .. } => EventKind::RemoveComplete,
            Self::FallStart { .. } => EventKind::FallStart,
            Self::FallComplete { .. } => EventKind::FallComplete,
            Self::SpawnStart { .. } => EventKind::SpawnStart,
            Self::SpawnComplete { .. } => EventKind::SpawnComplete,
            Self::SpecialTileCreated { .. } => EventKind::SpecialTileCreated,
            Self::SpecialTileActivated { .. } => EventKind::SpecialTileActivated,
            Self::SpecialComboActivated { .. } => EventKind::SpecialComboActivated,
            Self::ScoreUpdate { .. } => EventKind::ScoreUpdate,
            Self::ComboTrigger { .. } => EventKind::ComboTrigger,
            Self::MovesUpdate { .. } => EventKind::MovesUpdate,
            Self::BoardStable => EventKind::BoardStable,
            Self::MovesNone => EventKind::MovesNone,
            Self::BoardShuffleStart => EventKind::BoardShuffleStart,
            Self::BoardShuffle { .. } => EventKind::BoardShuffle,
            Self::BoardReset => EventKind::BoardReset,
            Self::TimerUpdate { .. } => EventKind::TimerUpdate,
            Self::TimerWarning { .. } => EventKind::TimerWarning,
            Self::GameOver { .. } => EventKind::GameOver,
            Self::Error { .. } => EventKind::Error,
        }
    }
}

/// Handle returned by the subscribe methods of [`EventBus`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("listener#{_0}")]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&GameEvent)>;

struct Subscription {
    id: ListenerId,
    kind: Option<EventKind>,
    once: bool,
    listener: Listener,
}

/// A session-scoped publish/subscribe bus.
///
/// Listeners run synchronously inside [`emit`](Self::emit), in subscription
/// order. Receivers created by [`channel`](Self::channel) get a clone of
/// every event and are dropped from the bus once disconnected.
///
/// # Examples
///
/// ```
/// use std::{cell::Cell, rc::Rc};
///
/// use matchfall_game::{EventBus, EventKind, GameEvent};
///
/// let mut bus = EventBus::new();
/// let seen = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&seen);
/// bus.once(EventKind::BoardStable, move |_| counter.set(counter.get() + 1));
///
/// bus.emit(&GameEvent::BoardStable);
/// bus.emit(&GameEvent::BoardStable);
/// assert_eq!(seen.get(), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    mirrors: Vec<mpsc::Sender<GameEvent>>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("mirrors", &self.mirrors.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe(&mut self, kind: Option<EventKind>, once: bool, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            once,
            listener,
        });
        id
    }

    /// Calls `listener` for every event of `kind`.
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.subscribe(Some(kind), false, Box::new(listener))
    }

    /// Calls `listener` for every event.
    pub fn on_any<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.subscribe(None, false, Box::new(listener))
    }

    /// Calls `listener` for the next event of `kind` only.
    pub fn once<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.subscribe(Some(kind), true, Box::new(listener))
    }

    /// Removes a listener.
    ///
    /// Returns `false` if `id` is unknown or already removed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Delivers `event` to every matching listener and mirror channel.
    pub fn emit(&mut self, event: &GameEvent) {
        let kind = event.kind();
        log::trace!("emit {kind}");
        self.subscriptions.retain_mut(|s| {
            if s.kind.is_some_and(|k| k != kind) {
                return true;
            }
            (s.listener)(event);
            !s.once
        });
        self.mirrors.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of listeners that would receive an event of
    /// `kind`, including catch-all ones.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| s.kind.is_none_or(|k| k == kind))
            .count()
    }

    /// Removes every listener and mirror channel.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.mirrors.clear();
    }

    /// Returns a receiver that gets a copy of every subsequent event.
    pub fn channel(&mut self) -> mpsc::Receiver<GameEvent> {
        let (tx, rx) = mpsc::channel();
        self.mirrors.push(tx);
        rx
    }
}
