use std::{collections::HashMap, fmt};

use derive_more::{Display, IsVariant};
use serde::{Deserialize, Serialize};

use crate::{EventBus, GameEvent};

/// The session's finite state.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, IsVariant, Serialize, Deserialize,
)]
pub enum GameState {
    /// Before a session starts, or after it ended.
    #[default]
    #[display("menu")]
    Menu,
    /// Accepting swaps.
    #[display("playing")]
    Playing,
    /// Clock stopped, input ignored.
    #[display("paused")]
    Paused,
    /// A swap is being resolved.
    #[display("animating")]
    Animating,
    /// The session is over.
    #[display("game-over")]
    GameOver,
}

impl GameState {
    /// Returns the states reachable from `self` in one transition.
    #[must_use]
    pub fn successors(self) -> &'static [GameState] {
        use GameState::{Animating, GameOver, Menu, Paused, Playing};
        match self {
            Menu => &[Playing],
            Playing => &[Animating, Paused, GameOver],
            Animating => &[Playing, GameOver],
            Paused => &[Playing, Menu],
            GameOver => &[Menu],
        }
    }

    /// Returns `true` if the transition `self -> to` is allowed.
    #[must_use]
    pub fn can_transition_to(self, to: GameState) -> bool {
        self.successors().contains(&to)
    }
}

/// Why a session ended.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, IsVariant, Serialize, Deserialize)]
pub enum GameOverReason {
    /// The session clock ran out.
    #[display("time-up")]
    TimeUp,
    /// The board has no legal move.
    #[display("no-moves")]
    NoMoves,
}

/// Callback run on entering or leaving a state.
///
/// Enter hooks receive the previous state; exit hooks receive the next one.
pub type StateHook = Box<dyn FnMut(GameState)>;

/// Enforces the legal [`GameState`] transitions.
///
/// Successful transitions record the previous state, run the exit hooks of
/// the old state and the enter hooks of the new one, and emit
/// [`GameEvent::StateChange`].
pub struct StateManager {
    current: GameState,
    previous: Option<GameState>,
    enter_hooks: HashMap<GameState, Vec<StateHook>>,
    exit_hooks: HashMap<GameState, Vec<StateHook>>,
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    /// Creates a manager in [`GameState::Menu`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: GameState::Menu,
            previous: None,
            enter_hooks: HashMap::new(),
            exit_hooks: HashMap::new(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn current(&self) -> GameState {
        self.current
    }

    /// Returns the state before the last successful transition.
    #[must_use]
    pub fn previous(&self) -> Option<GameState> {
        self.previous
    }

    /// Registers a hook run whenever `state` is entered.
    pub fn on_enter(&mut self, state: GameState, hook: StateHook) {
        self.enter_hooks.entry(state).or_default().push(hook);
    }

    /// Registers a hook run whenever `state` is left.
    pub fn on_exit(&mut self, state: GameState, hook: StateHook) {
        self.exit_hooks.entry(state).or_default().push(hook);
    }

    /// Returns `true` if the current state may move to `to`.
    #[must_use]
    pub fn can_transition(&self, to: GameState) -> bool {
        self.current.can_transition_to(to)
    }

    /// Moves to `to` if the transition is legal.
    ///
    /// Setting the current state again succeeds without side effects. An
    /// illegal transition is logged and leaves the state unchanged.
    ///
    /// Returns `true` if the machine is in `to` afterwards.
    pub fn set_state(&mut self, to: GameState, events: &mut EventBus) -> bool {
        let from = self.current;
        if from == to {
            return true;
        }
        if !self.can_transition(to) {
            log::warn!("illegal state transition {from} -> {to}");
            return false;
        }
        self.apply(to, events);
        true
    }

    /// Forces the machine back to [`GameState::Menu`].
    pub fn reset(&mut self, events: &mut EventBus) {
        if self.current != GameState::Menu {
            self.apply(GameState::Menu, events);
        }
    }

    fn apply(&mut self, to: GameState, events: &mut EventBus) {
        let from = self.current;
        for hook in self.exit_hooks.get_mut(&from).into_iter().flatten() {
            hook(to);
        }
        self.previous = Some(from);
        self.current = to;
        for hook in self.enter_hooks.get_mut(&to).into_iter().flatten() {
            hook(from);
        }
        log::debug!("state {from} -> {to}");
        events.emit(&GameEvent::StateChange { from, to });
    }

    /// Returns `true` if the current state is `state`.
    #[must_use]
    pub fn is_state(&self, state: GameState) -> bool {
        self.current == state
    }

    /// Returns `true` while a session is live ([`Playing`](GameState::Playing)
    /// or [`Animating`](GameState::Animating)).
    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(self.current, GameState::Playing | GameState::Animating)
    }

    /// Returns `true` if paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.current.is_paused()
    }

    /// Returns `true` if the session is over.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.current.is_game_over()
    }

    /// Returns `true` while a swap is being resolved.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.current.is_animating()
    }
}
