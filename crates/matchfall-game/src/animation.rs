//! The seam between the engine and whatever plays its animations.
//!
//! The engine never looks inside an animation: it hands an [`Animation`] to
//! its [`Animator`] and awaits the returned future before mutating the board
//! again.

use std::{fmt, future::Future, pin::Pin, sync::mpsc, time::Duration};

use futures_channel::oneshot;
use matchfall_core::{Position, Tile, TileMove};

/// A visual step the engine waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Animation {
    /// Two tiles trade places.
    Swap {
        /// First cell.
        from: Position,
        /// Second cell.
        to: Position,
        /// Playback length.
        duration: Duration,
    },
    /// A swap without matches is undone.
    Revert {
        /// First cell.
        from: Position,
        /// Second cell.
        to: Position,
        /// Playback length.
        duration: Duration,
    },
    /// Tiles disappear.
    Remove {
        /// Cleared cells.
        positions: Vec<Position>,
        /// Playback length.
        duration: Duration,
    },
    /// Tiles fall.
    Fall {
        /// Gravity moves.
        moves: Vec<TileMove>,
        /// Playback length.
        duration: Duration,
    },
    /// New tiles appear.
    Spawn {
        /// Spawned tiles.
        tiles: Vec<Tile>,
        /// Playback length.
        duration: Duration,
    },
    /// Pause before a dead board is reshuffled.
    ShuffleDelay {
        /// Pause length.
        duration: Duration,
    },
}

impl Animation {
    /// Returns the configured playback length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Swap { duration, .. }
            | Self::Revert { duration, .. }
            | Self::Remove { duration, .. }
            | Self::Fall { duration, .. }
            | Self::Spawn { duration, .. }
            | Self::ShuffleDelay { duration } => *duration,
        }
    }
}

/// Future returned by [`Animator::play`].
pub type AnimationFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

/// Plays animations for the engine.
pub trait Animator: fmt::Debug {
    /// Starts `animation`; the returned future resolves when it has finished.
    fn play(&mut self, animation: Animation) -> AnimationFuture<'_>;
}

/// Type-erased animator owned by the engine.
pub type BoxedAnimator = Box<dyn Animator>;

/// Finishes every animation immediately.
///
/// Used by headless drivers and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantAnimator;

impl Animator for InstantAnimator {
    fn play(&mut self, animation: Animation) -> AnimationFuture<'_> {
        log::trace!("instant {animation:?}");
        Box::pin(std::future::ready(()))
    }
}

/// Forwards animations to a collaborator over a channel.
///
/// Each [`AnimationRequest`] carries a responder; the engine resumes once the
/// collaborator calls [`AnimationRequest::finish`] or drops the request.
#[derive(Debug, Clone)]
pub struct ChannelAnimator {
    sender: mpsc::Sender<AnimationRequest>,
}

impl ChannelAnimator {
    /// Creates an animator and the receiving end for the collaborator.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<AnimationRequest>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl Animator for ChannelAnimator {
    fn play(&mut self, animation: Animation) -> AnimationFuture<'_> {
        let (responder, receiver) = oneshot::channel();
        let sent = self
            .sender
            .send(AnimationRequest {
                animation,
                responder,
            })
            .is_ok();
        Box::pin(async move {
            if !sent {
                log::debug!("animation receiver gone, skipping");
                return;
            }
            if receiver.await.is_err() {
                log::debug!("animation request dropped without reply");
            }
        })
    }
}

/// An animation waiting to be played by a collaborator.
#[derive(Debug)]
pub struct AnimationRequest {
    /// What to play.
    pub animation: Animation,
    responder: oneshot::Sender<()>,
}

impl AnimationRequest {
    /// Reports the animation as finished.
    pub fn finish(self) {
        // the engine may have been dropped in the meantime
        let _ = self.responder.send(());
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;

    use super::*;
    use crate::executor::{block_on, poll_once};

    fn swap() -> Animation {
        Animation::Swap {
            from: Position::new(0, 0),
            to: Position::new(1, 0),
            duration: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_duration() {
        assert_eq!(swap().duration(), Duration::from_millis(200));
        let delay = Animation::ShuffleDelay {
            duration: Duration::from_secs(2),
        };
        assert_eq!(delay.duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_instant_animator_is_ready() {
        let mut animator = InstantAnimator;
        let future = animator.play(swap());
        assert!(poll_once(pin!(future)).is_ready());
    }

    #[test]
    fn test_channel_animator_waits_for_finish() {
        let (mut animator, requests) = ChannelAnimator::new();
        let mut future = animator.play(swap());

        assert!(poll_once(future.as_mut()).is_pending());
        let request = requests.try_recv().unwrap();
        assert_eq!(request.animation, swap());
        assert!(poll_once(future.as_mut()).is_pending());

        request.finish();
        assert!(poll_once(future.as_mut()).is_ready());
    }

    #[test]
    fn test_channel_animator_dropped_request_counts_as_finished() {
        let (mut animator, requests) = ChannelAnimator::new();
        let future = animator.play(swap());
        drop(requests.try_recv().unwrap());
        block_on(future);
    }

    #[test]
    fn test_channel_animator_without_receiver() {
        let (mut animator, requests) = ChannelAnimator::new();
        drop(requests);
        block_on(animator.play(swap()));
    }
}
