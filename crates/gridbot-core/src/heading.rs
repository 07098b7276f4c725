//! Heading tracking and turn-signal derivation.
//!
//! The sync loop commits a new heading after every accepted decision; the
//! motion controller reads the resulting [`TurnSignal`] at intersections.
//! Heading and pending signal live under one lock so they are always
//! observed as a pair.

use std::sync::{Mutex, MutexGuard, PoisonError};

use gridbot_types::{Direction, Heading, TurnSignal};
use serde::Serialize;
use tracing::debug;

/// Maneuver needed to go from heading `prev` to heading `new`.
///
/// Total over all 16 pairs: equal headings need no turn, a quarter turn
/// counter-clockwise is [`TurnSignal::TurnLeft`], clockwise is
/// [`TurnSignal::TurnRight`], and a reversal is [`TurnSignal::UTurn`].
pub const fn derive_turn_signal(prev: Heading, new: Heading) -> TurnSignal {
    use Direction::{Down, Left, Right, Up};
    match (prev, new) {
        (Up, Up) | (Down, Down) | (Left, Left) | (Right, Right) => TurnSignal::NoTurn,
        (Up, Left) | (Left, Down) | (Down, Right) | (Right, Up) => TurnSignal::TurnLeft,
        (Up, Right) | (Right, Down) | (Down, Left) | (Left, Up) => TurnSignal::TurnRight,
        (Up, Down) | (Down, Up) | (Left, Right) | (Right, Left) => TurnSignal::UTurn,
    }
}

/// Last committed heading and the turn signal it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Steering {
    /// Last committed heading.
    pub heading: Heading,
    /// Signal waiting for the next intersection.
    pub pending: TurnSignal,
}

/// Shared heading and pending turn signal.
#[derive(Debug)]
pub struct HeadingTracker {
    steering: Mutex<Steering>,
    consume_once: bool,
}

impl HeadingTracker {
    /// Create a tracker starting at `initial` with no pending turn.
    ///
    /// With `consume_once`, [`take_pending`](Self::take_pending) clears the
    /// signal after returning it. Without it, the signal is returned at every
    /// intersection until the next [`commit`](Self::commit).
    pub const fn new(initial: Heading, consume_once: bool) -> Self {
        Self {
            steering: Mutex::new(Steering {
                heading: initial,
                pending: TurnSignal::NoTurn,
            }),
            consume_once,
        }
    }

    /// Commit `new` as the heading and publish the turn it requires.
    pub fn commit(&self, new: Heading) -> TurnSignal {
        let mut steering = self.lock();
        let previous = steering.heading;
        let signal = derive_turn_signal(previous, new);
        *steering = Steering {
            heading: new,
            pending: signal,
        };
        drop(steering);
        debug!(%previous, heading = %new, %signal, "heading committed");
        signal
    }

    /// The signal to execute at the current intersection.
    pub fn take_pending(&self) -> TurnSignal {
        let mut steering = self.lock();
        let signal = steering.pending;
        if self.consume_once {
            steering.pending = TurnSignal::NoTurn;
        }
        signal
    }

    /// Current heading and pending signal.
    pub fn steering(&self) -> Steering {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Steering> {
        self.steering.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
