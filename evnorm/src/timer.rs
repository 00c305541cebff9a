//! One-shot software timers.
//!
//! The core owns no timer wheel: a timer here is just a deadline. The
//! embedding arms a real timer for [`crate::device::DeviceContext::next_timeout`]
//! and calls `dispatch_timers` between frames; engines then poll their
//! deadlines against the delivered time.

use embassy_time::{Duration, Instant};

/// A one-shot, rearmable deadline holder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OneShot {
    deadline: Option<Instant>,
}

impl OneShot {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or rearm) to fire at `at`.
    pub fn arm(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    /// Arm (or rearm) to fire `after` from `now`.
    pub fn arm_after(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// If the deadline has passed, disarm and return the instant the timer
    /// was due. The due time, not `now`, is what state machines should use
    /// for follow-up arithmetic so late delivery does not skew windows.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                Some(at)
            }
            _ => None,
        }
    }
}

/// Earliest of two optional deadlines.
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}
