//! Pen/touch arbitration.
//!
//! While a pen is near the surface, touches are unreliable: the hand
//! holding the pen rests on the digitizer. The tablet side drives the
//! arbitration mode; the touch side consults it before announcing a new
//! contact. Contacts that were vetoed stay invisible for their whole life,
//! and already-live contacts are force-cancelled by the device dispatcher
//! when arbitration engages.
//!
//! Leaving arbitration is deliberately sluggish: the hand lifts after the
//! pen does, so touches are still suspect for a grace period after the pen
//! leaves.

use embassy_time::Instant;
use evnorm_types::geometry::{Point, Rect};

use crate::ARBITRATION_REARM_DELAY;
use crate::timer::OneShot;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArbitrationMode {
    /// Touches flow normally.
    #[default]
    NotActive,
    /// Touches near the pen are vetoed; the rest flow normally.
    IgnoreRect,
    /// All touches are vetoed.
    IgnoreAll,
}

pub struct TouchArbitration {
    mode: ArbitrationMode,
    rect: Option<Rect>,
    /// Grace period after arbitration is lifted.
    rearm: OneShot,
}

impl TouchArbitration {
    pub const fn new() -> Self {
        Self {
            mode: ArbitrationMode::NotActive,
            rect: None,
            rearm: OneShot::new(),
        }
    }

    pub fn mode(&self) -> ArbitrationMode {
        self.mode
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Change mode. `rect` is consulted only in [`ArbitrationMode::IgnoreRect`].
    pub fn set_mode(&mut self, mode: ArbitrationMode, rect: Option<Rect>, now: Instant) {
        if mode == self.mode && rect == self.rect {
            return;
        }
        debug!("arbitration: {:?} -> {:?}", self.mode, mode);
        if mode == ArbitrationMode::NotActive {
            self.rearm.arm_after(now, ARBITRATION_REARM_DELAY);
        } else {
            self.rearm.cancel();
        }
        self.mode = mode;
        self.rect = rect;
    }

    /// Update the suppression rectangle without touching the mode, for a
    /// pen moving while arbitration stays engaged.
    pub fn set_region(&mut self, rect: Option<Rect>) {
        self.rect = rect;
    }

    /// May a contact that begins at `point` be announced?
    pub fn touch_allowed(&self, point: Point, now: Instant) -> bool {
        match self.mode {
            ArbitrationMode::IgnoreAll => false,
            ArbitrationMode::IgnoreRect => match self.rect {
                Some(rect) => !rect.contains(point),
                None => false,
            },
            ArbitrationMode::NotActive => match self.rearm.deadline() {
                Some(at) => now >= at,
                None => true,
            },
        }
    }
}

impl Default for TouchArbitration {
    fn default() -> Self {
        Self::new()
    }
}
