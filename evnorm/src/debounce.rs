//! Button debouncing.
//!
//! Mechanical buttons bounce: one physical actuation produces a burst of
//! make/break transitions. This engine converts the raw edges into exactly
//! one press and one release per actuation.
//!
//! Two failure modes are handled:
//!
//! - *contact bounce*: extra edges within [`BOUNCE_TIMEOUT`] of a real one.
//!   A transmitted edge opens a bounce window; opposite edges inside the
//!   window are withheld, and a bounce pair (edge plus its undo) coalesces
//!   to nothing.
//! - *spurious releases*: some devices emit a release/press pair while the
//!   button is physically held. Once observed (a press following a
//!   transmitted release survives [`SPURIOUS_TIMEOUT`] without a matching
//!   release), the engine learns it permanently and from then on withholds
//!   releases for the spurious window, so an immediate re-press cancels the
//!   release entirely.
//!
//! Only one button lineage is reasoned about at a time. Any edge on a
//! different button flushes the machine to its neutral state first and then
//! passes through undebounced. This intentionally treats slow two-window
//! bounces the same as fast ones.

use embassy_time::Instant;
use evnorm_types::button::ButtonCode;

use crate::error::Violation;
use crate::event::{Event, EventSink};
use crate::timer::{OneShot, earliest};
use crate::{BOUNCE_TIMEOUT, SPURIOUS_TIMEOUT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Neutral, button up, no timers.
    Up,
    /// Neutral, button down, no timers.
    Down,
    /// Press transmitted, waiting for the bounce window to close.
    DownWaiting,
    /// Release transmitted, waiting for the bounce window to close.
    UpWaiting,
    /// Release withheld until the bounce window closes.
    UpDelaying,
    /// Press withheld until the bounce window closes.
    DownDelaying,
    /// Bounce/spurious discrimination, nothing withheld.
    UpDetectingSpurious,
    /// Bounce/spurious discrimination, press withheld.
    DownDetectingSpurious,
    /// Learned-spurious mode: release withheld for the spurious window.
    UpDelayingSpurious,
    /// Quirk: no debouncing, edges pass straight through.
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Edge {
    Press,
    Release,
    OtherButton,
    BounceTimeout,
    SpuriousTimeout,
}

pub struct DebounceEngine {
    state: State,
    button: ButtonCode,
    button_time: Instant,
    bounce: OneShot,
    spurious: OneShot,
    spurious_enabled: bool,
}

impl DebounceEngine {
    pub fn new(disabled: bool) -> Self {
        Self {
            state: if disabled { State::Disabled } else { State::Up },
            button: ButtonCode(0),
            button_time: Instant::from_ticks(0),
            bounce: OneShot::new(),
            spurious: OneShot::new(),
            spurious_enabled: false,
        }
    }

    /// Feed the button edges of one frame, in order.
    pub fn handle_frame(
        &mut self,
        edges: &[(ButtonCode, bool)],
        time: Instant,
        sink: &mut impl EventSink,
    ) {
        for &(code, pressed) in edges {
            self.handle_button(code, pressed, time, sink);
        }
    }

    fn handle_button(
        &mut self,
        code: ButtonCode,
        pressed: bool,
        time: Instant,
        sink: &mut impl EventSink,
    ) {
        if self.state == State::Disabled {
            sink.push(Event::Button { code, pressed });
            return;
        }

        // A press while fully idle starts a new lineage.
        if self.state == State::Up && pressed {
            self.button = code;
        }

        if code != self.button {
            self.fsm(Edge::OtherButton, time, sink);
            // Edges of untracked buttons bypass the machine.
            sink.push(Event::Button { code, pressed });
        } else {
            let edge = if pressed { Edge::Press } else { Edge::Release };
            self.fsm(edge, time, sink);
        }
    }

    pub fn next_timeout(&self) -> Option<Instant> {
        earliest(self.bounce.deadline(), self.spurious.deadline())
    }

    /// Deliver expired timers, earliest first.
    pub fn dispatch_timers(&mut self, now: Instant, sink: &mut impl EventSink) {
        loop {
            let bounce_due = self.bounce.deadline().filter(|&at| at <= now);
            let spurious_due = self.spurious.deadline().filter(|&at| at <= now);
            let spurious_first = match (bounce_due, spurious_due) {
                (None, None) => break,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some(b), Some(s)) => s <= b,
            };
            if spurious_first {
                if let Some(at) = self.spurious.poll(now) {
                    self.fsm(Edge::SpuriousTimeout, at, sink);
                }
            } else if let Some(at) = self.bounce.poll(now) {
                self.fsm(Edge::BounceTimeout, at, sink);
            }
        }
    }

    /// Whether the tracked button is logically down (a withheld release
    /// still counts as down).
    fn logically_down(&self) -> bool {
        matches!(
            self.state,
            State::Down | State::DownWaiting | State::UpDelaying | State::UpDelayingSpurious
        )
    }

    /// Return to rest for suspend: cancel timers, release a held button.
    pub fn force_release(&mut self, sink: &mut impl EventSink) {
        if self.state == State::Disabled {
            return;
        }
        if self.logically_down() {
            self.notify(false, sink);
        }
        self.bounce.cancel();
        self.spurious.cancel();
        self.state = State::Up;
    }

    fn notify(&self, pressed: bool, sink: &mut impl EventSink) {
        sink.push(Event::Button {
            code: self.button,
            pressed,
        });
    }

    fn bug(&self, edge: Edge) {
        let violation = match edge {
            Edge::BounceTimeout | Edge::SpuriousTimeout => Violation::UnexpectedTimeout,
            _ => Violation::UnexpectedButtonEdge,
        };
        warn!(
            "debounce: {:?} for {} in state {:?}, dropped ({:?})",
            edge,
            self.button.name(),
            self.state,
            violation
        );
    }

    fn enable_spurious(&mut self, time: Instant) {
        if !self.spurious_enabled {
            self.spurious_enabled = true;
            info!(
                "debounce: spurious release on {} {}ms after press, enabling filter",
                self.button.name(),
                (time - self.button_time).as_millis()
            );
        }
    }

    fn fsm(&mut self, edge: Edge, time: Instant, sink: &mut impl EventSink) {
        match self.state {
            State::Up => match edge {
                Edge::Press => {
                    self.button_time = time;
                    self.notify(true, sink);
                    self.bounce.arm(time + BOUNCE_TIMEOUT);
                    self.state = State::DownWaiting;
                }
                Edge::OtherButton => {}
                _ => self.bug(edge),
            },

            State::Down => match edge {
                Edge::Release => {
                    if self.spurious_enabled {
                        self.spurious.arm(time + SPURIOUS_TIMEOUT);
                        self.state = State::UpDelayingSpurious;
                    } else {
                        self.notify(false, sink);
                        self.bounce.arm(time + BOUNCE_TIMEOUT);
                        self.state = State::UpWaiting;
                    }
                }
                Edge::OtherButton => {}
                _ => self.bug(edge),
            },

            State::DownWaiting => match edge {
                // The withheld release keeps the original window deadline.
                Edge::Release => self.state = State::UpDelaying,
                Edge::BounceTimeout => self.state = State::Down,
                Edge::OtherButton => {
                    self.bounce.cancel();
                    self.state = State::Down;
                }
                _ => self.bug(edge),
            },

            State::UpWaiting => match edge {
                Edge::Press => {
                    self.button_time = time;
                    if self.spurious_enabled {
                        self.state = State::DownDelaying;
                    } else {
                        self.spurious.arm(time + SPURIOUS_TIMEOUT);
                        self.state = State::DownDetectingSpurious;
                    }
                }
                Edge::BounceTimeout => self.state = State::Up,
                Edge::OtherButton => {
                    self.bounce.cancel();
                    self.state = State::Up;
                }
                _ => self.bug(edge),
            },

            State::UpDelaying => match edge {
                // Bounce pair: the withheld release and this press
                // coalesce to nothing.
                Edge::Press => self.state = State::DownWaiting,
                Edge::BounceTimeout => {
                    self.notify(false, sink);
                    self.bounce.arm(time + BOUNCE_TIMEOUT);
                    self.state = State::UpWaiting;
                }
                Edge::OtherButton => {
                    self.notify(false, sink);
                    self.bounce.cancel();
                    self.state = State::Up;
                }
                _ => self.bug(edge),
            },

            State::DownDelaying => match edge {
                Edge::Release => {
                    self.bounce.arm(time + BOUNCE_TIMEOUT);
                    self.state = State::UpWaiting;
                }
                Edge::BounceTimeout => {
                    self.notify(true, sink);
                    self.bounce.arm(time + BOUNCE_TIMEOUT);
                    self.state = State::DownWaiting;
                }
                Edge::OtherButton => {
                    self.notify(true, sink);
                    self.bounce.cancel();
                    self.state = State::Down;
                }
                _ => self.bug(edge),
            },

            State::DownDetectingSpurious => match edge {
                // A fast release reclassifies the pair as contact bounce.
                Edge::Release => {
                    self.spurious.arm(time + SPURIOUS_TIMEOUT);
                    self.state = State::UpDetectingSpurious;
                }
                // The press survived the spurious window: the transmitted
                // release and this press were a pair emitted while the
                // button was held. Learn, and restore the held state.
                Edge::SpuriousTimeout => {
                    self.enable_spurious(time);
                    self.notify(true, sink);
                    if !self.bounce.is_armed() {
                        self.bounce.arm(time + BOUNCE_TIMEOUT);
                    }
                    self.state = State::DownWaiting;
                }
                Edge::BounceTimeout => {
                    self.spurious.cancel();
                    self.notify(true, sink);
                    self.state = State::Down;
                }
                Edge::OtherButton => {
                    self.bounce.cancel();
                    self.spurious.cancel();
                    self.notify(true, sink);
                    self.state = State::Down;
                }
                _ => self.bug(edge),
            },

            State::UpDetectingSpurious => match edge {
                Edge::Press => {
                    self.button_time = time;
                    self.spurious.arm(time + SPURIOUS_TIMEOUT);
                    self.state = State::DownDetectingSpurious;
                }
                // Settled quietly: the storm was contact bounce.
                Edge::SpuriousTimeout => {
                    self.bounce.cancel();
                    self.state = State::Up;
                }
                Edge::BounceTimeout => {
                    self.spurious.cancel();
                    self.state = State::Up;
                }
                Edge::OtherButton => {
                    self.bounce.cancel();
                    self.spurious.cancel();
                    self.state = State::Up;
                }
                _ => self.bug(edge),
            },

            State::UpDelayingSpurious => match edge {
                // Lost and regained grip: the release never happened.
                Edge::Press => {
                    self.spurious.cancel();
                    self.state = State::Down;
                }
                Edge::SpuriousTimeout => {
                    self.notify(false, sink);
                    self.bounce.arm(time + BOUNCE_TIMEOUT);
                    self.state = State::UpWaiting;
                }
                Edge::OtherButton => {
                    self.spurious.cancel();
                    self.notify(false, sink);
                    self.state = State::Up;
                }
                _ => self.bug(edge),
            },

            State::Disabled => {}
        }
    }
}
