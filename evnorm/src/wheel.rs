//! Scroll wheel normalization.
//!
//! Both wheel axes accumulate motion in 120ths of a detent. Sub-detent
//! motion is held back until a full detent's worth has built up in one
//! direction, after which the wheel is considered "in motion" and further
//! deltas stream out immediately. Half a second of silence ends the motion.
//! A direction reversal discards whatever was pending.
//!
//! Devices without hi-res axes report whole ticks on the legacy axes; those
//! are synthesized into v120 units so consumers see one value space.

use embassy_time::Instant;
use evnorm_types::axis::{RelAxis, ScrollAxis};

use crate::config::WheelConfig;
use crate::event::{Event, EventSink};
use crate::timer::OneShot;
use crate::{WHEEL_SCROLL_THRESHOLD, WHEEL_SETTLE_TIMEOUT, WHEEL_TICK};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Idle,
    /// Sub-threshold motion pending, nothing emitted yet.
    Accumulating,
    /// Past the threshold; deltas flush on every frame.
    Scrolling,
}

const V: usize = 0;
const H: usize = 1;

pub struct WheelEngine {
    state: State,
    /// Pending motion per axis, v120 units.
    v120: [i32; 2],
    /// Last observed direction per axis: -1, 0 or 1.
    dir: [i8; 2],
    settle: OneShot,
    config: WheelConfig,
    /// Hi-res samples observed; once set, legacy ticks are ignored.
    hi_res_seen: bool,
    synth_logged: bool,
}

impl WheelEngine {
    pub fn new(config: WheelConfig) -> Self {
        Self {
            state: State::Idle,
            v120: [0; 2],
            dir: [0; 2],
            settle: OneShot::new(),
            config,
            hi_res_seen: config.hi_res,
            synth_logged: false,
        }
    }

    /// Feed one relative sample. Returns `true` if the sample was a wheel
    /// axis and has been consumed.
    pub fn on_rel(&mut self, axis: RelAxis, value: i32) -> bool {
        let (idx, v120) = match axis {
            RelAxis::WheelHiRes => (V, value),
            RelAxis::HWheelHiRes => (H, value),
            RelAxis::Wheel => {
                if self.hi_res_seen {
                    return true;
                }
                self.log_synth();
                (V, value * WHEEL_TICK)
            }
            RelAxis::HWheel => {
                if self.hi_res_seen {
                    return true;
                }
                self.log_synth();
                (H, value * WHEEL_TICK)
            }
        };
        if matches!(axis, RelAxis::WheelHiRes | RelAxis::HWheelHiRes) {
            self.hi_res_seen = true;
        }
        if v120 == 0 {
            return true;
        }

        let sign: i8 = if v120 > 0 { 1 } else { -1 };
        if self.dir[idx] != 0 && self.dir[idx] != sign {
            // Reversal: pending motion in the old direction is stale.
            self.v120 = [0; 2];
            self.dir = [0; 2];
            self.settle.cancel();
            self.state = State::Idle;
        }
        self.dir[idx] = sign;
        self.v120[idx] += v120;
        true
    }

    fn log_synth(&mut self) {
        if !self.synth_logged {
            self.synth_logged = true;
            debug!("wheel: synthesizing v120 from legacy tick axes");
        }
    }

    /// End-of-frame: decide whether accumulated motion goes out.
    pub fn flush(&mut self, now: Instant, sink: &mut impl EventSink) {
        let past_threshold =
            self.v120[V].abs() >= WHEEL_SCROLL_THRESHOLD || self.v120[H].abs() >= WHEEL_SCROLL_THRESHOLD;

        match self.state {
            State::Idle | State::Accumulating => {
                if past_threshold {
                    self.emit(sink);
                    self.state = State::Scrolling;
                    self.settle.arm_after(now, WHEEL_SETTLE_TIMEOUT);
                } else if self.v120[V] != 0 || self.v120[H] != 0 {
                    self.state = State::Accumulating;
                }
            }
            State::Scrolling => {
                if self.v120[V] != 0 || self.v120[H] != 0 {
                    self.emit(sink);
                    self.settle.arm_after(now, WHEEL_SETTLE_TIMEOUT);
                }
            }
        }
    }

    fn emit(&mut self, sink: &mut impl EventSink) {
        for (idx, axis) in [(V, ScrollAxis::Vertical), (H, ScrollAxis::Horizontal)] {
            let v120 = self.v120[idx];
            if v120 == 0 {
                continue;
            }
            self.v120[idx] = 0;
            sink.push(Event::Scroll {
                axis,
                degrees: v120 as f32 / WHEEL_TICK as f32 * self.config.click_angle,
                v120,
            });
        }
    }

    pub fn next_timeout(&self) -> Option<Instant> {
        self.settle.deadline()
    }

    pub fn dispatch_timers(&mut self, now: Instant) {
        if self.settle.poll(now).is_some() {
            self.state = State::Idle;
            self.v120 = [0; 2];
            self.dir = [0; 2];
        }
    }

    /// Drop pending motion, for suspend.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.v120 = [0; 2];
        self.dir = [0; 2];
        self.settle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use super::*;

    type Sink = Vec<Event, 16>;

    fn ms(v: u64) -> Instant {
        Instant::from_millis(v)
    }

    fn engine() -> WheelEngine {
        WheelEngine::new(WheelConfig::default())
    }

    #[test]
    fn sub_threshold_motion_is_withheld() {
        let mut wheel = engine();
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::WheelHiRes, 30);
        wheel.flush(ms(0), &mut sink);
        wheel.on_rel(RelAxis::WheelHiRes, 20);
        wheel.flush(ms(10), &mut sink);

        assert!(sink.is_empty());
        assert_eq!(wheel.next_timeout(), None);
    }

    #[test]
    fn threshold_crossing_emits_full_accumulation() {
        let mut wheel = engine();
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::WheelHiRes, 40);
        wheel.flush(ms(0), &mut sink);
        wheel.on_rel(RelAxis::WheelHiRes, 40);
        wheel.flush(ms(10), &mut sink);

        assert_eq!(
            &sink[..],
            &[Event::Scroll {
                axis: ScrollAxis::Vertical,
                degrees: 10.0,
                v120: 80
            }]
        );
    }

    #[test]
    fn scrolling_streams_every_frame() {
        let mut wheel = engine();
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::WheelHiRes, 120);
        wheel.flush(ms(0), &mut sink);
        wheel.on_rel(RelAxis::WheelHiRes, 10);
        wheel.flush(ms(10), &mut sink);

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink[1],
            Event::Scroll {
                axis: ScrollAxis::Vertical,
                degrees: 1.25,
                v120: 10
            }
        );
        assert_eq!(wheel.next_timeout(), Some(ms(510)));
    }

    #[test]
    fn settle_timeout_returns_to_idle() {
        let mut wheel = engine();
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::WheelHiRes, 120);
        wheel.flush(ms(0), &mut sink);
        wheel.dispatch_timers(ms(500));
        assert_eq!(wheel.next_timeout(), None);

        // Back to idle: small motion accumulates again instead of streaming.
        wheel.on_rel(RelAxis::WheelHiRes, 10);
        wheel.flush(ms(600), &mut sink);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn reversal_discards_pending_motion() {
        let mut wheel = engine();
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::WheelHiRes, 50);
        wheel.flush(ms(0), &mut sink);
        // Reverse: the 50 pending units are stale.
        wheel.on_rel(RelAxis::WheelHiRes, -30);
        wheel.flush(ms(10), &mut sink);
        assert!(sink.is_empty());

        wheel.on_rel(RelAxis::WheelHiRes, -30);
        wheel.flush(ms(20), &mut sink);
        assert_eq!(
            &sink[..],
            &[Event::Scroll {
                axis: ScrollAxis::Vertical,
                degrees: -7.5,
                v120: -60
            }]
        );
    }

    #[test]
    fn legacy_ticks_are_synthesized() {
        let mut wheel = WheelEngine::new(WheelConfig {
            hi_res: false,
            ..WheelConfig::default()
        });
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::Wheel, 1);
        wheel.flush(ms(0), &mut sink);

        assert_eq!(
            &sink[..],
            &[Event::Scroll {
                axis: ScrollAxis::Vertical,
                degrees: 15.0,
                v120: 120
            }]
        );
    }

    #[test]
    fn legacy_ticks_ignored_once_hi_res_seen() {
        let mut wheel = WheelEngine::new(WheelConfig {
            hi_res: false,
            ..WheelConfig::default()
        });
        let mut sink = Sink::new();

        // Device turns out to report both; hi-res wins from then on.
        wheel.on_rel(RelAxis::WheelHiRes, 120);
        wheel.on_rel(RelAxis::Wheel, 1);
        wheel.flush(ms(0), &mut sink);

        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink[0],
            Event::Scroll {
                axis: ScrollAxis::Vertical,
                degrees: 15.0,
                v120: 120
            }
        );
    }

    #[test]
    fn horizontal_and_vertical_are_independent() {
        let mut wheel = engine();
        let mut sink = Sink::new();

        wheel.on_rel(RelAxis::WheelHiRes, 120);
        wheel.on_rel(RelAxis::HWheelHiRes, -120);
        wheel.flush(ms(0), &mut sink);

        assert_eq!(sink.len(), 2);
        assert!(matches!(sink[0], Event::Scroll { axis: ScrollAxis::Vertical, v120: 120, .. }));
        assert!(matches!(sink[1], Event::Scroll { axis: ScrollAxis::Horizontal, v120: -120, .. }));
    }
}
