//! Multitouch contact tracking.
//!
//! The slot protocol is stateful: the device addresses a slot and then
//! updates fields of that slot. Each kernel slot maps to one tracker slot;
//! a contact begins when a non-negative tracking id arrives and ends when
//! the id goes to -1. Devices without slots run through a single-touch
//! fallback that reports as slot index -1.
//!
//! Two overlays ride on the lifecycle:
//!
//! - *palm detection*: a contact the device classifies as a palm is
//!   suppressed for its whole life, even if it is later reclassified as a
//!   finger. A contact that becomes a palm mid-life is cancelled.
//! - *seat slots*: every contact visible downstream gets a slot number from
//!   an allocator shared across devices of the seat, so consumers can
//!   address contacts uniformly.
//!
//! Position updates smaller than half the axis fuzz are dropped as noise.

use embassy_time::Instant;
use evnorm_types::axis::{AbsAxis, MT_TOOL_PALM};
use evnorm_types::geometry::{Point, Rect};

use crate::arbitration::TouchArbitration;
use crate::config::TouchConfig;
use crate::error::Violation;
use crate::event::{Event, EventSink};
use crate::{MAX_SEAT_SLOTS, MAX_TOUCH_SLOTS};

/// Seat-wide contact slot allocator, shared by all touch devices of a seat.
#[derive(Debug, Default)]
pub struct SeatSlots {
    used: [bool; MAX_SEAT_SLOTS],
}

impl SeatSlots {
    pub const fn new() -> Self {
        Self {
            used: [false; MAX_SEAT_SLOTS],
        }
    }

    /// Lowest free slot, or `None` when the seat is saturated.
    pub fn allocate(&mut self) -> Option<u8> {
        let slot = self.used.iter().position(|used| !used)?;
        self.used[slot] = true;
        Some(slot as u8)
    }

    pub fn release(&mut self, slot: u8) {
        self.used[slot as usize] = false;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Lifecycle {
    #[default]
    None,
    /// Contact seen this frame, begin not yet announced.
    Begin,
    /// Contact announced and live.
    Update,
    /// Contact lifted this frame, end not yet announced.
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum PalmState {
    #[default]
    None,
    /// Classified as palm before the begin was announced.
    New,
    /// Suppressed palm, begin never announced.
    IsPalm,
    /// Reclassified as finger; stays suppressed until the contact ends.
    WasPalm,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    lifecycle: Lifecycle,
    palm: PalmState,
    seat_slot: Option<u8>,
    x: i32,
    y: i32,
    /// Position of the last emitted event, for hysteresis.
    ref_x: i32,
    ref_y: i32,
    dirty: bool,
    /// Contact began and ended within the same frame.
    pending_end: bool,
    /// Contact ended and a new one began on the slot within the same
    /// frame; the end must flush before the new begin.
    pending_restart: bool,
    /// Reclassified to palm mid-life; cancel at flush.
    palm_cancel: bool,
}

pub struct TouchTracker {
    slots: [Slot; MAX_TOUCH_SLOTS],
    current: usize,
    config: TouchConfig,
    /// Single-touch fallback: BTN_TOUCH drives slot 0, reported as -1.
    fallback_down: bool,
}

impl TouchTracker {
    pub fn new(config: TouchConfig) -> Self {
        Self {
            slots: [Slot::default(); MAX_TOUCH_SLOTS],
            current: 0,
            config,
            fallback_down: false,
        }
    }

    /// Feed one absolute sample. Returns `true` if consumed.
    pub fn on_abs(&mut self, axis: AbsAxis, value: i32) -> bool {
        match axis {
            AbsAxis::MtSlot => {
                let idx = value as usize;
                if idx < MAX_TOUCH_SLOTS {
                    self.current = idx;
                } else {
                    warn!("touch: slot {} out of range, pinning to last", value);
                    self.current = MAX_TOUCH_SLOTS - 1;
                }
            }
            AbsAxis::MtTrackingId => {
                if value >= 0 {
                    self.begin_contact(self.current);
                } else {
                    self.end_contact(self.current);
                }
            }
            AbsAxis::MtPositionX => {
                let slot = &mut self.slots[self.current];
                slot.x = value;
                slot.dirty = true;
            }
            AbsAxis::MtPositionY => {
                let slot = &mut self.slots[self.current];
                slot.y = value;
                slot.dirty = true;
            }
            AbsAxis::MtToolType => self.classify(self.current, value),
            // Single-touch axes; only meaningful without the slot protocol.
            AbsAxis::X if !self.config.mt => {
                let slot = &mut self.slots[0];
                slot.x = value;
                slot.dirty = true;
            }
            AbsAxis::Y if !self.config.mt => {
                let slot = &mut self.slots[0];
                slot.y = value;
                slot.dirty = true;
            }
            _ => return false,
        }
        true
    }

    /// BTN_TOUCH edge for single-touch devices.
    pub fn on_touch_button(&mut self, pressed: bool) {
        if self.config.mt {
            return;
        }
        if pressed && !self.fallback_down {
            self.fallback_down = true;
            self.begin_contact(0);
        } else if !pressed && self.fallback_down {
            self.fallback_down = false;
            self.end_contact(0);
        }
    }

    fn begin_contact(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        match slot.lifecycle {
            Lifecycle::None => {
                *slot = Slot {
                    lifecycle: Lifecycle::Begin,
                    // Keep a classification that arrived before the id, and
                    // the position: it may precede the id in the frame.
                    palm: slot.palm,
                    x: slot.x,
                    y: slot.y,
                    ..Slot::default()
                };
            }
            Lifecycle::End => {
                // Lift and re-touch within one frame: the old contact's
                // end flushes before the new begin.
                slot.pending_restart = true;
            }
            Lifecycle::Begin | Lifecycle::Update => {
                warn!(
                    "touch: tracking id on active slot {} ({:?})",
                    idx,
                    Violation::DuplicateContact
                );
            }
        }
    }

    fn end_contact(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        match slot.lifecycle {
            Lifecycle::Begin => slot.pending_end = true,
            Lifecycle::Update => slot.lifecycle = Lifecycle::End,
            Lifecycle::None | Lifecycle::End => {
                warn!(
                    "touch: end on inactive slot {} ({:?})",
                    idx,
                    Violation::EndWithoutContact
                );
            }
        }
    }

    fn classify(&mut self, idx: usize, tool: i32) {
        let slot = &mut self.slots[idx];
        let is_palm = tool == MT_TOOL_PALM;
        match (slot.palm, is_palm) {
            (PalmState::None, true) => match slot.lifecycle {
                Lifecycle::Begin => slot.palm = PalmState::New,
                Lifecycle::Update => {
                    // Mid-life reclassification: the begin already went out.
                    slot.palm = PalmState::IsPalm;
                    slot.palm_cancel = true;
                }
                _ => slot.palm = PalmState::New,
            },
            (PalmState::New | PalmState::IsPalm, false) => {
                // Reclassified back to finger: stays invisible regardless.
                slot.palm = PalmState::WasPalm;
            }
            (PalmState::WasPalm, true) => slot.palm = PalmState::IsPalm,
            _ => {}
        }
    }

    fn hysteresis_margin(&self) -> (i32, i32) {
        (self.config.x.fuzz / 2, self.config.y.fuzz / 2)
    }

    fn report_index(&self, idx: usize) -> i32 {
        if self.config.mt { idx as i32 } else { -1 }
    }

    /// End-of-frame: walk the slots in index order and announce changes.
    /// A [`Event::TouchFrame`] closes the group iff anything was announced.
    pub fn flush(
        &mut self,
        arbitration: &TouchArbitration,
        now: Instant,
        seat: &mut SeatSlots,
        sink: &mut impl EventSink,
    ) {
        let (margin_x, margin_y) = self.hysteresis_margin();
        let mut announced = false;

        for idx in 0..MAX_TOUCH_SLOTS {
            let report = self.report_index(idx);
            let slot = &mut self.slots[idx];

            // A restarted slot carries two contacts this frame: close the
            // old one first, then fall through to the new one's begin.
            if slot.lifecycle == Lifecycle::End && slot.pending_restart {
                if let Some(seat_slot) = slot.seat_slot.take() {
                    seat.release(seat_slot);
                    sink.push(Event::TouchEnd { slot: report, seat_slot });
                    announced = true;
                }
                let (x, y) = (slot.x, slot.y);
                *slot = Slot {
                    lifecycle: Lifecycle::Begin,
                    x,
                    y,
                    ..Slot::default()
                };
            }

            match slot.lifecycle {
                Lifecycle::None => {}
                Lifecycle::Begin => {
                    let suppressed = matches!(slot.palm, PalmState::New | PalmState::IsPalm | PalmState::WasPalm)
                        || !arbitration.touch_allowed(Point { x: slot.x, y: slot.y }, now);
                    if suppressed {
                        if matches!(slot.palm, PalmState::New) {
                            slot.palm = PalmState::IsPalm;
                        } else if slot.palm == PalmState::None {
                            // Vetoed by the pen: invisible for its lifetime.
                            slot.palm = PalmState::IsPalm;
                        }
                        slot.lifecycle = Lifecycle::Update;
                        slot.dirty = false;
                    } else if let Some(seat_slot) = seat.allocate() {
                        slot.seat_slot = Some(seat_slot);
                        slot.ref_x = slot.x;
                        slot.ref_y = slot.y;
                        slot.dirty = false;
                        slot.lifecycle = Lifecycle::Update;
                        sink.push(Event::TouchBegin {
                            slot: report,
                            seat_slot,
                            x: slot.x,
                            y: slot.y,
                        });
                        announced = true;
                    } else {
                        warn!("touch: seat slots exhausted, suppressing contact");
                        slot.palm = PalmState::IsPalm;
                        slot.lifecycle = Lifecycle::Update;
                    }
                    if slot.pending_end {
                        slot.pending_end = false;
                        slot.lifecycle = Lifecycle::End;
                    } else {
                        continue;
                    }
                }
                Lifecycle::Update => {}
                Lifecycle::End => {}
            }

            match slot.lifecycle {
                Lifecycle::Update => {
                    if slot.palm_cancel {
                        slot.palm_cancel = false;
                        if let Some(seat_slot) = slot.seat_slot.take() {
                            seat.release(seat_slot);
                            sink.push(Event::TouchCancel { slot: report, seat_slot });
                            announced = true;
                        }
                        slot.dirty = false;
                    } else if slot.dirty {
                        slot.dirty = false;
                        if slot.palm == PalmState::None
                            && let Some(seat_slot) = slot.seat_slot
                        {
                            let dx = slot.x - slot.ref_x;
                            let dy = slot.y - slot.ref_y;
                            if dx.abs() > margin_x || dy.abs() > margin_y {
                                slot.ref_x = slot.x;
                                slot.ref_y = slot.y;
                                sink.push(Event::TouchUpdate {
                                    slot: report,
                                    seat_slot,
                                    x: slot.x,
                                    y: slot.y,
                                });
                                announced = true;
                            }
                        }
                    }
                }
                Lifecycle::End => {
                    if let Some(seat_slot) = slot.seat_slot.take() {
                        seat.release(seat_slot);
                        sink.push(Event::TouchEnd { slot: report, seat_slot });
                        announced = true;
                    }
                    // Palm history dies with the contact.
                    *slot = Slot::default();
                }
                _ => {}
            }
        }

        if announced {
            sink.push(Event::TouchFrame);
        }
    }

    /// Cancel every live contact, e.g. on suspend.
    pub fn force_cancel_all(&mut self, seat: &mut SeatSlots, sink: &mut impl EventSink) {
        self.force_cancel(seat, sink, |_| true);
        self.fallback_down = false;
    }

    /// Cancel live contacts inside `rect`, for pen arbitration.
    pub fn force_cancel_in_rect(&mut self, rect: Rect, seat: &mut SeatSlots, sink: &mut impl EventSink) {
        self.force_cancel(seat, sink, |slot| {
            rect.contains(Point { x: slot.x, y: slot.y })
        });
    }

    fn force_cancel(
        &mut self,
        seat: &mut SeatSlots,
        sink: &mut impl EventSink,
        mut wanted: impl FnMut(&Slot) -> bool,
    ) {
        let mut announced = false;
        for idx in 0..MAX_TOUCH_SLOTS {
            let report = self.report_index(idx);
            let slot = &mut self.slots[idx];
            if !matches!(slot.lifecycle, Lifecycle::Begin | Lifecycle::Update | Lifecycle::End) {
                continue;
            }
            if !wanted(slot) {
                continue;
            }
            if let Some(seat_slot) = slot.seat_slot.take() {
                seat.release(seat_slot);
                sink.push(Event::TouchCancel { slot: report, seat_slot });
                announced = true;
            }
            // The kernel still considers the contact live; keep tracking it
            // silently until its real end arrives.
            slot.lifecycle = Lifecycle::Update;
            slot.palm = PalmState::IsPalm;
            slot.pending_end = false;
            slot.pending_restart = false;
            slot.palm_cancel = false;
            slot.dirty = false;
        }
        if announced {
            sink.push(Event::TouchFrame);
        }
    }

    /// Any contact the device currently considers live.
    pub fn any_active(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| !matches!(slot.lifecycle, Lifecycle::None))
    }
}

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use super::*;
    use crate::config::AxisRange;

    type Sink = Vec<Event, 32>;

    fn ms(v: u64) -> Instant {
        Instant::from_millis(v)
    }

    fn config() -> TouchConfig {
        TouchConfig::new(
            AxisRange::new(0, 4096).with_fuzz(8),
            AxisRange::new(0, 4096).with_fuzz(8),
        )
    }

    fn idle_arbitration() -> TouchArbitration {
        TouchArbitration::new()
    }

    fn begin(tracker: &mut TouchTracker, slot: i32, id: i32, x: i32, y: i32) {
        tracker.on_abs(AbsAxis::MtSlot, slot);
        tracker.on_abs(AbsAxis::MtTrackingId, id);
        tracker.on_abs(AbsAxis::MtPositionX, x);
        tracker.on_abs(AbsAxis::MtPositionY, y);
    }

    fn end(tracker: &mut TouchTracker, slot: i32) {
        tracker.on_abs(AbsAxis::MtSlot, slot);
        tracker.on_abs(AbsAxis::MtTrackingId, -1);
    }

    #[test]
    fn contact_lifecycle_with_seat_slot_reuse() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[
                Event::TouchBegin { slot: 0, seat_slot: 0, x: 500, y: 600 },
                Event::TouchFrame
            ]
        );
        sink.clear();

        end(&mut tracker, 0);
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[Event::TouchEnd { slot: 0, seat_slot: 0 }, Event::TouchFrame]
        );
        sink.clear();

        // Freed seat slot is handed out again.
        begin(&mut tracker, 1, 101, 10, 20);
        tracker.flush(&arb, ms(20), &mut seat, &mut sink);
        assert_eq!(
            sink[0],
            Event::TouchBegin { slot: 1, seat_slot: 0, x: 10, y: 20 }
        );
    }

    #[test]
    fn lift_and_retouch_in_one_frame_closes_the_old_contact() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        sink.clear();

        // The finger lifts and lands again before the frame closes.
        end(&mut tracker, 0);
        begin(&mut tracker, 0, 101, 510, 610);
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[
                Event::TouchEnd { slot: 0, seat_slot: 0 },
                Event::TouchBegin { slot: 0, seat_slot: 0, x: 510, y: 610 },
                Event::TouchFrame
            ]
        );
        sink.clear();

        // The restarted contact ends cleanly and its seat slot is not
        // leaked: the next contact gets the lowest slot again.
        end(&mut tracker, 0);
        tracker.flush(&arb, ms(20), &mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[Event::TouchEnd { slot: 0, seat_slot: 0 }, Event::TouchFrame]
        );
        assert_eq!(seat.allocate(), Some(0));
    }

    #[test]
    fn begin_and_end_in_one_frame_both_announced() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        end(&mut tracker, 0);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);

        assert_eq!(
            &sink[..],
            &[
                Event::TouchBegin { slot: 0, seat_slot: 0, x: 500, y: 600 },
                Event::TouchEnd { slot: 0, seat_slot: 0 },
                Event::TouchFrame
            ]
        );
    }

    #[test]
    fn palm_classified_before_begin_is_never_announced() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.on_abs(AbsAxis::MtToolType, MT_TOOL_PALM);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        assert!(sink.is_empty());

        // Reclassified as a finger: still invisible for this contact.
        tracker.on_abs(AbsAxis::MtSlot, 0);
        tracker.on_abs(AbsAxis::MtToolType, 0);
        tracker.on_abs(AbsAxis::MtPositionX, 700);
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);
        assert!(sink.is_empty());

        end(&mut tracker, 0);
        tracker.flush(&arb, ms(20), &mut seat, &mut sink);
        assert!(sink.is_empty());

        // A fresh contact on the same slot starts clean.
        begin(&mut tracker, 0, 101, 100, 100);
        tracker.flush(&arb, ms(30), &mut seat, &mut sink);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn palm_reclassification_mid_life_cancels() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        sink.clear();

        tracker.on_abs(AbsAxis::MtSlot, 0);
        tracker.on_abs(AbsAxis::MtToolType, MT_TOOL_PALM);
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);

        assert_eq!(
            &sink[..],
            &[Event::TouchCancel { slot: 0, seat_slot: 0 }, Event::TouchFrame]
        );
        assert_eq!(seat.allocate(), Some(0));
    }

    #[test]
    fn hysteresis_swallows_jitter() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        sink.clear();

        // Margin is fuzz/2 = 4: a 3-unit wiggle is noise.
        tracker.on_abs(AbsAxis::MtSlot, 0);
        tracker.on_abs(AbsAxis::MtPositionX, 503);
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);
        assert!(sink.is_empty());

        // Past the margin: reported, and the reference moves with it.
        tracker.on_abs(AbsAxis::MtPositionX, 505);
        tracker.flush(&arb, ms(20), &mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[
                Event::TouchUpdate { slot: 0, seat_slot: 0, x: 505, y: 600 },
                Event::TouchFrame
            ]
        );
    }

    #[test]
    fn quiet_frame_emits_no_touch_frame() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        sink.clear();

        // No slot changed: no TouchFrame either.
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn force_cancel_keeps_tracking_silently() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        begin(&mut tracker, 0, 100, 500, 600);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        sink.clear();

        tracker.force_cancel_all(&mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[Event::TouchCancel { slot: 0, seat_slot: 0 }, Event::TouchFrame]
        );
        sink.clear();

        // Later motion on the cancelled contact stays invisible.
        tracker.on_abs(AbsAxis::MtSlot, 0);
        tracker.on_abs(AbsAxis::MtPositionX, 900);
        tracker.flush(&arb, ms(50), &mut seat, &mut sink);
        assert!(sink.is_empty());

        end(&mut tracker, 0);
        tracker.flush(&arb, ms(60), &mut seat, &mut sink);
        assert!(sink.is_empty());
        assert!(!tracker.any_active());
    }

    #[test]
    fn single_touch_fallback_reports_slot_minus_one() {
        let mut tracker = TouchTracker::new(TouchConfig {
            mt: false,
            ..config()
        });
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        tracker.on_abs(AbsAxis::X, 300);
        tracker.on_abs(AbsAxis::Y, 400);
        tracker.on_touch_button(true);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);
        assert_eq!(
            sink[0],
            Event::TouchBegin { slot: -1, seat_slot: 0, x: 300, y: 400 }
        );
        sink.clear();

        tracker.on_touch_button(false);
        tracker.flush(&arb, ms(10), &mut seat, &mut sink);
        assert_eq!(
            &sink[..],
            &[Event::TouchEnd { slot: -1, seat_slot: 0 }, Event::TouchFrame]
        );
    }

    #[test]
    fn two_contacts_flush_in_slot_order() {
        let mut tracker = TouchTracker::new(config());
        let mut seat = SeatSlots::new();
        let arb = idle_arbitration();
        let mut sink = Sink::new();

        // Device addresses slot 1 before slot 0 within the frame.
        begin(&mut tracker, 1, 101, 10, 10);
        begin(&mut tracker, 0, 100, 20, 20);
        tracker.flush(&arb, ms(0), &mut seat, &mut sink);

        assert_eq!(
            &sink[..],
            &[
                Event::TouchBegin { slot: 0, seat_slot: 0, x: 20, y: 20 },
                Event::TouchBegin { slot: 1, seat_slot: 1, x: 10, y: 10 },
                Event::TouchFrame
            ]
        );
    }
}
