//! Per-device frame dispatch.
//!
//! One [`DeviceContext`] per evdev node. The transport layer feeds it raw
//! samples; on the sync marker the buffered frame is routed to the engines
//! the device's capabilities enable, and each engine flushes into the
//! caller's sink. Between frames the embedding arms one real timer for
//! [`DeviceContext::next_timeout`] and calls
//! [`DeviceContext::dispatch_timers`] when it fires; all engine time comes
//! in through these two paths, never from a clock.
//!
//! State that outlives one device (seat contact slots, tool calibration)
//! lives in [`SharedState`], one per seat, borrowed by every context.

use core::cell::RefCell;

use embassy_time::Instant;
use evnorm_types::axis::{AbsAxis, RelAxis};
use evnorm_types::button::ButtonCode;
use evnorm_types::geometry::Rect;
use heapless::Vec;

use crate::MAX_BUTTONS_PER_FRAME;
use crate::arbitration::{ArbitrationMode, TouchArbitration};
use crate::config::DeviceConfig;
use crate::debounce::DebounceEngine;
use crate::event::{Event, EventSink, RawEvent};
use crate::frame::FrameAccumulator;
use crate::tablet::TabletEngine;
use crate::tablet::tool::ToolRegistry;
use crate::timer::earliest;
use crate::touch::{SeatSlots, TouchTracker};
use crate::wheel::WheelEngine;

/// Seat-wide state shared by all device contexts of one seat.
#[derive(Default)]
pub struct SharedState {
    pub seat_slots: RefCell<SeatSlots>,
    pub tools: RefCell<ToolRegistry>,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            seat_slots: RefCell::new(SeatSlots::new()),
            tools: RefCell::new(ToolRegistry::new()),
        }
    }
}

pub struct DeviceContext<'a> {
    device_id: u32,
    config: DeviceConfig,
    shared: &'a SharedState,
    frame: FrameAccumulator,
    debounce: Option<DebounceEngine>,
    wheel: Option<WheelEngine>,
    touch: Option<TouchTracker>,
    tablet: Option<TabletEngine<'a>>,
    arbitration: TouchArbitration,
    suspended: bool,
}

impl<'a> DeviceContext<'a> {
    pub fn new(device_id: u32, config: DeviceConfig, shared: &'a SharedState) -> Self {
        Self {
            device_id,
            config,
            shared,
            frame: FrameAccumulator::new(),
            debounce: config
                .buttons
                .then(|| DebounceEngine::new(config.quirks.debounce_disabled)),
            wheel: config.wheel.map(WheelEngine::new),
            touch: config.touch.map(TouchTracker::new),
            tablet: config
                .tablet
                .map(|cfg| TabletEngine::new(device_id, cfg, &shared.tools)),
            arbitration: TouchArbitration::new(),
            suspended: false,
        }
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Feed one raw sample. [`RawEvent::Sync`] closes the frame and runs it
    /// through the engines; everything else is buffered.
    pub fn push(&mut self, sample: RawEvent, time: Instant, sink: &mut impl EventSink) {
        if self.suspended {
            return;
        }
        match sample {
            RawEvent::Sync => self.process_frame(time, sink),
            other => self.frame.push(other),
        }
    }

    fn process_frame(&mut self, time: Instant, sink: &mut impl EventSink) {
        let samples = self.frame.take();
        let mut button_edges: Vec<(ButtonCode, bool), MAX_BUTTONS_PER_FRAME> = Vec::new();

        for sample in &samples {
            match *sample {
                RawEvent::Button { code, pressed } => self.route_button(code, pressed, &mut button_edges),
                RawEvent::Rel { axis, value } => self.route_rel(axis, value),
                RawEvent::Abs { axis, value } => self.route_abs(axis, value),
                RawEvent::Tool { tool, present } => {
                    if let Some(tablet) = &mut self.tablet {
                        tablet.on_tool(tool, present);
                    }
                }
                RawEvent::ToolSerial(serial) => {
                    if let Some(tablet) = &mut self.tablet {
                        tablet.on_serial(serial);
                    }
                }
                RawEvent::Sync => {}
            }
        }

        if let Some(debounce) = &mut self.debounce {
            debounce.handle_frame(&button_edges, time, sink);
        } else {
            for &(code, pressed) in &button_edges {
                sink.push(Event::Button { code, pressed });
            }
        }
        if let Some(wheel) = &mut self.wheel {
            wheel.flush(time, sink);
        }
        if let Some(touch) = &mut self.touch {
            let mut seat = self.shared.seat_slots.borrow_mut();
            touch.flush(&self.arbitration, time, &mut seat, sink);
        }
        if let Some(tablet) = &mut self.tablet {
            tablet.flush(time, self.config.quirks.slow_proximity_watchdog, sink);
        }
        self.update_arbitration(time, sink);
    }

    fn route_button(
        &mut self,
        code: ButtonCode,
        pressed: bool,
        edges: &mut Vec<(ButtonCode, bool), MAX_BUTTONS_PER_FRAME>,
    ) {
        if code == ButtonCode::TOUCH {
            // Tip switch on tablets, contact switch on single-touch
            // devices; never a user-visible button.
            if let Some(tablet) = &mut self.tablet {
                tablet.on_button(code, pressed);
            } else if let Some(touch) = &mut self.touch {
                touch.on_touch_button(pressed);
            }
            return;
        }
        if code.is_stylus_button()
            && let Some(tablet) = &mut self.tablet
        {
            tablet.on_button(code, pressed);
            return;
        }
        if edges.push((code, pressed)).is_err() {
            error!("button edges past {} in one frame, dropped", MAX_BUTTONS_PER_FRAME);
        }
    }

    fn route_rel(&mut self, axis: RelAxis, value: i32) {
        let consumed = match &mut self.wheel {
            Some(wheel) => wheel.on_rel(axis, value),
            None => false,
        };
        if !consumed {
            debug!("unhandled rel axis {:?}", axis);
        }
    }

    fn route_abs(&mut self, axis: AbsAxis, value: i32) {
        // A combined pen-and-touch node gives the plain X/Y axes to the
        // pen; contacts use the multitouch axes.
        if let Some(tablet) = &mut self.tablet
            && tablet.on_abs(axis, value)
        {
            return;
        }
        if let Some(touch) = &mut self.touch
            && touch.on_abs(axis, value)
        {
            return;
        }
        debug!("unhandled abs axis {:?}", axis);
    }

    fn update_arbitration(&mut self, time: Instant, sink: &mut impl EventSink) {
        let Some(tablet) = &self.tablet else {
            return;
        };
        let (mode, rect) = tablet.arbitration();
        self.apply_arbitration(mode, rect, time, sink);
    }

    /// What this device's pen asks a paired touch device to do about
    /// contacts right now. [`ArbitrationMode::NotActive`] on devices
    /// without a tablet engine.
    pub fn arbitration_request(&self) -> (ArbitrationMode, Option<Rect>) {
        match &self.tablet {
            Some(tablet) => tablet.arbitration(),
            None => (ArbitrationMode::NotActive, None),
        }
    }

    /// Drive this device's touch gate from a paired pen device. The
    /// embedding forwards the pen context's [`Self::arbitration_request`]
    /// after each of the pen's frames (or sets
    /// [`ArbitrationMode::IgnoreAll`] on its own policy).
    pub fn set_arbitration(
        &mut self,
        mode: ArbitrationMode,
        rect: Option<Rect>,
        now: Instant,
        sink: &mut impl EventSink,
    ) {
        self.apply_arbitration(mode, rect, now, sink);
    }

    fn apply_arbitration(
        &mut self,
        mode: ArbitrationMode,
        rect: Option<Rect>,
        time: Instant,
        sink: &mut impl EventSink,
    ) {
        let engaging = mode != ArbitrationMode::NotActive && mode != self.arbitration.mode();
        self.arbitration.set_mode(mode, rect, time);
        if !engaging {
            return;
        }
        // Contacts already live when the pen arrives are the resting hand.
        if let Some(touch) = &mut self.touch {
            let mut seat = self.shared.seat_slots.borrow_mut();
            match (mode, rect) {
                (ArbitrationMode::IgnoreAll, _) => touch.force_cancel_all(&mut seat, sink),
                (ArbitrationMode::IgnoreRect, Some(rect)) => {
                    touch.force_cancel_in_rect(rect, &mut seat, sink)
                }
                _ => {}
            }
        }
    }

    /// Earliest pending engine deadline, if any.
    pub fn next_timeout(&self) -> Option<Instant> {
        let mut deadline = None;
        if let Some(debounce) = &self.debounce {
            deadline = earliest(deadline, debounce.next_timeout());
        }
        if let Some(wheel) = &self.wheel {
            deadline = earliest(deadline, wheel.next_timeout());
        }
        if let Some(tablet) = &self.tablet {
            deadline = earliest(deadline, tablet.next_timeout());
        }
        deadline
    }

    /// Deliver expired deadlines to the engines.
    pub fn dispatch_timers(&mut self, now: Instant, sink: &mut impl EventSink) {
        if self.suspended {
            return;
        }
        if let Some(debounce) = &mut self.debounce {
            debounce.dispatch_timers(now, sink);
        }
        if let Some(wheel) = &mut self.wheel {
            wheel.dispatch_timers(now);
        }
        if let Some(tablet) = &mut self.tablet {
            tablet.dispatch_timers(now, sink);
        }
        self.update_arbitration(now, sink);
    }

    /// Neutralize everything: release held buttons, cancel live contacts,
    /// drop the tool. Used on suspend and device removal so downstream
    /// never sees a press without its release.
    pub fn suspend(&mut self, sink: &mut impl EventSink) {
        if self.suspended {
            return;
        }
        self.frame.clear();
        if let Some(debounce) = &mut self.debounce {
            debounce.force_release(sink);
        }
        if let Some(wheel) = &mut self.wheel {
            wheel.reset();
        }
        if let Some(touch) = &mut self.touch {
            let mut seat = self.shared.seat_slots.borrow_mut();
            touch.force_cancel_all(&mut seat, sink);
        }
        if let Some(tablet) = &mut self.tablet {
            tablet.force_out(sink);
        }
        self.arbitration = TouchArbitration::new();
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Detach the device. Identical to [`Self::suspend`] in what it emits;
    /// tool records stay in the seat registry for the process lifetime.
    pub fn remove(&mut self, sink: &mut impl EventSink) {
        self.suspend(sink);
    }
}

#[cfg(test)]
mod tests {
    use embassy_time::Instant;
    use evnorm_types::axis::ScrollAxis;
    use evnorm_types::tool::ToolType;
    use heapless::Vec as HVec;

    use super::*;
    use crate::config::{AxisRange, TabletConfig, TouchConfig};

    type Sink = HVec<Event, 32>;

    fn ms(v: u64) -> Instant {
        Instant::from_millis(v)
    }

    fn feed(ctx: &mut DeviceContext<'_>, samples: &[RawEvent], time: Instant, sink: &mut Sink) {
        for &sample in samples {
            ctx.push(sample, time, sink);
        }
        ctx.push(RawEvent::Sync, time, sink);
    }

    #[test]
    fn empty_frame_emits_nothing() {
        let shared = SharedState::new();
        let mut ctx = DeviceContext::new(1, DeviceConfig::pointer(), &shared);
        let mut sink = Sink::new();

        ctx.push(RawEvent::Sync, ms(0), &mut sink);
        assert!(sink.is_empty());
        assert_eq!(ctx.next_timeout(), None);
    }

    #[test]
    fn pointer_click_and_scroll() {
        let shared = SharedState::new();
        let mut ctx = DeviceContext::new(1, DeviceConfig::pointer(), &shared);
        let mut sink = Sink::new();

        feed(
            &mut ctx,
            &[RawEvent::Button { code: ButtonCode::LEFT, pressed: true }],
            ms(0),
            &mut sink,
        );
        assert_eq!(
            &sink[..],
            &[Event::Button { code: ButtonCode::LEFT, pressed: true }]
        );
        assert_eq!(ctx.next_timeout(), Some(ms(25)));
        sink.clear();

        feed(
            &mut ctx,
            &[RawEvent::Rel { axis: RelAxis::WheelHiRes, value: 120 }],
            ms(5),
            &mut sink,
        );
        assert!(matches!(
            sink[0],
            Event::Scroll { axis: ScrollAxis::Vertical, v120: 120, .. }
        ));
    }

    #[test]
    fn touchscreen_frame_is_grouped() {
        let shared = SharedState::new();
        let config = DeviceConfig::touchscreen(AxisRange::new(0, 4096), AxisRange::new(0, 4096));
        let mut ctx = DeviceContext::new(1, config, &shared);
        let mut sink = Sink::new();

        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 7 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 100 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 200 },
            ],
            ms(0),
            &mut sink,
        );
        assert_eq!(
            &sink[..],
            &[
                Event::TouchBegin { slot: 0, seat_slot: 0, x: 100, y: 200 },
                Event::TouchFrame
            ]
        );
    }

    #[test]
    fn seat_slots_are_shared_between_devices() {
        let shared = SharedState::new();
        let config = DeviceConfig::touchscreen(AxisRange::new(0, 4096), AxisRange::new(0, 4096));
        let mut a = DeviceContext::new(1, config, &shared);
        let mut b = DeviceContext::new(2, config, &shared);
        let mut sink = Sink::new();

        feed(
            &mut a,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 1 },
            ],
            ms(0),
            &mut sink,
        );
        sink.clear();
        feed(
            &mut b,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 2 },
            ],
            ms(1),
            &mut sink,
        );
        // Device b's contact gets the next seat slot, not slot 0 again.
        assert_eq!(
            sink[0],
            Event::TouchBegin { slot: 0, seat_slot: 1, x: 2, y: 2 }
        );
    }

    fn pen_touch_config() -> DeviceConfig {
        DeviceConfig {
            touch: Some(TouchConfig::new(
                AxisRange::new(0, 10000),
                AxisRange::new(0, 10000),
            )),
            tablet: Some(TabletConfig {
                pressure: Some(AxisRange::new(0, 1000)),
                smoothing: false,
                ..TabletConfig::new(AxisRange::new(0, 10000), AxisRange::new(0, 10000))
            }),
            ..DeviceConfig::default()
        }
    }

    #[test]
    fn pen_proximity_cancels_nearby_touches() {
        let shared = SharedState::new();
        let mut ctx = DeviceContext::new(1, pen_touch_config(), &shared);
        let mut sink = Sink::new();

        // A finger lands first.
        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 5000 },
            ],
            ms(0),
            &mut sink,
        );
        sink.clear();

        // The pen arrives at the same spot: the contact is cancelled.
        feed(
            &mut ctx,
            &[
                RawEvent::Tool { tool: ToolType::Pen, present: true },
                RawEvent::Abs { axis: AbsAxis::X, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::Y, value: 5000 },
            ],
            ms(10),
            &mut sink,
        );
        assert!(sink.contains(&Event::TouchCancel { slot: 0, seat_slot: 0 }));

        sink.clear();
        // New touches near the pen are vetoed outright.
        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 5100 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 5100 },
            ],
            ms(20),
            &mut sink,
        );
        assert!(!sink.iter().any(|e| matches!(e, Event::TouchBegin { .. })));
    }

    #[test]
    fn touches_resume_after_pen_leaves_and_grace_expires() {
        let shared = SharedState::new();
        let mut ctx = DeviceContext::new(1, pen_touch_config(), &shared);
        let mut sink = Sink::new();

        feed(
            &mut ctx,
            &[
                RawEvent::Tool { tool: ToolType::Pen, present: true },
                RawEvent::Abs { axis: AbsAxis::X, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::Y, value: 5000 },
            ],
            ms(0),
            &mut sink,
        );
        feed(
            &mut ctx,
            &[RawEvent::Tool { tool: ToolType::Pen, present: false }],
            ms(100),
            &mut sink,
        );
        sink.clear();

        // Inside the grace period the hand is still suspect.
        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 5000 },
            ],
            ms(150),
            &mut sink,
        );
        assert!(sink.is_empty());

        // A fresh contact after the grace period flows normally.
        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 1000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 1000 },
            ],
            ms(200),
            &mut sink,
        );
        assert!(sink.iter().any(|e| matches!(e, Event::TouchBegin { .. })));
    }

    #[test]
    fn paired_pen_device_suppresses_separate_touch_device() {
        let shared = SharedState::new();
        let tablet_cfg = DeviceConfig::tablet(TabletConfig {
            smoothing: false,
            ..TabletConfig::new(AxisRange::new(0, 10000), AxisRange::new(0, 10000))
        });
        let mut pen = DeviceContext::new(1, tablet_cfg, &shared);
        let touch_cfg =
            DeviceConfig::touchscreen(AxisRange::new(0, 10000), AxisRange::new(0, 10000));
        let mut touch = DeviceContext::new(2, touch_cfg, &shared);
        let mut sink = Sink::new();

        // A finger is already down on the touch device.
        feed(
            &mut touch,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 5000 },
            ],
            ms(0),
            &mut sink,
        );
        sink.clear();

        // The pen appears on the paired tablet; the embedding forwards its
        // arbitration request to the touch device.
        feed(
            &mut pen,
            &[
                RawEvent::Tool { tool: ToolType::Pen, present: true },
                RawEvent::Abs { axis: AbsAxis::X, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::Y, value: 5000 },
            ],
            ms(10),
            &mut sink,
        );
        let (mode, rect) = pen.arbitration_request();
        assert_eq!(mode, ArbitrationMode::IgnoreRect);
        sink.clear();
        touch.set_arbitration(mode, rect, ms(10), &mut sink);
        assert!(sink.contains(&Event::TouchCancel { slot: 0, seat_slot: 0 }));
        sink.clear();

        // New contacts near the pen are vetoed on the touch device.
        feed(
            &mut touch,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 5100 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 5100 },
            ],
            ms(20),
            &mut sink,
        );
        assert!(sink.is_empty());

        // Pen leaves; the forwarded deactivation starts the grace period.
        feed(
            &mut pen,
            &[RawEvent::Tool { tool: ToolType::Pen, present: false }],
            ms(100),
            &mut sink,
        );
        let (mode, rect) = pen.arbitration_request();
        assert_eq!(mode, ArbitrationMode::NotActive);
        touch.set_arbitration(mode, rect, ms(100), &mut sink);
        sink.clear();

        feed(
            &mut touch,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 3 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 5000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 5000 },
            ],
            ms(150),
            &mut sink,
        );
        assert!(sink.is_empty());

        feed(
            &mut touch,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 3 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 4 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 1000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 1000 },
            ],
            ms(200),
            &mut sink,
        );
        assert!(sink.iter().any(|e| matches!(e, Event::TouchBegin { .. })));
    }

    #[test]
    fn ignore_all_gate_blocks_every_touch() {
        let shared = SharedState::new();
        let config = DeviceConfig::touchscreen(AxisRange::new(0, 4096), AxisRange::new(0, 4096));
        let mut ctx = DeviceContext::new(1, config, &shared);
        let mut sink = Sink::new();

        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 100 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 100 },
            ],
            ms(0),
            &mut sink,
        );
        sink.clear();

        ctx.set_arbitration(ArbitrationMode::IgnoreAll, None, ms(10), &mut sink);
        assert!(sink.contains(&Event::TouchCancel { slot: 0, seat_slot: 0 }));
        sink.clear();

        // Far away from anything: still vetoed.
        feed(
            &mut ctx,
            &[
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 2 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 4000 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 4000 },
            ],
            ms(20),
            &mut sink,
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn suspend_releases_everything_held() {
        let shared = SharedState::new();
        let config = DeviceConfig {
            buttons: true,
            touch: Some(TouchConfig::new(
                AxisRange::new(0, 4096),
                AxisRange::new(0, 4096),
            )),
            ..DeviceConfig::default()
        };
        let mut ctx = DeviceContext::new(1, config, &shared);
        let mut sink = Sink::new();

        feed(
            &mut ctx,
            &[
                RawEvent::Button { code: ButtonCode::LEFT, pressed: true },
                RawEvent::Abs { axis: AbsAxis::MtSlot, value: 0 },
                RawEvent::Abs { axis: AbsAxis::MtTrackingId, value: 1 },
                RawEvent::Abs { axis: AbsAxis::MtPositionX, value: 10 },
                RawEvent::Abs { axis: AbsAxis::MtPositionY, value: 10 },
            ],
            ms(0),
            &mut sink,
        );
        sink.clear();

        ctx.suspend(&mut sink);
        assert!(sink.contains(&Event::Button { code: ButtonCode::LEFT, pressed: false }));
        assert!(sink.contains(&Event::TouchCancel { slot: 0, seat_slot: 0 }));
        assert_eq!(ctx.next_timeout(), None);

        // Suspended devices drop their input.
        sink.clear();
        feed(
            &mut ctx,
            &[RawEvent::Button { code: ButtonCode::LEFT, pressed: true }],
            ms(50),
            &mut sink,
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn tip_switch_drives_single_touch_contact() {
        let shared = SharedState::new();
        let config = DeviceConfig {
            touch: Some(TouchConfig {
                mt: false,
                ..TouchConfig::new(AxisRange::new(0, 4096), AxisRange::new(0, 4096))
            }),
            ..DeviceConfig::default()
        };
        let mut ctx = DeviceContext::new(1, config, &shared);
        let mut sink = Sink::new();

        feed(
            &mut ctx,
            &[
                RawEvent::Button { code: ButtonCode::TOUCH, pressed: true },
                RawEvent::Abs { axis: AbsAxis::X, value: 33 },
                RawEvent::Abs { axis: AbsAxis::Y, value: 44 },
            ],
            ms(0),
            &mut sink,
        );
        assert_eq!(
            &sink[..],
            &[
                Event::TouchBegin { slot: -1, seat_slot: 0, x: 33, y: 44 },
                Event::TouchFrame
            ]
        );
    }
}
