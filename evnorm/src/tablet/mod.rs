//! Tablet tool normalization.
//!
//! A tablet frame is a bag of independent facts (tool presence, axis
//! values, button edges, tip pressure); consumers need them resolved into
//! an ordered story: proximity-in first, then tip-down, then axis motion,
//! then buttons, tip-up, proximity-out last. The engine collects the
//! frame's facts as they arrive and tells the story at flush.
//!
//! Pressure is reported relative to the tool's learned zero offset (see
//! [`tool`]) and the tip contact decision uses an hysteresis band above
//! that offset so a worn pen neither sticks in contact nor chatters.
//!
//! Some tablets stop reporting instead of sending a proximity-out when the
//! pen leaves slowly. A watchdog forces the proximity-out after a silence;
//! if the device then resumes reporting, proximity-in is re-synthesized so
//! downstream always sees balanced pairs.

pub mod tool;

use core::cell::RefCell;

use embassy_time::Instant;
use evnorm_types::axis::AbsAxis;
use evnorm_types::button::ButtonCode;
use evnorm_types::geometry::{Point, Rect};
use evnorm_types::tool::{ToolId, ToolType};
use heapless::Vec;

use crate::arbitration::ArbitrationMode;
use crate::config::TabletConfig;
use crate::error::Violation;
use crate::event::{ChangedAxes, Event, EventSink, ToolAxisValues};
use crate::timer::OneShot;
use crate::{MAX_BUTTONS_PER_FRAME, PROXIMITY_OUT_TIMEOUT, PROXIMITY_OUT_TIMEOUT_SLOW};

use tool::{ToolCapabilities, ToolHandle, ToolRegistry};

/// Tip-down threshold above the pressure offset, in per-mille of the range.
const TIP_DOWN_PERMILLE: i32 = 50;
/// Tip-up threshold above the pressure offset, in per-mille of the range.
const TIP_UP_PERMILLE: i32 = 10;
/// Positions are averaged over this many samples.
const SMOOTHING_WINDOW: usize = 4;
/// Margin of the touch-veto rectangle, in per-mille of each axis range.
const ARBITRATION_MARGIN_PERMILLE: i32 = 50;

#[derive(Clone, Copy, Debug, Default)]
struct RawAxes {
    x: i32,
    y: i32,
    pressure: i32,
    distance: i32,
    tilt_x: i32,
    tilt_y: i32,
}

#[derive(Default)]
struct Smoother {
    window: [(i32, i32); SMOOTHING_WINDOW],
    len: usize,
    next: usize,
}

impl Smoother {
    fn reset(&mut self) {
        self.len = 0;
        self.next = 0;
    }

    fn push(&mut self, x: i32, y: i32) -> (f32, f32) {
        self.window[self.next] = (x, y);
        self.next = (self.next + 1) % SMOOTHING_WINDOW;
        self.len = (self.len + 1).min(SMOOTHING_WINDOW);
        let (sx, sy) = self.window[..self.len]
            .iter()
            .fold((0i64, 0i64), |(sx, sy), &(x, y)| (sx + x as i64, sy + y as i64));
        (sx as f32 / self.len as f32, sy as f32 / self.len as f32)
    }
}

pub struct TabletEngine<'a> {
    device_id: u32,
    config: TabletConfig,
    registry: &'a RefCell<ToolRegistry>,

    in_proximity: bool,
    tip_down: bool,
    tool: Option<(ToolHandle, ToolId)>,
    axes: RawAxes,
    smoother: Smoother,

    // Facts collected for the frame in flight.
    prox_in_pending: Option<ToolType>,
    prox_out_pending: bool,
    serial_pending: Option<u32>,
    tip_button_pending: Option<bool>,
    changed: ChangedAxes,
    buttons: Vec<(ButtonCode, bool), MAX_BUTTONS_PER_FRAME>,

    watchdog: OneShot,
    /// Proximity was forced out by the watchdog and not yet resolved.
    forced_out: bool,
    /// Device has proven it sends real proximity-outs.
    sends_prox_out: bool,
    /// Identity of the most recent tool, to reattach after a forced out.
    last_tool: Option<ToolId>,
}

impl<'a> TabletEngine<'a> {
    pub fn new(device_id: u32, config: TabletConfig, registry: &'a RefCell<ToolRegistry>) -> Self {
        Self {
            device_id,
            config,
            registry,
            in_proximity: false,
            tip_down: false,
            tool: None,
            axes: RawAxes::default(),
            smoother: Smoother::default(),
            prox_in_pending: None,
            prox_out_pending: false,
            serial_pending: None,
            tip_button_pending: None,
            changed: ChangedAxes::default(),
            buttons: Vec::new(),
            watchdog: OneShot::new(),
            forced_out: false,
            sends_prox_out: false,
            last_tool: None,
        }
    }

    pub fn in_proximity(&self) -> bool {
        self.in_proximity
    }

    /// Tool presence edge from the device.
    pub fn on_tool(&mut self, tool_type: ToolType, present: bool) {
        if present {
            self.prox_in_pending = Some(tool_type);
        } else {
            self.prox_out_pending = true;
            self.sends_prox_out = true;
        }
    }

    pub fn on_serial(&mut self, serial: u32) {
        self.serial_pending = Some(serial);
    }

    /// Feed one absolute sample. Returns `true` if consumed.
    pub fn on_abs(&mut self, axis: AbsAxis, value: i32) -> bool {
        match axis {
            AbsAxis::X => {
                self.axes.x = value;
                self.changed.x = true;
            }
            AbsAxis::Y => {
                self.axes.y = value;
                self.changed.y = true;
            }
            AbsAxis::Pressure => {
                self.axes.pressure = value;
                self.changed.pressure = true;
            }
            AbsAxis::Distance => {
                self.axes.distance = value;
                self.changed.distance = true;
            }
            AbsAxis::TiltX => {
                self.axes.tilt_x = value;
                self.changed.tilt = true;
            }
            AbsAxis::TiltY => {
                self.axes.tilt_y = value;
                self.changed.tilt = true;
            }
            _ => return false,
        }
        true
    }

    /// Stylus button edge, or the tip switch on pressure-less tablets.
    pub fn on_button(&mut self, code: ButtonCode, pressed: bool) {
        if code == ButtonCode::TOUCH {
            // Tip switch; only authoritative without a pressure axis.
            if self.config.pressure.is_none() {
                self.tip_button_pending = Some(pressed);
            }
            return;
        }
        if self.buttons.push((code, pressed)).is_err() {
            error!("tablet: button edges past {} dropped", MAX_BUTTONS_PER_FRAME);
        }
    }

    fn watchdog_timeout(&self, slow: bool) -> embassy_time::Duration {
        if slow {
            PROXIMITY_OUT_TIMEOUT_SLOW
        } else {
            PROXIMITY_OUT_TIMEOUT
        }
    }

    fn frame_has_facts(&self) -> bool {
        self.changed.any() || self.tip_button_pending.is_some() || !self.buttons.is_empty()
    }

    fn clear_frame(&mut self) {
        self.prox_in_pending = None;
        self.prox_out_pending = false;
        self.serial_pending = None;
        self.tip_button_pending = None;
        self.changed.clear();
        self.buttons.clear();
    }

    /// Pressure above the axis minimum and the tool's learned offset.
    fn effective_pressure(&self, offset: i32) -> Option<i32> {
        let range = self.config.pressure?;
        Some(self.axes.pressure - range.minimum - offset)
    }

    fn axis_values(&mut self, offset: i32) -> ToolAxisValues {
        let (x, y) = if self.config.smoothing {
            self.smoother.push(self.axes.x, self.axes.y)
        } else {
            (self.axes.x as f32, self.axes.y as f32)
        };
        let pressure = match self.config.pressure {
            Some(range) => {
                let span = (range.range() - offset).max(1);
                let value = (self.axes.pressure - range.minimum - offset) as f32 / span as f32;
                value.clamp(0.0, 1.0)
            }
            None => 0.0,
        };
        let distance = match self.config.distance {
            Some(range) => {
                ((self.axes.distance - range.minimum) as f32 / range.range().max(1) as f32)
                    .clamp(0.0, 1.0)
            }
            None => 0.0,
        };
        let (tilt_x, tilt_y) = match self.config.tilt {
            Some(range) => {
                let half = (range.range() / 2).max(1) as f32;
                (
                    (self.axes.tilt_x - range.center()) as f32 / half * 64.0,
                    (self.axes.tilt_y - range.center()) as f32 / half * 64.0,
                )
            }
            None => (0.0, 0.0),
        };
        ToolAxisValues {
            x,
            y,
            pressure,
            distance,
            tilt_x,
            tilt_y,
        }
    }

    /// End-of-frame resolution, in fixed precedence order.
    pub fn flush(&mut self, now: Instant, slow_watchdog: bool, sink: &mut impl EventSink) {
        // Silent device resumed after a forced proximity-out: put the tool
        // back before interpreting its data.
        if !self.in_proximity && self.prox_in_pending.is_none() && self.frame_has_facts() {
            if self.forced_out && let Some(id) = self.last_tool {
                debug!("tablet: resuming after forced proximity-out");
                self.prox_in_pending = Some(id.tool_type);
                if id.serial != 0 {
                    self.serial_pending = Some(id.serial);
                }
            } else {
                warn!(
                    "tablet: data without a tool in proximity, dropped ({:?})",
                    Violation::ToolNotInProximity
                );
                self.clear_frame();
                return;
            }
        }

        // 1. Proximity in.
        if let Some(tool_type) = self.prox_in_pending.take() {
            if self.in_proximity {
                warn!(
                    "tablet: proximity-in while in proximity ({:?})",
                    Violation::ToolNotInProximity
                );
            } else {
                let serial = self.serial_pending.take().unwrap_or(0);
                let mut registry = self.registry.borrow_mut();
                let Some(mut handle) = registry.acquire(tool_type, serial, self.device_id) else {
                    self.clear_frame();
                    return;
                };
                if serial != 0 {
                    handle = registry.assign_serial(handle, serial);
                }
                let tool = registry.get_mut(handle);
                tool.session_begin();
                tool.merge_capabilities(ToolCapabilities {
                    pressure: self.config.pressure.is_some(),
                    distance: self.config.distance.is_some(),
                    tilt: self.config.tilt.is_some(),
                });
                let id = tool.id;
                drop(registry);
                self.tool = Some((handle, id));
                self.last_tool = Some(id);
                self.in_proximity = true;
                self.forced_out = false;
                self.smoother.reset();
                sink.push(Event::ToolProximity {
                    tool: id,
                    in_proximity: true,
                });
            }
        }

        let Some((handle, id)) = self.tool else {
            self.clear_frame();
            return;
        };

        // A serial arriving after the tool was registered under zero.
        if let Some(serial) = self.serial_pending.take() {
            let mut registry = self.registry.borrow_mut();
            let resolved = registry.assign_serial(handle, serial);
            let id = registry.get(resolved).id;
            drop(registry);
            self.tool = Some((resolved, id));
            self.last_tool = Some(id);
        }
        let (handle, id) = self.tool.unwrap_or((handle, id));

        let offset = self.registry.borrow().get(handle).pressure_offset();

        // 2. Tip contact, with hysteresis around the offset.
        let mut tip = self.tip_down;
        if let Some(range) = self.config.pressure {
            if let Some(pressure) = self.effective_pressure(offset) {
                let span = range.range().max(1);
                if pressure * 1000 > span * TIP_DOWN_PERMILLE {
                    tip = true;
                } else if pressure * 1000 <= span * TIP_UP_PERMILLE {
                    tip = false;
                }
            }
        } else if let Some(pressed) = self.tip_button_pending.take() {
            tip = pressed;
        }
        if self.prox_out_pending {
            tip = false;
        }

        if tip && !self.tip_down {
            self.tip_down = true;
            sink.push(Event::ToolTip { tool: id, down: true });
        }

        // Hover pressure feeds the offset calibration.
        if !self.tip_down
            && self.changed.pressure
            && let Some(range) = self.config.pressure
        {
            let hover = self.axes.pressure - range.minimum;
            self.registry
                .borrow_mut()
                .get_mut(handle)
                .observe_hover_pressure(hover);
        }

        // 3. Axis motion. The proximity-out frame carries no axes: the
        // values on it are the pen already out of tracking range.
        if self.changed.any() && !self.prox_out_pending {
            let changed = self.changed;
            let axes = self.axis_values(offset);
            self.changed.clear();
            sink.push(Event::ToolAxes {
                tool: id,
                changed,
                axes,
            });
        }

        // 4. Buttons.
        for &(code, pressed) in &self.buttons {
            sink.push(Event::ToolButton {
                tool: id,
                code,
                pressed,
            });
        }
        self.buttons.clear();

        // 5. Tip release, always before proximity-out.
        if !tip && self.tip_down {
            self.tip_down = false;
            sink.push(Event::ToolTip { tool: id, down: false });
        }

        // 6. Proximity out.
        if self.prox_out_pending {
            self.prox_out_pending = false;
            self.leave_proximity(sink);
        } else if self.in_proximity && !self.sends_prox_out {
            self.watchdog.arm_after(now, self.watchdog_timeout(slow_watchdog));
        }
        self.changed.clear();
        self.tip_button_pending = None;
        self.serial_pending = None;
    }

    fn leave_proximity(&mut self, sink: &mut impl EventSink) {
        let Some((handle, id)) = self.tool else {
            return;
        };
        if self.tip_down {
            self.tip_down = false;
            sink.push(Event::ToolTip { tool: id, down: false });
        }
        {
            let mut registry = self.registry.borrow_mut();
            let range = self.config.pressure.map(|r| r.range()).unwrap_or(0);
            registry
                .get_mut(handle)
                .session_end(range, self.config.distance.is_some());
        }
        sink.push(Event::ToolProximity {
            tool: id,
            in_proximity: false,
        });
        self.in_proximity = false;
        self.tool = None;
        self.watchdog.cancel();
    }

    pub fn next_timeout(&self) -> Option<Instant> {
        self.watchdog.deadline()
    }

    pub fn dispatch_timers(&mut self, now: Instant, sink: &mut impl EventSink) {
        if self.watchdog.poll(now).is_some() && self.in_proximity {
            debug!("tablet: no data for the watchdog window, forcing proximity-out");
            self.forced_out = true;
            self.leave_proximity(sink);
        }
    }

    /// Drop the tool unconditionally, for suspend or device removal.
    pub fn force_out(&mut self, sink: &mut impl EventSink) {
        self.clear_frame();
        if self.in_proximity {
            self.leave_proximity(sink);
        }
        self.forced_out = false;
        self.watchdog.cancel();
    }

    /// What the paired touch device should do about contacts right now.
    pub fn arbitration(&self) -> (ArbitrationMode, Option<Rect>) {
        if !self.in_proximity {
            return (ArbitrationMode::NotActive, None);
        }
        let margin_x = self.config.x.range() * ARBITRATION_MARGIN_PERMILLE / 1000;
        let margin_y = self.config.y.range() * ARBITRATION_MARGIN_PERMILLE / 1000;
        let rect = Rect {
            min: Point {
                x: self.axes.x - margin_x,
                y: self.axes.y - margin_y,
            },
            max: Point {
                x: self.axes.x + margin_x,
                y: self.axes.y + margin_y,
            },
        };
        (ArbitrationMode::IgnoreRect, Some(rect))
    }
}
