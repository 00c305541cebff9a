//! Raw samples in, normalized events out.

use evnorm_types::axis::{AbsAxis, RelAxis, ScrollAxis};
use evnorm_types::button::ButtonCode;
use evnorm_types::tool::{ToolId, ToolType};
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// One raw sample from the transport layer.
///
/// Samples between two [`RawEvent::Sync`] markers form a frame and are
/// processed atomically. Sample order within a frame is significant: the
/// multitouch protocol addresses a slot with [`AbsAxis::MtSlot`] and then
/// sends that slot's fields.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RawEvent {
    Button { code: ButtonCode, pressed: bool },
    Rel { axis: RelAxis, value: i32 },
    Abs { axis: AbsAxis, value: i32 },
    /// A tool entering or leaving the digitizer's sensing range.
    Tool { tool: ToolType, present: bool },
    /// Serial number reported for the tool currently in proximity.
    ToolSerial(u32),
    /// Frame delimiter.
    Sync,
}

/// Which tablet axes changed in a [`Event::ToolAxes`] notification.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChangedAxes {
    pub x: bool,
    pub y: bool,
    pub pressure: bool,
    pub distance: bool,
    pub tilt: bool,
}

impl ChangedAxes {
    pub fn any(&self) -> bool {
        self.x || self.y || self.pressure || self.distance || self.tilt
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Current values of the tablet axes.
///
/// Positions are in device units, pressure and distance normalized to
/// [0, 1], tilt in degrees from the vertical.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, MaxSize, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToolAxisValues {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub distance: f32,
    pub tilt_x: f32,
    pub tilt_y: f32,
}

/// A normalized notification.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Exactly one per physical button actuation.
    Button { code: ButtonCode, pressed: bool },
    /// One per logical wheel motion. `v120` is the motion in 120ths of a
    /// detent, `degrees` the same motion as a continuous angle.
    Scroll { axis: ScrollAxis, degrees: f32, v120: i32 },
    TouchBegin { slot: i32, seat_slot: u8, x: i32, y: i32 },
    TouchUpdate { slot: i32, seat_slot: u8, x: i32, y: i32 },
    TouchEnd { slot: i32, seat_slot: u8 },
    /// The contact did not end by lifting; the consumer should undo any
    /// in-progress interpretation of it.
    TouchCancel { slot: i32, seat_slot: u8 },
    /// Closes a group of touch notifications belonging to one frame.
    TouchFrame,
    ToolProximity { tool: ToolId, in_proximity: bool },
    ToolTip { tool: ToolId, down: bool },
    ToolAxes { tool: ToolId, changed: ChangedAxes, axes: ToolAxisValues },
    ToolButton { tool: ToolId, code: ButtonCode, pressed: bool },
}

/// Consumer of the normalized stream.
///
/// `push` must not call back into the producing device context; the core is
/// not re-entrant.
pub trait EventSink {
    fn push(&mut self, event: Event);
}

impl<const N: usize> EventSink for heapless::Vec<Event, N> {
    fn push(&mut self, event: Event) {
        if heapless::Vec::push(self, event).is_err() {
            error!("event sink full, dropping {:?}", event);
        }
    }
}
