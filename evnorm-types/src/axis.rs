//! Axis identifiers of the raw sample stream.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// Relative axes.
///
/// Wheel deltas come in two resolutions: the legacy axes report whole
/// detents, the hi-res axes report 120ths of a detent. Devices may report
/// either or both; the wheel engine normalizes them to one model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelAxis {
    Wheel,
    HWheel,
    WheelHiRes,
    HWheelHiRes,
}

/// Absolute axes, including the multitouch slot protocol fields.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AbsAxis {
    X,
    Y,
    Pressure,
    Distance,
    TiltX,
    TiltY,
    /// Selects the multitouch slot subsequent slot fields apply to.
    MtSlot,
    /// A non-negative value begins a contact, -1 ends it.
    MtTrackingId,
    MtPositionX,
    MtPositionY,
    /// Contact classification, see [`MT_TOOL_FINGER`] / [`MT_TOOL_PALM`].
    MtToolType,
}

/// Contact classified as a finger on [`AbsAxis::MtToolType`].
pub const MT_TOOL_FINGER: i32 = 0;
/// Contact classified as a palm on [`AbsAxis::MtToolType`].
pub const MT_TOOL_PALM: i32 = 2;

/// Scroll axes of the normalized output stream.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}
