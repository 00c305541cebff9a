//! Tablet tool kinds and identities.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// The physical kind of a tablet tool.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToolType {
    Pen,
    Eraser,
    Brush,
    Pencil,
    Airbrush,
    Mouse,
    Lens,
}

/// Identity of a tool as visible in notifications.
///
/// Tools that report a serial number keep the same identity across devices;
/// serial-less tools carry `serial == 0` and are only meaningful within the
/// device that reported them.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToolId {
    pub tool_type: ToolType,
    pub serial: u32,
}

impl ToolId {
    pub fn new(tool_type: ToolType, serial: u32) -> Self {
        Self { tool_type, serial }
    }
}
