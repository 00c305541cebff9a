//! Button codes.
//!
//! Codes use the kernel's numbering so that an evdev transport can pass them
//! through unmodified, but nothing in the core depends on the numeric values
//! beyond equality.

use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// A physical button identifier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonCode(pub u16);

impl ButtonCode {
    pub const LEFT: ButtonCode = ButtonCode(0x110);
    pub const RIGHT: ButtonCode = ButtonCode(0x111);
    pub const MIDDLE: ButtonCode = ButtonCode(0x112);
    pub const SIDE: ButtonCode = ButtonCode(0x113);
    pub const EXTRA: ButtonCode = ButtonCode(0x114);
    pub const FORWARD: ButtonCode = ButtonCode(0x115);
    pub const BACK: ButtonCode = ButtonCode(0x116);
    pub const TASK: ButtonCode = ButtonCode(0x117);

    /// Tip contact on touch devices (single-touch fallback protocol).
    pub const TOUCH: ButtonCode = ButtonCode(0x14a);

    /// Barrel buttons on tablet tools.
    pub const STYLUS: ButtonCode = ButtonCode(0x14b);
    pub const STYLUS2: ButtonCode = ButtonCode(0x14c);
    pub const STYLUS3: ButtonCode = ButtonCode(0x149);

    /// Human readable name for the well-known codes, for logging.
    pub fn name(&self) -> &'static str {
        match *self {
            ButtonCode::LEFT => "BTN_LEFT",
            ButtonCode::RIGHT => "BTN_RIGHT",
            ButtonCode::MIDDLE => "BTN_MIDDLE",
            ButtonCode::SIDE => "BTN_SIDE",
            ButtonCode::EXTRA => "BTN_EXTRA",
            ButtonCode::FORWARD => "BTN_FORWARD",
            ButtonCode::BACK => "BTN_BACK",
            ButtonCode::TASK => "BTN_TASK",
            ButtonCode::TOUCH => "BTN_TOUCH",
            ButtonCode::STYLUS => "BTN_STYLUS",
            ButtonCode::STYLUS2 => "BTN_STYLUS2",
            ButtonCode::STYLUS3 => "BTN_STYLUS3",
            _ => "BTN_UNKNOWN",
        }
    }

    /// Whether this code belongs to a tablet tool rather than the device body.
    pub fn is_stylus_button(&self) -> bool {
        matches!(*self, ButtonCode::STYLUS | ButtonCode::STYLUS2 | ButtonCode::STYLUS3)
    }
}
