//! Per-device capability descriptors.
//!
//! Everything here arrives resolved from the outside (capability probing and
//! quirk databases are external collaborators): axis ranges with their fuzz,
//! which engines a device needs, and quirk booleans the engines consult.

use crate::DEFAULT_WHEEL_CLICK_ANGLE;

/// Numeric range of one absolute axis as reported by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisRange {
    pub minimum: i32,
    pub maximum: i32,
    /// Values within `fuzz` of each other may be noise.
    pub fuzz: i32,
    /// Units per millimeter, 0 if unknown.
    pub resolution: i32,
}

impl AxisRange {
    pub const fn new(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            fuzz: 0,
            resolution: 0,
        }
    }

    pub const fn with_fuzz(mut self, fuzz: i32) -> Self {
        self.fuzz = fuzz;
        self
    }

    pub fn range(&self) -> i32 {
        self.maximum - self.minimum
    }

    pub fn center(&self) -> i32 {
        self.minimum + self.range() / 2
    }
}

/// Wheel reporting capabilities.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelConfig {
    /// Device reports hi-res (120ths of a detent) axes.
    pub hi_res: bool,
    /// Degrees per detent.
    pub click_angle: f32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            hi_res: true,
            click_angle: DEFAULT_WHEEL_CLICK_ANGLE,
        }
    }
}

/// Touch surface capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchConfig {
    pub x: AxisRange,
    pub y: AxisRange,
    /// Device speaks the multitouch slot protocol. Without it, contacts run
    /// through the single-touch fallback (slot index -1).
    pub mt: bool,
}

impl TouchConfig {
    pub fn new(x: AxisRange, y: AxisRange) -> Self {
        Self { x, y, mt: true }
    }
}

/// Tablet/digitizer capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TabletConfig {
    pub x: AxisRange,
    pub y: AxisRange,
    pub pressure: Option<AxisRange>,
    pub distance: Option<AxisRange>,
    pub tilt: Option<AxisRange>,
    /// Average pen positions over a small window to hide sensor jitter.
    pub smoothing: bool,
}

impl TabletConfig {
    pub fn new(x: AxisRange, y: AxisRange) -> Self {
        Self {
            x,
            y,
            pressure: None,
            distance: None,
            tilt: None,
            smoothing: true,
        }
    }
}

/// Model quirks, resolved by the embedding's quirk database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Quirks {
    /// Bypass button debouncing entirely.
    pub debounce_disabled: bool,
    /// Use the slow forced-proximity-out watchdog timeout.
    pub slow_proximity_watchdog: bool,
}

/// Everything the core needs to know about one device.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Device has buttons that go through the debounce engine.
    pub buttons: bool,
    pub wheel: Option<WheelConfig>,
    pub touch: Option<TouchConfig>,
    pub tablet: Option<TabletConfig>,
    pub quirks: Quirks,
}

impl DeviceConfig {
    /// A plain mouse: debounced buttons and a wheel.
    pub fn pointer() -> Self {
        Self {
            buttons: true,
            wheel: Some(WheelConfig::default()),
            ..Self::default()
        }
    }

    /// A multitouch touchscreen.
    pub fn touchscreen(x: AxisRange, y: AxisRange) -> Self {
        Self {
            touch: Some(TouchConfig::new(x, y)),
            ..Self::default()
        }
    }

    /// A pen digitizer.
    pub fn tablet(config: TabletConfig) -> Self {
        Self {
            tablet: Some(config),
            ..Self::default()
        }
    }
}
