//! # evnorm
//!
//! Normalization core for raw input-device event streams.
//!
//! Raw kernel-style samples (bouncy button edges, multitouch slot updates,
//! relative wheel ticks, pen proximity/pressure samples) go in one end, a
//! clean semantic event stream comes out the other: exactly one
//! press/release per physical actuation, one begin/update/end per touch
//! contact, one scroll notification per logical wheel motion, one
//! proximity-in/tip/axis/proximity-out sequence per pen interaction.
//!
//! The core is single-threaded and does no I/O. Samples are pushed into a
//! [`device::DeviceContext`] together with their monotonic timestamps; an
//! external timer wheel drives pending timeouts through
//! [`device::DeviceContext::dispatch_timers`] between frames.

#![no_std]

#[macro_use]
mod fmt;

pub mod arbitration;
pub mod config;
pub mod debounce;
pub mod device;
pub mod error;
pub mod event;
pub mod frame;
pub mod tablet;
pub mod timer;
pub mod touch;
pub mod wheel;

use embassy_time::Duration;

/// Time a transmitted button edge has to stay stable before the debounce
/// engine considers it settled.
pub const BOUNCE_TIMEOUT: Duration = Duration::from_millis(25);

/// Window used to tell spurious release/press pairs from contact bounce.
pub const SPURIOUS_TIMEOUT: Duration = Duration::from_millis(12);

/// Accumulated hi-res wheel motion (in 120ths of a detent) required before
/// the first scroll notification of a sequence.
pub const WHEEL_SCROLL_THRESHOLD: i32 = 60;

/// One detent of wheel motion in hi-res units.
pub const WHEEL_TICK: i32 = 120;

/// Inactivity after which a scroll sequence is considered finished.
pub const WHEEL_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

/// Wheel click angle in degrees used when the device does not report one.
pub const DEFAULT_WHEEL_CLICK_ANGLE: f32 = 15.0;

/// Delay between pen/touch arbitration deactivating and touch input being
/// permitted again.
pub const ARBITRATION_REARM_DELAY: Duration = Duration::from_millis(90);

/// Watchdog timeout forcing proximity-out on tablets with broken proximity
/// signalling.
pub const PROXIMITY_OUT_TIMEOUT: Duration = Duration::from_millis(50);

/// Slow watchdog variant, selected by quirk for tablets that report at a
/// low rate while the pen hovers.
pub const PROXIMITY_OUT_TIMEOUT_SLOW: Duration = Duration::from_millis(150);

/// Raw samples buffered per frame; excess samples are dropped with a log
/// entry.
pub const FRAME_CAPACITY: usize = 64;

/// Multitouch slots tracked per device.
pub const MAX_TOUCH_SLOTS: usize = 16;

/// Seat slots available to the shared allocator.
pub const MAX_SEAT_SLOTS: usize = 32;

/// Tools held by one registry.
pub const MAX_TOOLS: usize = 16;

/// Button edges processed per frame; excess edges are dropped with a log
/// entry.
pub const MAX_BUTTONS_PER_FRAME: usize = 8;
