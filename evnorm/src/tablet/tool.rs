//! Tablet tool identity and calibration.
//!
//! Tools with serial numbers are seat-global: the same physical pen moved
//! between two tablets of a seat is the same tool, and its calibration
//! travels with it. Serial-less tools exist once per device. The registry
//! lives behind a `RefCell` shared by every tablet of the seat.
//!
//! Calibration concerns the pressure zero point: worn pens report non-zero
//! pressure while hovering. The minimum pressure seen while out of contact
//! is learned as the offset; it only ever decreases (a pen never gets less
//! worn), so a noisy session late in life can never raise it. A few
//! sessions of observation (one, when a distance axis makes hover
//! unambiguous) establish the offset as trustworthy.

use evnorm_types::tool::{ToolId, ToolType};
use heapless::Vec;

use crate::MAX_TOOLS;
use crate::error::Violation;

/// Proximity sessions after which the pressure offset counts as established.
const OFFSET_LOCK_SESSIONS: u8 = 3;
/// Offsets beyond this share of the pressure range are sensor garbage.
const OFFSET_REJECT_PERMILLE: i32 = 500;

/// Handle into the registry, valid for the tool's registered lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToolHandle(usize);

/// Axes a tool has been seen to support. Grows as the tool visits devices;
/// a pen does not lose its tilt support by visiting a tablet without it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToolCapabilities {
    pub pressure: bool,
    pub distance: bool,
    pub tilt: bool,
}

#[derive(Debug)]
pub struct TabletTool {
    pub id: ToolId,
    /// Registering device, for serial-less tools only.
    owner: Option<u32>,
    capabilities: ToolCapabilities,
    offset: Option<i32>,
    offset_locked: bool,
    sessions: u8,
    session_min: Option<i32>,
    reject_logged: bool,
}

impl TabletTool {
    fn new(id: ToolId, owner: Option<u32>) -> Self {
        Self {
            id,
            owner,
            capabilities: ToolCapabilities::default(),
            offset: None,
            offset_locked: false,
            sessions: 0,
            session_min: None,
            reject_logged: false,
        }
    }

    pub fn pressure_offset(&self) -> i32 {
        self.offset.unwrap_or(0)
    }

    pub fn capabilities(&self) -> ToolCapabilities {
        self.capabilities
    }

    /// Union in the axes the current device exposes for this tool.
    pub(crate) fn merge_capabilities(&mut self, caps: ToolCapabilities) {
        self.capabilities.pressure |= caps.pressure;
        self.capabilities.distance |= caps.distance;
        self.capabilities.tilt |= caps.tilt;
    }

    pub(crate) fn session_begin(&mut self) {
        self.session_min = None;
    }

    /// Whether the offset has been observed long enough to be trusted.
    pub fn offset_locked(&self) -> bool {
        self.offset_locked
    }

    /// Record an out-of-contact pressure sample.
    pub(crate) fn observe_hover_pressure(&mut self, pressure: i32) {
        self.session_min = Some(match self.session_min {
            Some(min) => min.min(pressure),
            None => pressure,
        });
    }

    /// Fold the session's observations into the offset.
    ///
    /// The offset only ever moves down: a session minimum below the current
    /// offset pulls it lower, even after the lock; a higher one never
    /// raises it back. The lock only marks the end of the initial
    /// confidence window ([`OFFSET_LOCK_SESSIONS`] sessions, or one when a
    /// distance axis makes hover samples unambiguous).
    pub(crate) fn session_end(&mut self, pressure_range: i32, has_distance: bool) {
        let Some(candidate) = self.session_min.take() else {
            return;
        };
        if candidate * 1000 > pressure_range * OFFSET_REJECT_PERMILLE {
            if !self.reject_logged {
                self.reject_logged = true;
                warn!(
                    "tool {:?}: hover pressure {} beyond half the range, ignoring ({:?})",
                    self.id,
                    candidate,
                    Violation::PressureOffsetOutOfRange
                );
            }
            return;
        }
        match self.offset {
            None => {
                if candidate > 0 {
                    info!("tool {:?}: pressure offset {}", self.id, candidate);
                }
                self.offset = Some(candidate);
            }
            Some(offset) if candidate < offset => {
                self.offset = Some(candidate);
            }
            _ => {}
        }
        if !self.offset_locked {
            self.sessions = self.sessions.saturating_add(1);
            if has_distance || self.sessions >= OFFSET_LOCK_SESSIONS {
                self.offset_locked = true;
            }
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<TabletTool, MAX_TOOLS>,
}

impl ToolRegistry {
    pub const fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Find or create the tool for a proximity-in.
    ///
    /// `serial` of zero means the device has not reported one (yet); such
    /// tools are private to `device_id`. Returns `None` when the registry
    /// is full.
    pub fn acquire(
        &mut self,
        tool_type: ToolType,
        serial: u32,
        device_id: u32,
    ) -> Option<ToolHandle> {
        let owner = if serial == 0 { Some(device_id) } else { None };
        let found = self.tools.iter().position(|tool| {
            tool.id.tool_type == tool_type && tool.id.serial == serial && tool.owner == owner
        });
        if let Some(idx) = found {
            return Some(ToolHandle(idx));
        }
        let tool = TabletTool::new(ToolId::new(tool_type, serial), owner);
        if self.tools.push(tool).is_err() {
            error!("tool registry full, dropping {:?}/{}", tool_type, serial);
            return None;
        }
        Some(ToolHandle(self.tools.len() - 1))
    }

    /// The device reported the real serial after the tool was registered
    /// under serial zero. If a seat-global tool with that serial already
    /// exists, switch to it (keeping its calibration); otherwise promote
    /// the placeholder.
    pub fn assign_serial(&mut self, handle: ToolHandle, serial: u32) -> ToolHandle {
        if serial == 0 || self.tools[handle.0].id.serial == serial {
            return handle;
        }
        let tool_type = self.tools[handle.0].id.tool_type;
        let existing = self
            .tools
            .iter()
            .position(|tool| tool.id.tool_type == tool_type && tool.id.serial == serial);
        if let Some(idx) = existing {
            return ToolHandle(idx);
        }
        let tool = &mut self.tools[handle.0];
        tool.id.serial = serial;
        tool.owner = None;
        handle
    }

    pub fn get(&self, handle: ToolHandle) -> &TabletTool {
        &self.tools[handle.0]
    }

    pub fn get_mut(&mut self, handle: ToolHandle) -> &mut TabletTool {
        &mut self.tools[handle.0]
    }
}
