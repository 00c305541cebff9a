//! Violation taxonomy.
//!
//! Nothing in this core is fatal: protocol violations from the hardware
//! layer, capacity overruns and calibration anomalies are logged and
//! processing continues. This enum gives those log entries a stable shape.

/// A malformed input observed by one of the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Violation {
    /// A button edge arrived in a debounce state with no transition for it.
    UnexpectedButtonEdge,
    /// A timer fired in a state that had none armed.
    UnexpectedTimeout,
    /// A new tracking id arrived on a slot that is already active.
    DuplicateContact,
    /// A contact ended on a slot that was never active.
    EndWithoutContact,
    /// Axis or button data for a tool that is not in proximity.
    ToolNotInProximity,
    /// A derived pressure offset outside the sane range was rejected.
    PressureOffsetOutOfRange,
}
