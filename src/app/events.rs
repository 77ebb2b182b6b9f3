//! Outbound application events.
//!
//! The [`Supervisor`](super::supervisor::Supervisor) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  The CSV stream on the
//! serial link is separate; these are for the operator log.

use crate::fsm::StateId;
use crate::fsm::context::CaptureProgress;
use crate::safety::RecoveryOutcome;
use crate::serial::codec::Line;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The supervisor has started (carries initial mode).
    Started(StateId),

    /// A command or the end of a capture changed the mode.
    ModeChanged { from: StateId, to: StateId },

    /// The setpoint was changed by command.
    SetpointChanged { from: f32, to: f32 },

    /// A reading failed the plausibility check and recovery was run.
    SensorFault { raw: f32, recovery: RecoveryOutcome },

    /// A valid reading arrived after `after_faults` faulty cycles.
    SensorRecovered { after_faults: u32 },

    /// A capture logged all of its samples and returned to idle.
    CaptureComplete { samples: u32 },

    /// A line matched no command and was echoed back.
    Echoed(Line),

    /// Periodic status snapshot (monitor period).
    Telemetry(StatusReport),
}

/// A point-in-time snapshot suitable for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub mode: StateId,
    pub setpoint_c: f32,
    pub last_reading_c: Option<f32>,
    pub last_actuation: f32,
    pub heater_enabled: bool,
    pub capture: CaptureProgress,
    pub consecutive_faults: u32,
    pub total_faults: u32,
    pub control_updates: u32,
}
