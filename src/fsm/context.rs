//! Shared mutable context threaded through every FSM handler.
//!
//! `SupervisorContext` is the blackboard the mode handlers read from and
//! write to: setpoint, latest reading, capture progress, and the output
//! directives the supervisor applies to the heater and the CSV log after
//! each transition.

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Capture progress
// ---------------------------------------------------------------------------

/// Requested and logged sample counts of the current capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureProgress {
    pub target: u32,
    pub elapsed: u32,
}

impl CaptureProgress {
    pub fn new(target: u32) -> Self {
        Self { target, elapsed: 0 }
    }

    /// Sample count at which the capture ends.
    pub fn limit(&self, margin: u32) -> u32 {
        self.target.saturating_add(margin)
    }
}

// ---------------------------------------------------------------------------
// Output directives (written by state handlers; applied by the supervisor)
// ---------------------------------------------------------------------------

/// What the supervisor must do to the outputs after a transition.
///
/// `heater_enabled` is a level; the other two are one-shot pulses the
/// supervisor clears once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputCommands {
    /// Run the PID and drive the PWM output.  When false the output is
    /// forced to the lower bound and disabled.
    pub heater_enabled: bool,
    /// Zero the controller state.
    pub reset_controller: bool,
    /// Emit the CSV column header.
    pub write_header: bool,
}

impl OutputCommands {
    pub fn clear_pulses(&mut self) {
        self.reset_controller = false;
        self.write_header = false;
    }
}

// ---------------------------------------------------------------------------
// SupervisorContext
// ---------------------------------------------------------------------------

pub struct SupervisorContext {
    // -- Control --
    /// Desired temperature (°C).
    pub setpoint_c: f32,
    /// Most recent reading that passed the fault check.
    pub last_reading_c: Option<f32>,
    /// Last value sent to the PWM stage, in controller units.
    pub last_actuation: f32,

    // -- Capture --
    pub capture: CaptureProgress,
    /// Samples logged past the requested capture length.
    pub capture_safety_margin: u32,

    // -- Outputs --
    pub commands: OutputCommands,
}

impl SupervisorContext {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            setpoint_c: config.initial_setpoint_c,
            last_reading_c: None,
            last_actuation: config.output_min,
            capture: CaptureProgress::default(),
            capture_safety_margin: config.capture_safety_margin,
            commands: OutputCommands::default(),
        }
    }

    /// The current capture has logged everything it should.
    pub fn capture_finished(&self) -> bool {
        self.capture.elapsed >= self.capture.limit(self.capture_safety_margin)
    }
}
