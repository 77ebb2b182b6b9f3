//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor (domain)
//! ```
//!
//! Driven adapters (sensor driver, PWM stage, serial transport, event log)
//! implement these traits.  The [`Supervisor`](super::supervisor::Supervisor)
//! consumes them via generics, so the domain core never touches hardware
//! directly.  Pauses during sensor recovery go through
//! [`embedded_hal::delay::DelayNs`], which the hardware adapter also
//! implements.

use crate::error::{ActuatorError, SensorError, TransportError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Temperature sensor driver.
pub trait SensorPort {
    /// Read the temperature in °C.  A failed read returns the driver's
    /// sentinel (at or below -90 °C) instead of an error.
    fn read_temperature(&mut self) -> f32;

    /// Release the sensor interface (bus de-init).
    fn shutdown(&mut self);

    /// Bring the sensor interface back up.  Idempotent.
    fn reinitialize(&mut self) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Heater PWM stage.
pub trait ActuatorPort {
    /// Write a duty value in controller units (`0..=output_max`).
    fn set_duty(&mut self, duty: u16) -> Result<(), ActuatorError>;

    /// Start driving the PWM output.
    fn enable_output(&mut self);

    /// Stop driving the PWM output (heater fully off).
    fn disable_output(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain → serial line)
// ───────────────────────────────────────────────────────────────

/// CSV data logger and acknowledgement channel on the serial link.
pub trait TransportPort {
    /// Emit the CSV column header.
    fn log_header(&mut self) -> Result<(), TransportError>;

    /// Emit one `timestamp_ms, value` line.
    fn log_sample(&mut self, timestamp_ms: u32, value: f32) -> Result<(), TransportError>;

    /// Send free text (command acknowledgements, echoes).
    fn transmit(&mut self, text: &str) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → operator log)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond tick source.  Wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the control cycle)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a software timer fires.
///
/// The [`Scheduler`](crate::scheduler::Scheduler) only compares ticks; what
/// a due task actually does lives in the implementor.
pub trait SchedulerDelegate {
    /// Called for each due task, in slot order.
    ///
    /// * `label`: the task's human-readable label.
    /// * `kind`: which periodic task fired.
    /// * `now_ms`: the tick the comparison was made against.
    fn on_task_due(&mut self, label: &str, kind: TaskKind, now_ms: u32);
}

/// Discriminant passed to [`SchedulerDelegate::on_task_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Sensor read, PID update, PWM write, capture logging.
    ControlUpdate,
    /// Low-rate monitor logging.
    MonitorLog,
}
