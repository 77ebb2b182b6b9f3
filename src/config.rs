//! System configuration parameters
//!
//! All tunable parameters for the heater controller.  Defaults match the
//! bench rig (BMP280 on I2C, heater on TIM1 CH1 with a 0–1000 compare
//! range).  The host binary can override them from a JSON file; nothing is
//! written back.

use serde::{Deserialize, Serialize};

use crate::control::pid::ControllerParameters;
use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop period (milliseconds).  Also the PID sampling period.
    pub control_period_ms: u32,
    /// Monitor-mode log period (milliseconds)
    pub monitor_period_ms: u32,

    // --- PID ---
    /// Lower actuation bound (PWM compare counts)
    pub output_min: f32,
    /// Upper actuation bound (PWM compare counts)
    pub output_max: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Derivative low-pass time constant (seconds)
    pub derivative_filter_tf: f32,
    /// Anti-windup tracking time (seconds).  `None` uses `kp / ki`.
    pub tracking_time_s: Option<f32>,
    /// Errors at least this large (°C) drive the output straight to a bound.
    /// `None` disables the large-error mode.
    pub bang_bang_band_c: Option<f32>,

    // --- Operation ---
    /// Setpoint at power-on (°C)
    pub initial_setpoint_c: f32,
    /// Whether the heater is driven from power-on, before any command
    pub heat_on_boot: bool,
    /// Extra samples logged past the requested capture length
    pub capture_safety_margin: u32,
    /// PWM timer channel the heater is wired to
    pub pwm_channel: u8,

    // --- Sensor fault handling ---
    /// Readings at or below this value (°C) are driver failure sentinels
    pub sensor_fault_threshold_c: f32,
    /// Readings above this value (°C) are treated as failures too
    pub sensor_max_plausible_c: f32,
    /// Pause between sensor shutdown and re-init (milliseconds)
    pub reinit_pause_ms: u32,
    /// Settling pause after the re-init sequence (milliseconds)
    pub settle_ms: u32,
    /// Re-init rounds attempted per faulty reading
    pub max_reinit_attempts: u8,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            control_period_ms: 100,  // 10 Hz
            monitor_period_ms: 5000, // one line per 5 s

            // PID
            output_min: 0.0,
            output_max: 1000.0,
            kp: 100.0,
            ki: 0.1,
            kd: 30.0,
            derivative_filter_tf: 0.05,
            tracking_time_s: None,
            bang_bang_band_c: Some(5.0),

            // Operation
            initial_setpoint_c: 28.0,
            heat_on_boot: true,
            capture_safety_margin: 50,
            pwm_channel: 1,

            // Sensor faults
            sensor_fault_threshold_c: -90.0,
            sensor_max_plausible_c: 150.0,
            reinit_pause_ms: 10,
            settle_ms: 50,
            max_reinit_attempts: 3,
        }
    }
}

impl SystemConfig {
    /// Reject values that would make the loop misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.control_period_ms == 0 {
            return Err(Error::Config("control_period_ms must be > 0"));
        }
        if self.monitor_period_ms == 0 {
            return Err(Error::Config("monitor_period_ms must be > 0"));
        }
        if self.max_reinit_attempts == 0 {
            return Err(Error::Config("max_reinit_attempts must be > 0"));
        }
        if !self.initial_setpoint_c.is_finite() {
            return Err(Error::Config("initial_setpoint_c must be finite"));
        }
        if !(self.sensor_fault_threshold_c < self.sensor_max_plausible_c) {
            return Err(Error::Config(
                "sensor_fault_threshold_c must be below sensor_max_plausible_c",
            ));
        }
        self.controller_parameters().map(|_| ())
    }

    /// Sampling period in seconds.
    pub fn dt_secs(&self) -> f32 {
        self.control_period_ms as f32 / 1000.0
    }

    /// Build the immutable PID parameter set.
    pub fn controller_parameters(&self) -> Result<ControllerParameters> {
        let mut params = ControllerParameters::new(
            self.dt_secs(),
            self.output_min,
            self.output_max,
            self.kp,
            self.ki,
            self.kd,
            self.derivative_filter_tf,
        )?;
        if let Some(tt) = self.tracking_time_s {
            params = params.with_tracking_time(tt)?;
        }
        if let Some(band) = self.bang_bang_band_c {
            params = params.with_bang_bang_band(band)?;
        }
        Ok(params)
    }
}
