//! PID controller for heater actuation
//!
//! Discrete PID with two additions over the textbook form:
//!
//! - **Back-calculation anti-windup.**  The amount by which the raw output
//!   `v` overshot the bounds on the previous call (`es = v - u`) is fed back
//!   into the integrator, so the accumulator settles instead of running away
//!   while the heater is pinned at a rail.
//! - **Filtered derivative.**  The derivative of the error is smoothed by a
//!   first-order low-pass with `alpha = tf / (tf + dt)`.
//!
//! ```text
//! integral += (e - es / (ki * tt)) * dt      I = ki * integral
//! D = alpha * D_prev + (1 - alpha) * kd * (e - e_prev) / dt
//! v = P + I + D      u = clamp(v, min, max)      es = v - u
//! ```
//!
//! An optional large-error band bypasses the arithmetic entirely and drives
//! the output to a rail.  The low-voltage bench heater has too little
//! authority for the linear law to make progress from far away.

use crate::error::{Error, Result};

/// Immutable tuning and sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerParameters {
    dt: f32,
    output_min: f32,
    output_max: f32,
    kp: f32,
    ki: f32,
    kd: f32,
    tf: f32,
    tracking_time: f32,
    bang_bang_band: Option<f32>,
}

impl ControllerParameters {
    /// Validate and build a parameter set.  The anti-windup tracking time
    /// defaults to `kp / ki` (or `1.0` when there is no integral action).
    pub fn new(
        dt: f32,
        output_min: f32,
        output_max: f32,
        kp: f32,
        ki: f32,
        kd: f32,
        tf: f32,
    ) -> Result<Self> {
        let all_finite = [dt, output_min, output_max, kp, ki, kd, tf]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::Config("controller parameters must be finite"));
        }
        if dt <= 0.0 {
            return Err(Error::Config("sampling period must be > 0"));
        }
        if output_min >= output_max {
            return Err(Error::Config("output_min must be below output_max"));
        }
        if tf < 0.0 {
            return Err(Error::Config("derivative filter constant must be >= 0"));
        }

        let tracking_time = if ki != 0.0 && kp != 0.0 {
            (kp / ki).abs()
        } else {
            1.0
        };

        Ok(Self {
            dt,
            output_min,
            output_max,
            kp,
            ki,
            kd,
            tf,
            tracking_time,
            bang_bang_band: None,
        })
    }

    /// Override the anti-windup tracking time (seconds).
    pub fn with_tracking_time(mut self, tracking_time: f32) -> Result<Self> {
        if !(tracking_time.is_finite() && tracking_time > 0.0) {
            return Err(Error::Config("tracking time must be > 0"));
        }
        self.tracking_time = tracking_time;
        Ok(self)
    }

    /// Enable the large-error mode: `|error| >= band` bypasses the PID.
    pub fn with_bang_bang_band(mut self, band: f32) -> Result<Self> {
        if !(band.is_finite() && band > 0.0) {
            return Err(Error::Config("bang-bang band must be > 0"));
        }
        self.bang_bang_band = Some(band);
        Ok(self)
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn output_min(&self) -> f32 {
        self.output_min
    }

    pub fn output_max(&self) -> f32 {
        self.output_max
    }

    pub fn bang_bang_band(&self) -> Option<f32> {
        self.bang_bang_band
    }

    /// Derivative filter coefficient.
    fn alpha(&self) -> f32 {
        self.tf / (self.tf + self.dt)
    }

    /// Gain applied to `es` before it is subtracted from the error.
    fn back_calculation_gain(&self) -> f32 {
        if self.ki == 0.0 {
            0.0
        } else {
            1.0 / (self.ki * self.tracking_time)
        }
    }
}

/// Mutable controller memory.  Snapshot via [`PidController::state`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    /// Accumulated `error * dt`, corrected by back-calculation.
    pub integral: f32,
    pub prev_error: f32,
    /// Previous filtered derivative term.
    pub prev_derivative: f32,
    /// Raw-minus-saturated output from the previous call.
    pub windup: f32,
}

/// PID controller
pub struct PidController {
    params: ControllerParameters,
    state: ControllerState,
    alpha: f32,
    back_calc_gain: f32,
}

impl PidController {
    pub fn new(params: ControllerParameters) -> Self {
        Self {
            alpha: params.alpha(),
            back_calc_gain: params.back_calculation_gain(),
            params,
            state: ControllerState::default(),
        }
    }

    /// Compute the next actuation for `setpoint` given `measurement`.
    pub fn update(&mut self, setpoint: f32, measurement: f32) -> f32 {
        let p = &self.params;
        let error = setpoint - measurement;

        // Large-error mode: straight to a rail, integrator and filter untouched.
        if let Some(band) = p.bang_bang_band {
            if error.abs() >= band {
                self.state.prev_error = error;
                return if error > 0.0 { p.output_max } else { p.output_min };
            }
        }

        // Proportional
        let prop = p.kp * error;

        // Integral with back-calculation from the previous call's excess
        self.state.integral += (error - self.state.windup * self.back_calc_gain) * p.dt;
        let integral = p.ki * self.state.integral;

        // Filtered derivative
        let raw_derivative = (error - self.state.prev_error) / p.dt;
        let derivative =
            self.alpha * self.state.prev_derivative + (1.0 - self.alpha) * p.kd * raw_derivative;
        self.state.prev_derivative = derivative;

        let raw = prop + integral + derivative;
        let output = raw.clamp(p.output_min, p.output_max);
        self.state.windup = raw - output;
        self.state.prev_error = error;

        output
    }

    /// Discard all accumulated controller memory.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn params(&self) -> &ControllerParameters {
        &self.params
    }
}
