//! First-order thermal plant for host simulation.
//!
//! ```text
//!   dT/dt = (T_ambient - T) / tau  +  rate * drive
//! ```
//!
//! `drive` is the heater's fraction of full power (`0.0..=1.0`).  At full
//! drive the plant settles `rate * tau` degrees above ambient.

/// Lumped heater block + sensor.
#[derive(Debug, Clone, Copy)]
pub struct ThermalModel {
    temperature_c: f32,
    ambient_c: f32,
    time_constant_s: f32,
    full_power_rate_c_per_s: f32,
}

impl Default for ThermalModel {
    fn default() -> Self {
        // Bench block: 22 C room, ~2 min time constant, +60 C at full power.
        Self::new(22.0, 120.0, 0.5)
    }
}

impl ThermalModel {
    /// Plant starting at ambient temperature.
    pub fn new(ambient_c: f32, time_constant_s: f32, full_power_rate_c_per_s: f32) -> Self {
        Self {
            temperature_c: ambient_c,
            ambient_c,
            time_constant_s: time_constant_s.max(f32::EPSILON),
            full_power_rate_c_per_s,
        }
    }

    /// Integrate `dt_s` seconds at constant `drive` (forward Euler,
    /// sub-stepped so large gaps stay stable).
    pub fn step(&mut self, dt_s: f32, drive: f32) {
        let drive = drive.clamp(0.0, 1.0);
        let max_step = self.time_constant_s / 10.0;
        let mut remaining = dt_s.max(0.0);
        while remaining > 0.0 {
            let h = remaining.min(max_step);
            let rate = (self.ambient_c - self.temperature_c) / self.time_constant_s
                + self.full_power_rate_c_per_s * drive;
            self.temperature_c += rate * h;
            remaining -= h;
        }
    }

    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    pub fn ambient_c(&self) -> f32 {
        self.ambient_c
    }

    /// Temperature the plant settles at under constant `drive`.
    pub fn steady_state_c(&self, drive: f32) -> f32 {
        self.ambient_c + self.full_power_rate_c_per_s * self.time_constant_s * drive.clamp(0.0, 1.0)
    }
}
