//! Simulated rig: the whole board behind the port traits, for the host.
//!
//! Combines a [`ThermalModel`] plant, a [`PwmHeater`] on a simulated timer
//! channel and a sensor that can be made to fail.  Exposed through
//! [`SensorPort`], [`ActuatorPort`] and [`DelayNs`] exactly like a real
//! board adapter would be.
//!
//! Time only moves for the plant when [`SimulatedRig::advance`] is called
//! with the loop's clock; recovery pauses sleep for real.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use log::debug;

use super::pwm::PwmHeater;
use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::SystemConfig;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::FAULT_SENTINEL_C;
use crate::sensors::thermal_model::ThermalModel;

// ── Simulated timer channel ───────────────────────────────────

/// Compare register of a simulated 16-bit PWM timer.
#[derive(Debug, Clone, Copy)]
pub struct SimPwmChannel {
    compare: u16,
    max: u16,
}

impl SimPwmChannel {
    pub fn new(max: u16) -> Self {
        Self {
            compare: 0,
            max: max.max(1),
        }
    }

    /// Fraction of full power currently applied.
    pub fn drive(&self) -> f32 {
        f32::from(self.compare) / f32::from(self.max)
    }
}

impl ErrorType for SimPwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.compare = duty.min(self.max);
        Ok(())
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub struct SimulatedRig {
    plant: ThermalModel,
    heater: PwmHeater<SimPwmChannel>,
    sensor_online: bool,
    /// Next reads that return the sentinel.
    pending_faults: u32,
    /// Every n-th read returns the sentinel.
    fault_every: Option<u32>,
    /// Next `reinitialize` calls that are rejected.
    failing_reinits: u32,
    reads: u32,
    last_advance_ms: Option<u32>,
}

impl SimulatedRig {
    pub fn new(config: &SystemConfig, plant: ThermalModel) -> Self {
        // Controller units map 1:1 onto a 0..=output_max compare range.
        let full_scale = config.output_max.clamp(1.0, f32::from(u16::MAX)) as u16;
        Self {
            plant,
            heater: PwmHeater::new(SimPwmChannel::new(full_scale), config.pwm_channel, full_scale),
            sensor_online: true,
            pending_faults: 0,
            fault_every: None,
            failing_reinits: 0,
            reads: 0,
            last_advance_ms: None,
        }
    }

    /// Make the next `n` reads fail.
    pub fn inject_faults(&mut self, n: u32) {
        self.pending_faults = self.pending_faults.saturating_add(n);
    }

    /// Make every `n`-th read fail (`0` disables).
    pub fn fail_every(&mut self, n: u32) {
        self.fault_every = (n > 0).then_some(n);
    }

    /// Reject the next `n` re-init attempts.
    pub fn reject_reinits(&mut self, n: u32) {
        self.failing_reinits = n;
    }

    /// Integrate the plant up to `now_ms` with the current heater drive.
    pub fn advance(&mut self, now_ms: u32) {
        if let Some(last) = self.last_advance_ms {
            let dt_s = now_ms.wrapping_sub(last) as f32 / 1000.0;
            self.plant.step(dt_s, self.heater.channel().drive());
        }
        self.last_advance_ms = Some(now_ms);
    }

    pub fn plant(&self) -> &ThermalModel {
        &self.plant
    }

    pub fn heater(&self) -> &PwmHeater<SimPwmChannel> {
        &self.heater
    }

    fn read_fails(&mut self) -> bool {
        if self.pending_faults > 0 {
            self.pending_faults -= 1;
            return true;
        }
        !self.sensor_online || self.fault_every.is_some_and(|n| self.reads % n == 0)
    }
}

impl SensorPort for SimulatedRig {
    fn read_temperature(&mut self) -> f32 {
        self.reads = self.reads.wrapping_add(1);
        if self.read_fails() {
            FAULT_SENTINEL_C
        } else {
            self.plant.temperature_c()
        }
    }

    fn shutdown(&mut self) {
        debug!("SIM | sensor bus released");
        self.sensor_online = false;
    }

    fn reinitialize(&mut self) -> Result<(), SensorError> {
        if self.failing_reinits > 0 {
            self.failing_reinits -= 1;
            return Err(SensorError::InitRejected);
        }
        debug!("SIM | sensor bus up");
        self.sensor_online = true;
        Ok(())
    }
}

impl ActuatorPort for SimulatedRig {
    fn set_duty(&mut self, duty: u16) -> Result<(), ActuatorError> {
        self.heater.set_duty(duty)
    }

    fn enable_output(&mut self) {
        self.heater.enable_output();
    }

    fn disable_output(&mut self) {
        self.heater.disable_output();
    }
}

impl DelayNs for SimulatedRig {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}
