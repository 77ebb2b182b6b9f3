//! Heater PWM stage on an `embedded-hal` PWM channel.
//!
//! The controller works in its own units (`0..=full_scale`, 1000 on the
//! bench rig); the channel's compare range is whatever the timer was
//! configured for.  `set_duty_cycle_fraction` does the scaling.
//!
//! While disabled the channel is held fully off; the last requested duty
//! is remembered and restored by `enable_output`.

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::app::ports::ActuatorPort;
use crate::error::ActuatorError;

pub struct PwmHeater<P: SetDutyCycle> {
    pwm: P,
    channel: u8,
    full_scale: u16,
    duty: u16,
    enabled: bool,
}

impl<P: SetDutyCycle> PwmHeater<P> {
    /// Wrap `pwm`, starting disabled and fully off.
    pub fn new(mut pwm: P, channel: u8, full_scale: u16) -> Self {
        if pwm.set_duty_cycle_fully_off().is_err() {
            warn!("PWM ch{channel}: could not force off at init");
        }
        Self {
            pwm,
            channel,
            full_scale: full_scale.max(1),
            duty: 0,
            enabled: false,
        }
    }

    /// Last requested duty, in controller units.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn full_scale(&self) -> u16 {
        self.full_scale
    }

    pub fn channel(&self) -> &P {
        &self.pwm
    }

    fn write(&mut self) -> Result<(), ActuatorError> {
        let result = if self.enabled {
            self.pwm.set_duty_cycle_fraction(self.duty, self.full_scale)
        } else {
            self.pwm.set_duty_cycle_fully_off()
        };
        result.map_err(|_| ActuatorError::PwmWriteFailed)
    }
}

impl<P: SetDutyCycle> ActuatorPort for PwmHeater<P> {
    fn set_duty(&mut self, duty: u16) -> Result<(), ActuatorError> {
        self.duty = duty.min(self.full_scale);
        if self.enabled {
            self.write()?;
        }
        Ok(())
    }

    fn enable_output(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        debug!("PWM ch{}: output enabled", self.channel);
        if let Err(e) = self.write() {
            warn!("PWM ch{}: {e}", self.channel);
        }
    }

    fn disable_output(&mut self) {
        self.enabled = false;
        debug!("PWM ch{}: output disabled", self.channel);
        if let Err(e) = self.write() {
            warn!("PWM ch{}: {e}", self.channel);
        }
    }
}
