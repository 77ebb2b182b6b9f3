//! Sensor fault detection and bounded recovery.
//!
//! The temperature driver reports a failed read by returning a sentinel
//! (around -99 °C) rather than an error.  Every control cycle hands the raw
//! value to [`FaultRecovery::classify`] first.
//!
//! ## Fault lifecycle
//!
//! 1. A reading is a fault if it is not finite, at or below the sentinel
//!    threshold, or above the plausible maximum.
//! 2. [`FaultRecovery::recover`] runs up to `max_reinit_attempts` rounds of
//!    `shutdown → pause → reinitialize`, stopping at the first success,
//!    then pauses once more to let the sensor settle.
//! 3. The caller skips the rest of the cycle: no PID update, no PWM write,
//!    no log line.
//! 4. The next valid reading clears the consecutive-fault counter
//!    ([`FaultRecovery::note_valid`]).
//!
//! Recovery always returns; a sensor that never comes back simply faults
//! again on the next cycle.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::SensorPort;
use crate::config::SystemConfig;

/// Result of checking one raw reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingStatus {
    Valid(f32),
    Fault(f32),
}

/// What a recovery attempt achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// `reinitialize` succeeded on attempt number `attempts`.
    Reinitialized { attempts: u8 },
    /// Every attempt was rejected.
    Failed { attempts: u8 },
    /// A recovery was already running; nothing was done.
    Skipped,
}

/// Fault detector and recovery sequencer.
pub struct FaultRecovery {
    fault_threshold_c: f32,
    max_plausible_c: f32,
    reinit_pause_ms: u32,
    settle_ms: u32,
    max_attempts: u8,
    in_progress: bool,
    consecutive_faults: u32,
    total_faults: u32,
}

impl FaultRecovery {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            fault_threshold_c: config.sensor_fault_threshold_c,
            max_plausible_c: config.sensor_max_plausible_c,
            reinit_pause_ms: config.reinit_pause_ms,
            settle_ms: config.settle_ms,
            max_attempts: config.max_reinit_attempts,
            in_progress: false,
            consecutive_faults: 0,
            total_faults: 0,
        }
    }

    pub fn classify(&self, raw: f32) -> ReadingStatus {
        if !raw.is_finite() || raw <= self.fault_threshold_c || raw > self.max_plausible_c {
            ReadingStatus::Fault(raw)
        } else {
            ReadingStatus::Valid(raw)
        }
    }

    /// Run the shutdown / re-init sequence against `hw`.
    pub fn recover<H>(&mut self, hw: &mut H) -> RecoveryOutcome
    where
        H: SensorPort + DelayNs,
    {
        if self.in_progress {
            return RecoveryOutcome::Skipped;
        }
        self.in_progress = true;
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
        self.total_faults = self.total_faults.saturating_add(1);

        let mut outcome = RecoveryOutcome::Failed {
            attempts: self.max_attempts,
        };
        for attempt in 1..=self.max_attempts {
            hw.shutdown();
            hw.delay_ms(self.reinit_pause_ms);
            match hw.reinitialize() {
                Ok(()) => {
                    outcome = RecoveryOutcome::Reinitialized { attempts: attempt };
                    break;
                }
                Err(e) => warn!("Sensor re-init attempt {attempt} failed: {e}"),
            }
        }
        hw.delay_ms(self.settle_ms);

        match outcome {
            RecoveryOutcome::Reinitialized { attempts } => {
                info!("Sensor re-initialised after {attempts} attempt(s)");
            }
            _ => warn!("Sensor still down after {} attempts", self.max_attempts),
        }

        self.in_progress = false;
        outcome
    }

    /// Record a valid reading.  Returns the length of the fault streak it
    /// ended, if any.
    pub fn note_valid(&mut self) -> Option<u32> {
        if self.consecutive_faults == 0 {
            return None;
        }
        let streak = self.consecutive_faults;
        self.consecutive_faults = 0;
        Some(streak)
    }

    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    pub fn total_faults(&self) -> u32 {
        self.total_faults
    }
}
