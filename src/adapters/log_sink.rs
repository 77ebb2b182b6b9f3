//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one `TAG | key=value` line per
//! application event through the `log` facade.  On the host this lands on
//! stderr via `env_logger`, leaving stdout to the CSV stream.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::safety::RecoveryOutcome;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | mode={:?} | y={} r={:.2}C | u={:.1} heater={} | \
                     capture={}/{} | faults={}/{} | updates={}",
                    t.mode,
                    t.last_reading_c
                        .map_or_else(|| "--".into(), |v| format!("{v:.2}C")),
                    t.setpoint_c,
                    t.last_actuation,
                    if t.heater_enabled { "on" } else { "off" },
                    t.capture.elapsed,
                    t.capture.target,
                    t.consecutive_faults,
                    t.total_faults,
                    t.control_updates,
                );
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {:?} -> {:?}", from, to);
            }
            AppEvent::SetpointChanged { from, to } => {
                info!("SETPOINT | {:.2} -> {:.2}", from, to);
            }
            AppEvent::SensorFault { raw, recovery } => match recovery {
                RecoveryOutcome::Reinitialized { attempts } => {
                    warn!("FAULT | sensor raw={:.2} reinit=ok attempts={}", raw, attempts);
                }
                RecoveryOutcome::Failed { attempts } => {
                    warn!("FAULT | sensor raw={:.2} reinit=failed attempts={}", raw, attempts);
                }
                RecoveryOutcome::Skipped => {
                    warn!("FAULT | sensor raw={:.2} reinit=skipped", raw);
                }
            },
            AppEvent::SensorRecovered { after_faults } => {
                info!("FAULT | sensor recovered after={}", after_faults);
            }
            AppEvent::CaptureComplete { samples } => {
                info!("CAPTURE | complete samples={}", samples);
            }
            AppEvent::Echoed(text) => {
                info!("ECHO | {:?}", text.as_str());
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}
