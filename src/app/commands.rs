//! Inbound operator commands and the line parser.
//!
//! The command set is fixed:
//!
//! | Line               | Command                 |
//! |--------------------|-------------------------|
//! | `/safeData`        | `StartCapture(500)`     |
//! | `/safeData: N`     | `StartCapture(N)`       |
//! | `/stop`            | `Stop`                  |
//! | `/monitor`         | `StartMonitor`          |
//! | `/set yr: <float>` | `SetSetpoint(v)`        |
//! | anything else      | `Unrecognized(text)`    |
//!
//! Matching is exact and case-sensitive.  Parsing never fails: a line that
//! matches nothing (including a known prefix with a bad argument) comes
//! back as `Unrecognized` so the caller can echo it.

use crate::serial::codec::Line;

/// Sample count for a bare `/safeData`.
pub const DEFAULT_CAPTURE_SAMPLES: u32 = 500;

const CAPTURE: &str = "/safeData";
const STOP: &str = "/stop";
const MONITOR: &str = "/monitor";
const SET_SETPOINT: &str = "/set yr:";

/// Commands the serial link can send into the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Change the temperature setpoint (°C).  Valid in every mode.
    SetSetpoint(f32),
    /// Log the next `n` (+ safety margin) control samples.
    StartCapture(u32),
    /// Halt actuation and any capture/monitor.
    Stop,
    /// Unbounded low-rate logging.
    StartMonitor,
    /// Anything else; echoed back verbatim.
    Unrecognized(Line),
}

/// Parse one completed line.
pub fn parse(line: &str) -> Command {
    let text = line
        .strip_suffix('\n')
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line);

    match text {
        CAPTURE => return Command::StartCapture(DEFAULT_CAPTURE_SAMPLES),
        STOP => return Command::Stop,
        MONITOR => return Command::StartMonitor,
        _ => {}
    }

    if let Some(arg) = text.strip_prefix(CAPTURE).and_then(|r| r.strip_prefix(':')) {
        if let Ok(n) = arg.trim().parse::<u32>() {
            return Command::StartCapture(n);
        }
    } else if let Some(arg) = text.strip_prefix(SET_SETPOINT) {
        if let Ok(v) = arg.trim().parse::<f32>() {
            if v.is_finite() {
                return Command::SetSetpoint(v);
            }
        }
    }

    unrecognized(text)
}

fn unrecognized(text: &str) -> Command {
    let mut raw = Line::new();
    for c in text.chars() {
        if raw.push(c).is_err() {
            break;
        }
    }
    Command::Unrecognized(raw)
}
