//! Mode handler functions and table builder.
//!
//! ```text
//!            StartCapture(N)                 StartMonitor
//!   IDLE ───────────────────▶ CAPTURING ───────────────────▶ MONITORING
//!    ▲  ◀──[elapsed >= N+margin]──┘                              │
//!    │                                                           │
//!    └──────────────────────────── Stop ◀────────────────────────┘
//!
//!   Stop from any mode re-enters IDLE.  StartCapture from any mode
//!   (including CAPTURING) restarts the capture.
//! ```

use super::context::SupervisorContext;
use super::{StateDescriptor, StateId};
use log::info;

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_sample: stay,
        },
        // Index 1: Capturing
        StateDescriptor {
            id: StateId::Capturing,
            name: "Capturing",
            on_enter: Some(capturing_enter),
            on_exit: Some(capturing_exit),
            on_sample: capturing_sample,
        },
        // Index 2: Monitoring
        StateDescriptor {
            id: StateId::Monitoring,
            name: "Monitoring",
            on_enter: Some(monitoring_enter),
            on_exit: None,
            on_sample: stay,
        },
    ]
}

/// Idle and Monitoring only leave on a command.
fn stay(_ctx: &mut SupervisorContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut SupervisorContext) {
    ctx.commands.heater_enabled = false;
    ctx.commands.reset_controller = true;
    info!("IDLE: heater off, logging stopped");
}

// ═══════════════════════════════════════════════════════════════════════════
//  CAPTURING: every control sample is logged
// ═══════════════════════════════════════════════════════════════════════════

fn capturing_enter(ctx: &mut SupervisorContext) {
    ctx.capture.elapsed = 0;
    ctx.commands.heater_enabled = true;
    ctx.commands.reset_controller = true;
    ctx.commands.write_header = true;
    info!(
        "CAPTURING: {} samples (+{} margin) toward {:.2} C",
        ctx.capture.target, ctx.capture_safety_margin, ctx.setpoint_c
    );
}

fn capturing_exit(ctx: &mut SupervisorContext) {
    info!(
        "CAPTURING: stopped after {}/{} samples",
        ctx.capture.elapsed,
        ctx.capture.limit(ctx.capture_safety_margin)
    );
}

fn capturing_sample(ctx: &mut SupervisorContext) -> Option<StateId> {
    ctx.capture.elapsed = ctx.capture.elapsed.saturating_add(1);
    if ctx.capture_finished() {
        return Some(StateId::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  MONITORING: low-rate logging, no end condition
// ═══════════════════════════════════════════════════════════════════════════

fn monitoring_enter(ctx: &mut SupervisorContext) {
    ctx.commands.heater_enabled = true;
    ctx.commands.write_header = true;
    info!("MONITORING: logging at the monitor period");
}
