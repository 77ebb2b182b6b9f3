//! Software timers and the cooperative task scheduler.
//!
//! Every periodic behaviour is a [`SoftwareTimer`] compared against one
//! monotonic millisecond counter.  Nothing sleeps: the scheduler is polled
//! once per loop iteration and notifies a [`SchedulerDelegate`] for each
//! task whose timer has elapsed.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  now_ms (u32, wrapping)                                      │
//! │      │                                                       │
//! │      ▼                                                       │
//! │  ┌──────────────┐  ┌──────────────┐                          │
//! │  │ ControlUpdate│  │ MonitorLog   │   one SoftwareTimer each │
//! │  │ 100 ms       │  │ 5000 ms      │                          │
//! │  └──────┬───────┘  └──────┬───────┘                          │
//! │         ▼                 ▼                                  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  │       (supervisor runs the control cycle / logs)       │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Elapsed time is `now.wrapping_sub(last_fired)`, which stays correct
//! across the 49.7-day wrap of a `u32` millisecond counter.

use crate::app::ports::{SchedulerDelegate, TaskKind};
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════
//  Software timer
// ═══════════════════════════════════════════════════════════════

/// Fixed-period timer driven by tick comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareTimer {
    period_ms: u32,
    last_fired_ms: u32,
}

impl SoftwareTimer {
    /// A timer whose first fire is one period after `now_ms`.
    pub const fn new(period_ms: u32, now_ms: u32) -> Self {
        Self {
            period_ms,
            last_fired_ms: now_ms,
        }
    }

    /// Milliseconds since the last fire.
    pub fn elapsed(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_fired_ms)
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        self.elapsed(now_ms) >= self.period_ms
    }

    /// Fire if due, resetting the reference tick to `now_ms`.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if self.is_due(now_ms) {
            self.last_fired_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Make the timer due immediately.
    pub fn expire(&mut self, now_ms: u32) {
        self.last_fired_ms = now_ms.wrapping_sub(self.period_ms);
    }

}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of periodic tasks (stack-allocated).
const MAX_TASKS: usize = 4;

/// One periodic task.
#[derive(Debug, Clone)]
struct TaskEntry {
    label: &'static str,
    kind: TaskKind,
    timer: SoftwareTimer,
}

/// The scheduler engine.
///
/// Decoupled from the control logic: due tasks are reported to a
/// [`SchedulerDelegate`], which keeps the timer bookkeeping testable on
/// its own.
pub struct Scheduler {
    tasks: [Option<TaskEntry>; MAX_TASKS],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: [None, None, None, None],
        }
    }

    /// Add a task.  Returns the slot index, or `None` if full.
    pub fn add(
        &mut self,
        label: &'static str,
        kind: TaskKind,
        period_ms: u32,
        now_ms: u32,
    ) -> Option<usize> {
        for (i, slot) in self.tasks.iter_mut().enumerate() {
            if slot.is_none() {
                info!("Scheduler: added '{}' every {}ms at slot {}", label, period_ms, i);
                *slot = Some(TaskEntry {
                    label,
                    kind,
                    timer: SoftwareTimer::new(period_ms, now_ms),
                });
                return Some(i);
            }
        }
        None // All slots full.
    }

    /// Make every task of `kind` due on the next [`tick`](Self::tick).
    pub fn expire(&mut self, kind: TaskKind, now_ms: u32) {
        for entry in self.tasks.iter_mut().flatten() {
            if entry.kind == kind {
                entry.timer.expire(now_ms);
            }
        }
    }

    /// Poll all timers against `now_ms`.  Each due task fires at most once
    /// per call, in slot order.
    pub fn tick(&mut self, now_ms: u32, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.tasks.iter_mut().flatten() {
            if entry.timer.poll(now_ms) {
                debug!("Scheduler: '{}' due at {}ms", entry.label, now_ms);
                delegate.on_task_due(entry.label, entry.kind, now_ms);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
