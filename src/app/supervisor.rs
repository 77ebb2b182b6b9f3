//! Supervisor: the hexagonal core of the controller.
//!
//! [`Supervisor`] owns the mode FSM, the PID controller, the fault
//! recovery sequencer and the software timers.  One call to
//! [`Supervisor::poll`] is one iteration of the main loop:
//!
//! ```text
//!  LineConsumer ──▶ (a) at most one command ──▶ FSM transition + ack
//!                                                       │
//!  now_ms ────────▶ (b) control timer due? ─────────────┤
//!                       read ─▶ fault? ─▶ recover, skip │
//!                         │                             │
//!                         └─▶ PID ─▶ PWM ─▶ CSV (capture) ─▶ FSM tick
//!                                                       │
//!                   (c) monitor timer due? ─▶ CSV last reading (monitor)
//! ```
//!
//! All I/O goes through port traits passed in at the call site, so the
//! whole loop runs against mocks in tests.  `hw` satisfies both
//! [`SensorPort`] and [`ActuatorPort`] (plus [`DelayNs`] for recovery
//! pauses), which avoids a double mutable borrow of the board.

use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use heapless::String;
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::control::pid::{ControllerState, PidController};
use crate::error::{Error, Result};
use crate::fsm::context::{CaptureProgress, SupervisorContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Entry, Fsm, ModeChange, StateId};
use crate::safety::{FaultRecovery, ReadingStatus};
use crate::scheduler::Scheduler;
use crate::serial::LineConsumer;

use super::commands::Command;
use super::events::{AppEvent, StatusReport};
use super::ports::{ActuatorPort, EventSink, SchedulerDelegate, SensorPort, TaskKind, TransportPort};

/// Capacity of one acknowledgement or echo line, terminator included.
const REPLY_CAPACITY: usize = 64;

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

pub struct Supervisor {
    scheduler: Scheduler,
    core: ControlCore,
    started: bool,
}

/// Everything the timer callbacks mutate.  Kept apart from the scheduler
/// so a cycle can borrow both at once.
struct ControlCore {
    config: SystemConfig,
    fsm: Fsm,
    ctx: SupervisorContext,
    pid: PidController,
    recovery: FaultRecovery,
    control_updates: u32,
}

impl Supervisor {
    /// Validate `config` and build the controller.  Timers start counting
    /// at `now_ms`.
    ///
    /// Does **not** touch the hardware; [`start`](Self::start) (or the
    /// first [`poll`](Self::poll)) does.
    pub fn new(config: SystemConfig, now_ms: u32) -> Result<Self> {
        config.validate()?;
        let pid = PidController::new(config.controller_parameters()?);

        let mut scheduler = Scheduler::new();
        scheduler
            .add("control", TaskKind::ControlUpdate, config.control_period_ms, now_ms)
            .ok_or(Error::Config("no scheduler slot for the control task"))?;
        scheduler
            .add("monitor", TaskKind::MonitorLog, config.monitor_period_ms, now_ms)
            .ok_or(Error::Config("no scheduler slot for the monitor task"))?;

        let ctx = SupervisorContext::new(&config);
        let recovery = FaultRecovery::from_config(&config);
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Ok(Self {
            scheduler,
            core: ControlCore {
                config,
                fsm,
                ctx,
                pid,
                recovery,
                control_updates: 0,
            },
            started: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter Idle and apply the boot heater policy.  Idempotent.
    pub fn start<H, L, S>(&mut self, hw: &mut H, link: &mut L, sink: &mut S)
    where
        H: ActuatorPort,
        L: TransportPort,
        S: EventSink,
    {
        if self.started {
            return;
        }
        self.started = true;

        let core = &mut self.core;
        core.fsm.start(&mut core.ctx);
        core.ctx.commands.heater_enabled = core.config.heat_on_boot;
        core.apply_outputs(hw, link);

        let state = core.fsm.current_state();
        sink.emit(&AppEvent::Started(state));
        info!(
            "Supervisor started in {:?}, setpoint {:.2} C, heater {}",
            state,
            core.ctx.setpoint_c,
            if core.config.heat_on_boot { "on" } else { "off" }
        );
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// One main-loop iteration: take at most one command, then run every
    /// task whose timer is due at `now_ms`.
    pub fn poll<H, L, S>(
        &mut self,
        now_ms: u32,
        inbox: &mut LineConsumer<'_>,
        hw: &mut H,
        link: &mut L,
        sink: &mut S,
    ) where
        H: SensorPort + ActuatorPort + DelayNs,
        L: TransportPort,
        S: EventSink,
    {
        self.start(hw, link, sink);

        if let Some(cmd) = inbox.try_take() {
            self.handle_command(cmd, now_ms, hw, link, sink);
        }

        self.run_due_tasks(now_ms, hw, link, sink);
    }

    /// Poll the software timers and run what is due, in slot order
    /// (control before monitor).
    pub fn run_due_tasks<H, L, S>(&mut self, now_ms: u32, hw: &mut H, link: &mut L, sink: &mut S)
    where
        H: SensorPort + ActuatorPort + DelayNs,
        L: TransportPort,
        S: EventSink,
    {
        let mut dispatch = CycleDispatch {
            core: &mut self.core,
            hw,
            link,
            sink,
        };
        self.scheduler.tick(now_ms, &mut dispatch);
    }

    /// Apply one operator command and acknowledge it on `link`.
    pub fn handle_command<H, L, S>(
        &mut self,
        cmd: Command,
        now_ms: u32,
        hw: &mut H,
        link: &mut L,
        sink: &mut S,
    ) where
        H: ActuatorPort,
        L: TransportPort,
        S: EventSink,
    {
        let core = &mut self.core;

        let change = match cmd {
            Command::SetSetpoint(value) => {
                let previous = core.ctx.setpoint_c;
                core.ctx.setpoint_c = value;
                info!("Setpoint {:.2} -> {:.2} C", previous, value);
                sink.emit(&AppEvent::SetpointChanged {
                    from: previous,
                    to: value,
                });
                send_line(link, format_args!("OK yr {value:.2}"));
                return;
            }
            Command::StartCapture(samples) => {
                send_line(link, format_args!("OK capture {samples}"));
                core.ctx.capture = CaptureProgress::new(samples);
                core.fsm
                    .request(StateId::Capturing, Entry::Restart, &mut core.ctx)
            }
            Command::Stop => {
                send_line(link, format_args!("OK stop"));
                core.fsm.request(StateId::Idle, Entry::Restart, &mut core.ctx)
            }
            Command::StartMonitor => {
                send_line(link, format_args!("OK monitor"));
                let change = core
                    .fsm
                    .request(StateId::Monitoring, Entry::KeepCurrent, &mut core.ctx);
                if change.is_some() {
                    self.scheduler.expire(TaskKind::MonitorLog, now_ms);
                }
                change
            }
            Command::Unrecognized(text) => {
                debug!("Unrecognized line {:?}, echoing", text.as_str());
                send_line(link, format_args!("{}", text.as_str()));
                sink.emit(&AppEvent::Echoed(text));
                return;
            }
        };

        if let Some(change) = change {
            self.core.settle_mode_change(change, hw, link, sink);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.core.fsm.current_state()
    }

    pub fn setpoint(&self) -> f32 {
        self.core.ctx.setpoint_c
    }

    /// PID updates performed since boot.
    pub fn control_updates(&self) -> u32 {
        self.core.control_updates
    }

    pub fn controller_state(&self) -> ControllerState {
        self.core.pid.state()
    }

    pub fn capture_progress(&self) -> CaptureProgress {
        self.core.ctx.capture
    }

    pub fn last_actuation(&self) -> f32 {
        self.core.ctx.last_actuation
    }

    pub fn last_reading(&self) -> Option<f32> {
        self.core.ctx.last_reading_c
    }

    pub fn heater_enabled(&self) -> bool {
        self.core.ctx.commands.heater_enabled
    }

    pub fn config(&self) -> &SystemConfig {
        &self.core.config
    }

    pub fn status(&self) -> StatusReport {
        self.core.status()
    }
}

// ───────────────────────────────────────────────────────────────
// Timer dispatch
// ───────────────────────────────────────────────────────────────

/// Borrows the core and the ports for the duration of one scheduler tick.
struct CycleDispatch<'a, H, L, S> {
    core: &'a mut ControlCore,
    hw: &'a mut H,
    link: &'a mut L,
    sink: &'a mut S,
}

impl<H, L, S> SchedulerDelegate for CycleDispatch<'_, H, L, S>
where
    H: SensorPort + ActuatorPort + DelayNs,
    L: TransportPort,
    S: EventSink,
{
    fn on_task_due(&mut self, _label: &str, kind: TaskKind, now_ms: u32) {
        match kind {
            TaskKind::ControlUpdate => {
                self.core
                    .run_control_cycle(now_ms, self.hw, self.link, self.sink);
            }
            TaskKind::MonitorLog => self.core.run_monitor_log(now_ms, self.link, self.sink),
        }
    }
}

impl ControlCore {
    /// Read → fault policy or PID → PWM → capture log → FSM update.
    fn run_control_cycle<H, L, S>(&mut self, now_ms: u32, hw: &mut H, link: &mut L, sink: &mut S)
    where
        H: SensorPort + ActuatorPort + DelayNs,
        L: TransportPort,
        S: EventSink,
    {
        let reading = match self.recovery.classify(hw.read_temperature()) {
            ReadingStatus::Valid(t) => t,
            ReadingStatus::Fault(raw) => {
                warn!("Sensor fault: read {raw:.2} C, skipping control cycle");
                self.ctx.last_reading_c = None;
                let recovery = self.recovery.recover(hw);
                sink.emit(&AppEvent::SensorFault { raw, recovery });
                return;
            }
        };

        if let Some(after_faults) = self.recovery.note_valid() {
            info!("Sensor recovered after {after_faults} faulty cycle(s)");
            sink.emit(&AppEvent::SensorRecovered { after_faults });
        }
        self.ctx.last_reading_c = Some(reading);

        if self.ctx.commands.heater_enabled {
            let u = self.pid.update(self.ctx.setpoint_c, reading);
            self.ctx.last_actuation = u;
            self.control_updates = self.control_updates.wrapping_add(1);
            if let Err(e) = hw.set_duty(to_duty(u)) {
                warn!("PWM write failed: {e}");
            }
        }

        if self.fsm.current_state() == StateId::Capturing {
            if let Err(e) = link.log_sample(now_ms, reading) {
                warn!("Capture sample not logged: {e}");
            }
        }

        debug!(
            "t={}ms y={:.2} r={:.2} u={:.1}",
            now_ms, reading, self.ctx.setpoint_c, self.ctx.last_actuation
        );

        if let Some(change) = self.fsm.on_sample(&mut self.ctx) {
            if change.from == StateId::Capturing {
                sink.emit(&AppEvent::CaptureComplete {
                    samples: self.ctx.capture.elapsed,
                });
            }
            self.settle_mode_change(change, hw, link, sink);
        }
    }

    /// Apply the outputs a transition asked for and report it.
    fn settle_mode_change<H, L, S>(&mut self, change: ModeChange, hw: &mut H, link: &mut L, sink: &mut S)
    where
        H: ActuatorPort,
        L: TransportPort,
        S: EventSink,
    {
        self.apply_outputs(hw, link);
        sink.emit(&AppEvent::ModeChanged {
            from: change.from,
            to: change.to,
        });
    }

    /// Telemetry always; in Monitoring, a CSV line of the last good reading
    /// unless the most recent control read faulted.
    fn run_monitor_log<L, S>(&mut self, now_ms: u32, link: &mut L, sink: &mut S)
    where
        L: TransportPort,
        S: EventSink,
    {
        sink.emit(&AppEvent::Telemetry(self.status()));

        if self.fsm.current_state() != StateId::Monitoring {
            return;
        }
        match self.ctx.last_reading_c {
            Some(t) => {
                if let Err(e) = link.log_sample(now_ms, t) {
                    warn!("Monitor sample not logged: {e}");
                }
            }
            None => debug!("Monitor: no valid reading since the last fault"),
        }
    }

    /// Push the FSM's output directives to the heater and the log.
    fn apply_outputs<H, L>(&mut self, hw: &mut H, link: &mut L)
    where
        H: ActuatorPort,
        L: TransportPort,
    {
        let commands = &mut self.ctx.commands;

        if commands.reset_controller {
            self.pid.reset();
        }

        if commands.heater_enabled {
            hw.enable_output();
        } else {
            let floor = self.config.output_min;
            self.ctx.last_actuation = floor;
            if let Err(e) = hw.set_duty(to_duty(floor)) {
                warn!("PWM write failed: {e}");
            }
            hw.disable_output();
        }

        if commands.write_header {
            if let Err(e) = link.log_header() {
                warn!("CSV header not sent: {e}");
            }
        }

        commands.clear_pulses();
    }

    fn status(&self) -> StatusReport {
        StatusReport {
            mode: self.fsm.current_state(),
            setpoint_c: self.ctx.setpoint_c,
            last_reading_c: self.ctx.last_reading_c,
            last_actuation: self.ctx.last_actuation,
            heater_enabled: self.ctx.commands.heater_enabled,
            capture: self.ctx.capture,
            consecutive_faults: self.recovery.consecutive_faults(),
            total_faults: self.recovery.total_faults(),
            control_updates: self.control_updates,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────

/// Controller units to the PWM compare value.
fn to_duty(u: f32) -> u16 {
    u.round().clamp(0.0, f32::from(u16::MAX)) as u16
}

/// Format one reply line, append `\r\n` and transmit it.
fn send_line<L: TransportPort>(link: &mut L, args: fmt::Arguments<'_>) {
    let mut buf: String<REPLY_CAPACITY> = String::new();
    if buf.write_fmt(args).is_err() || buf.push_str("\r\n").is_err() {
        warn!("Reply does not fit {REPLY_CAPACITY} bytes, dropped");
        return;
    }
    if let Err(e) = link.transmit(&buf) {
        warn!("Reply not sent: {e}");
    }
}
