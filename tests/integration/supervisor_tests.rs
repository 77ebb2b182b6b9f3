//! Supervisor against recording mocks: commands, the control cycle,
//! capture and monitor logging, and sensor fault handling.

use crate::mock_hw::{HwCall, LinkLine, MockLink, MockRig, RecordingSink};

use thermoloop::app::commands::Command;
use thermoloop::app::events::AppEvent;
use thermoloop::app::supervisor::Supervisor;
use thermoloop::config::SystemConfig;
use thermoloop::control::pid::ControllerState;
use thermoloop::fsm::StateId;
use thermoloop::safety::RecoveryOutcome;
use thermoloop::serial::{CommandSlot, Line};

const PERIOD: u32 = 100;

struct Bench {
    sup: Supervisor,
    hw: MockRig,
    link: MockLink,
    sink: RecordingSink,
}

impl Bench {
    fn with_config(config: SystemConfig, reading: f32) -> Self {
        let mut bench = Self {
            sup: Supervisor::new(config, 0).unwrap(),
            hw: MockRig::new(reading),
            link: MockLink::new(),
            sink: RecordingSink::new(),
        };
        bench
            .sup
            .start(&mut bench.hw, &mut bench.link, &mut bench.sink);
        bench
    }

    fn new(reading: f32) -> Self {
        Self::with_config(SystemConfig::default(), reading)
    }

    fn command(&mut self, cmd: Command, now_ms: u32) {
        self.sup
            .handle_command(cmd, now_ms, &mut self.hw, &mut self.link, &mut self.sink);
    }

    fn run(&mut self, now_ms: u32) {
        self.sup
            .run_due_tasks(now_ms, &mut self.hw, &mut self.link, &mut self.sink);
    }

    /// Run control ticks `first..=last` (tick n at n * PERIOD).
    fn run_ticks(&mut self, first: u32, last: u32) {
        for n in first..=last {
            self.run(n * PERIOD);
        }
    }
}

fn line(text: &str) -> Line {
    let mut l = Line::new();
    l.push_str(text).unwrap();
    l
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boots_idle_with_heater_driven() {
    let bench = Bench::new(25.0);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert!(bench.hw.output_enabled);
    assert!(bench.sink.contains(&AppEvent::Started(StateId::Idle)));
    assert_eq!(bench.link.headers(), 0);
}

#[test]
fn boot_without_heating_runs_no_pid() {
    let config = SystemConfig {
        heat_on_boot: false,
        ..SystemConfig::default()
    };
    let mut bench = Bench::with_config(config, 25.0);
    assert!(!bench.hw.output_enabled);

    bench.run_ticks(1, 10);
    assert_eq!(bench.hw.reads(), 10);
    assert_eq!(bench.sup.control_updates(), 0);
    assert_eq!(bench.sup.last_reading(), Some(25.0));
}

#[test]
fn first_control_tick_matches_hand_computed_output() {
    let mut bench = Bench::new(25.0);
    bench.run(PERIOD);
    // P = 300, I = 0.03, D = 600.
    assert!((bench.sup.last_actuation() - 900.03).abs() < 1e-2);
    assert_eq!(bench.hw.last_duty(), Some(900));
    assert_eq!(bench.sup.control_updates(), 1);
}

#[test]
fn large_error_saturates_without_touching_integral() {
    let mut bench = Bench::new(10.0);
    bench.run(PERIOD);
    assert_eq!(bench.hw.last_duty(), Some(1000));
    let state = bench.sup.controller_state();
    assert_eq!(state.integral, 0.0);
    assert_eq!(state.prev_error, 18.0);
}

#[test]
fn control_runs_only_when_timer_is_due() {
    let mut bench = Bench::new(25.0);
    for now in 0..1000 {
        bench.run(now);
    }
    assert_eq!(bench.hw.reads(), 9);
}

// ── Capture ───────────────────────────────────────────────────

#[test]
fn capture_logs_target_plus_margin_then_stops() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(10), 0);
    assert_eq!(bench.sup.state(), StateId::Capturing);
    assert_eq!(
        bench.link.lines[..2],
        [LinkLine::Text("OK capture 10\r\n".into()), LinkLine::Header]
    );

    bench.run_ticks(1, 59);
    assert_eq!(bench.sup.state(), StateId::Capturing);

    bench.run(60 * PERIOD);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert_eq!(bench.sup.last_actuation(), 0.0);
    assert!(!bench.hw.output_enabled);
    assert_eq!(bench.hw.last_duty(), Some(0));
    assert_eq!(bench.sup.controller_state(), ControllerState::default());

    let samples = bench.link.samples();
    assert_eq!(samples.len(), 60);
    assert_eq!(samples[0], (100, 25.0));
    assert_eq!(samples[59], (6000, 25.0));
    assert!(bench.sink.contains(&AppEvent::CaptureComplete { samples: 60 }));
    assert!(bench.sink.contains(&AppEvent::ModeChanged {
        from: StateId::Capturing,
        to: StateId::Idle,
    }));

    // Nothing more is logged and the heater stays off.
    let reads = bench.hw.reads();
    bench.run_ticks(61, 100);
    assert_eq!(bench.link.samples().len(), 60);
    assert_eq!(bench.hw.reads(), reads + 40);
    assert!(!bench.hw.output_enabled);
}

#[test]
fn restarting_capture_resets_progress_and_header() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(100), 0);
    bench.run_ticks(1, 30);
    assert_eq!(bench.sup.capture_progress().elapsed, 30);

    bench.command(Command::StartCapture(5), 3000);
    assert_eq!(bench.sup.capture_progress().elapsed, 0);
    assert_eq!(bench.sup.capture_progress().target, 5);
    assert_eq!(bench.link.headers(), 2);

    bench.run_ticks(31, 85);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert_eq!(bench.link.samples().len(), 30 + 55);
}

#[test]
fn capture_progresses_when_the_link_is_down() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(0), 0);
    bench.link.fail_writes = true;
    bench.run_ticks(1, 50);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert!(bench.link.samples().is_empty());
}

// ── Stop ──────────────────────────────────────────────────────

#[test]
fn stop_forces_floor_and_disables_output() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(500), 0);
    bench.run_ticks(1, 5);
    assert!(bench.hw.last_duty().unwrap() > 0);

    bench.command(Command::Stop, 550);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert_eq!(bench.sup.last_actuation(), 0.0);
    assert_eq!(bench.hw.last_duty(), Some(0));
    assert_eq!(bench.hw.calls.last(), Some(&HwCall::Disable));
    assert_eq!(bench.sup.controller_state(), ControllerState::default());
    assert_eq!(bench.link.texts().last(), Some(&"OK stop\r\n"));

    let writes = bench.hw.duty_writes().len();
    bench.run_ticks(6, 20);
    assert_eq!(bench.hw.duty_writes().len(), writes);
    assert_eq!(bench.link.samples().len(), 5);
}

#[test]
fn stop_while_idle_still_resets() {
    let mut bench = Bench::new(25.0);
    bench.run_ticks(1, 3);
    assert_ne!(bench.sup.controller_state(), ControllerState::default());

    bench.command(Command::Stop, 350);
    assert_eq!(bench.sup.controller_state(), ControllerState::default());
    assert!(!bench.hw.output_enabled);
}

// ── Monitor ───────────────────────────────────────────────────

#[test]
fn monitor_logs_last_reading_at_its_own_period() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartMonitor, 1000);
    assert_eq!(bench.sup.state(), StateId::Monitoring);
    assert_eq!(bench.link.headers(), 1);

    bench.run_ticks(10, 110);
    let stamps: Vec<u32> = bench.link.samples().iter().map(|s| s.0).collect();
    assert_eq!(stamps, vec![1000, 6000, 11_000]);
    // Only the control task reads the sensor.
    assert_eq!(bench.hw.reads(), 101);
}

#[test]
fn monitor_uses_the_last_good_reading() {
    let mut bench = Bench::new(25.0);
    bench.hw.queue(&[26.5]);
    bench.run(PERIOD);
    bench.hw.steady_reading = -99.0;

    bench.command(Command::StartMonitor, 150);
    bench.run(150);
    assert_eq!(bench.link.samples(), vec![(150, 26.5)]);
}

#[test]
fn repeated_monitor_is_a_noop() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartMonitor, 0);
    bench.command(Command::StartMonitor, 10);
    assert_eq!(bench.link.headers(), 1);
    assert_eq!(bench.link.texts(), vec!["OK monitor\r\n", "OK monitor\r\n"]);
}

#[test]
fn monitor_cancels_capture() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(10), 0);
    bench.run_ticks(1, 3);
    bench.command(Command::StartMonitor, 350);
    bench.run_ticks(4, 20);
    // Three capture samples plus the immediate monitor sample at 400.
    assert_eq!(bench.link.samples().len(), 4);
    assert_eq!(bench.sup.state(), StateId::Monitoring);
}

#[test]
fn capture_while_monitoring_replaces_the_monitor_log() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartMonitor, 0);
    bench.run_ticks(0, 50);
    assert_eq!(bench.link.samples(), vec![(5000, 25.0)]);
    assert_ne!(bench.sup.controller_state(), ControllerState::default());

    bench.command(Command::StartCapture(10), 5050);
    assert_eq!(bench.sup.state(), StateId::Capturing);
    assert_eq!(bench.sup.controller_state(), ControllerState::default());
    assert_eq!(bench.link.headers(), 2);
    assert_eq!(bench.link.texts().last(), Some(&"OK capture 10\r\n"));
    assert!(bench.sink.contains(&AppEvent::ModeChanged {
        from: StateId::Monitoring,
        to: StateId::Capturing,
    }));

    // The monitor timer still fires at 10000 but writes nothing.
    bench.run_ticks(51, 120);
    assert_eq!(bench.sup.state(), StateId::Idle);
    let samples = bench.link.samples();
    let stamps: Vec<u32> = samples[1..].iter().map(|s| s.0).collect();
    let expected: Vec<u32> = (51..=110).map(|n| n * PERIOD).collect();
    assert_eq!(stamps, expected);
}

#[test]
fn stop_from_monitoring_ends_the_monitor_log() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartMonitor, 0);
    bench.run_ticks(0, 50);
    assert_eq!(bench.link.samples().len(), 1);

    bench.command(Command::Stop, 5050);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert_eq!(bench.sup.last_actuation(), 0.0);
    assert_eq!(bench.hw.last_duty(), Some(0));
    assert_eq!(bench.hw.calls.last(), Some(&HwCall::Disable));
    assert!(!bench.hw.output_enabled);
    assert_eq!(bench.sup.controller_state(), ControllerState::default());
    assert!(bench.sink.contains(&AppEvent::ModeChanged {
        from: StateId::Monitoring,
        to: StateId::Idle,
    }));

    let writes = bench.hw.duty_writes().len();
    bench.run_ticks(51, 200);
    assert_eq!(bench.link.samples().len(), 1);
    assert_eq!(bench.hw.duty_writes().len(), writes);
}

// ── Setpoint and echo ─────────────────────────────────────────

#[test]
fn setpoint_changes_in_any_mode() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(10), 0);
    bench.command(Command::SetSetpoint(30.5), 10);
    assert_eq!(bench.sup.setpoint(), 30.5);
    assert_eq!(bench.sup.state(), StateId::Capturing);
    assert_eq!(bench.link.texts().last(), Some(&"OK yr 30.50\r\n"));
    assert!(bench.sink.contains(&AppEvent::SetpointChanged {
        from: 28.0,
        to: 30.5,
    }));
}

#[test]
fn unrecognized_line_is_echoed() {
    let mut bench = Bench::new(25.0);
    let mut slot = CommandSlot::new();
    let (mut producer, mut inbox) = slot.split();
    for &b in b"foo123\n" {
        producer.on_byte(b);
    }

    bench.sup.poll(
        0,
        &mut inbox,
        &mut bench.hw,
        &mut bench.link,
        &mut bench.sink,
    );
    assert_eq!(bench.link.texts(), vec!["foo123\r\n"]);
    assert!(bench.sink.contains(&AppEvent::Echoed(line("foo123"))));
    assert_eq!(bench.sup.state(), StateId::Idle);
}

// ── Command intake ────────────────────────────────────────────

#[test]
fn poll_takes_one_command_per_iteration() {
    let mut bench = Bench::new(25.0);
    let mut slot = CommandSlot::new();
    let (mut producer, mut inbox) = slot.split();

    for &b in b"/monitor\n" {
        producer.on_byte(b);
    }
    bench.sup.poll(
        10,
        &mut inbox,
        &mut bench.hw,
        &mut bench.link,
        &mut bench.sink,
    );
    assert_eq!(bench.sup.state(), StateId::Monitoring);

    bench.sup.poll(
        20,
        &mut inbox,
        &mut bench.hw,
        &mut bench.link,
        &mut bench.sink,
    );
    assert_eq!(bench.link.texts(), vec!["OK monitor\r\n"]);
}

#[test]
fn newest_unconsumed_line_wins() {
    let mut bench = Bench::new(25.0);
    let mut slot = CommandSlot::new();
    let (mut producer, mut inbox) = slot.split();

    for &b in b"/monitor\n/safeData: 3\n" {
        producer.on_byte(b);
    }
    bench.sup.poll(
        0,
        &mut inbox,
        &mut bench.hw,
        &mut bench.link,
        &mut bench.sink,
    );
    assert_eq!(bench.sup.state(), StateId::Capturing);
    assert_eq!(bench.sup.capture_progress().target, 3);
}

#[test]
fn first_poll_starts_the_supervisor() {
    let mut sup = Supervisor::new(SystemConfig::default(), 0).unwrap();
    let mut hw = MockRig::new(25.0);
    let mut link = MockLink::new();
    let mut sink = RecordingSink::new();
    let mut slot = CommandSlot::new();
    let (_producer, mut inbox) = slot.split();

    sup.poll(0, &mut inbox, &mut hw, &mut link, &mut sink);
    sup.poll(1, &mut inbox, &mut hw, &mut link, &mut sink);
    let starts = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::Started(_)))
        .count();
    assert_eq!(starts, 1);
    assert!(hw.output_enabled);
}

// ── Sensor faults ─────────────────────────────────────────────

#[test]
fn fault_tick_skips_the_whole_cycle() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(10), 0);
    bench.run(PERIOD);

    let updates = bench.sup.control_updates();
    let pid = bench.sup.controller_state();
    let progress = bench.sup.capture_progress();
    let samples = bench.link.samples().len();

    bench.hw.queue(&[-99.0]);
    bench.hw.calls.clear();
    bench.run(2 * PERIOD);

    assert_eq!(bench.sup.control_updates(), updates);
    assert_eq!(bench.sup.controller_state(), pid);
    assert_eq!(bench.sup.capture_progress(), progress);
    assert_eq!(bench.link.samples().len(), samples);
    assert_eq!(bench.hw.duty_writes().len(), 0);
    assert_eq!(
        bench.hw.calls,
        vec![
            HwCall::Read,
            HwCall::Shutdown,
            HwCall::Delay(10),
            HwCall::Reinit,
            HwCall::Delay(50),
        ]
    );
    assert!(bench.sink.contains(&AppEvent::SensorFault {
        raw: -99.0,
        recovery: RecoveryOutcome::Reinitialized { attempts: 1 },
    }));

    bench.run(3 * PERIOD);
    assert_eq!(bench.sup.control_updates(), updates + 1);
    assert_eq!(bench.link.samples().len(), samples + 1);
    assert!(bench
        .sink
        .contains(&AppEvent::SensorRecovered { after_faults: 1 }));
}

#[test]
fn implausible_and_nan_readings_are_faults() {
    let mut bench = Bench::new(25.0);
    bench.hw.queue(&[f32::NAN, 400.0, -90.0]);
    bench.run_ticks(1, 3);
    assert_eq!(bench.sup.control_updates(), 0);
    assert_eq!(bench.sup.last_reading(), None);
    assert_eq!(bench.sup.status().total_faults, 3);

    bench.run(4 * PERIOD);
    assert_eq!(bench.sup.control_updates(), 1);
    assert!(bench
        .sink
        .contains(&AppEvent::SensorRecovered { after_faults: 3 }));
}

#[test]
fn dead_sensor_is_retried_every_cycle_without_stalling() {
    let mut bench = Bench::new(-99.0);
    bench.hw.reinit_fails = true;
    bench.run_ticks(1, 5);
    assert_eq!(bench.hw.count(&HwCall::Reinit), 5 * 3);
    assert_eq!(bench.hw.count(&HwCall::Delay(50)), 5);
    assert_eq!(bench.sup.status().consecutive_faults, 5);
    assert_eq!(bench.sup.control_updates(), 0);
    assert!(bench.sink.contains(&AppEvent::SensorFault {
        raw: -99.0,
        recovery: RecoveryOutcome::Failed { attempts: 3 },
    }));
}

#[test]
fn monitor_skips_the_tick_whose_read_faulted() {
    let mut bench = Bench::new(25.0);
    bench.run_ticks(1, 10);
    bench.command(Command::StartMonitor, 1000);
    bench.run(1000);
    assert_eq!(bench.link.samples(), vec![(1000, 25.0)]);

    // Control and monitor are both due at 6000; the read faults.
    bench.run_ticks(11, 59);
    bench.hw.steady_reading = -99.0;
    bench.run(6000);
    assert_eq!(bench.link.samples(), vec![(1000, 25.0)]);
    assert_eq!(bench.sup.last_reading(), None);

    bench.hw.steady_reading = 25.0;
    bench.run_ticks(61, 110);
    assert_eq!(bench.link.samples(), vec![(1000, 25.0), (11_000, 25.0)]);
}

#[test]
fn dead_sensor_silences_the_monitor_until_a_good_read() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartMonitor, 0);
    bench.run_ticks(0, 50);
    assert_eq!(bench.link.samples(), vec![(5000, 25.0)]);

    bench.hw.steady_reading = -99.0;
    bench.hw.reinit_fails = true;
    bench.run_ticks(51, 300);
    assert_eq!(bench.link.samples(), vec![(5000, 25.0)]);
    assert_eq!(bench.sup.status().consecutive_faults, 250);
    assert_eq!(bench.sup.state(), StateId::Monitoring);

    bench.hw.steady_reading = 25.5;
    bench.hw.reinit_fails = false;
    bench.run_ticks(301, 350);
    assert_eq!(bench.link.samples(), vec![(5000, 25.0), (35_000, 25.5)]);
    assert!(bench
        .sink
        .contains(&AppEvent::SensorRecovered { after_faults: 250 }));
}

#[test]
fn fault_during_capture_does_not_advance_it() {
    let mut bench = Bench::new(25.0);
    bench.command(Command::StartCapture(0), 0);
    bench.hw.queue(&[25.0, -99.0, -99.0]);
    bench.run_ticks(1, 50);
    // 50 ticks, 2 of them faulty: 48 samples, capture still running.
    assert_eq!(bench.sup.state(), StateId::Capturing);
    assert_eq!(bench.link.samples().len(), 48);
    bench.run_ticks(51, 52);
    assert_eq!(bench.sup.state(), StateId::Idle);
    assert_eq!(bench.link.samples().len(), 50);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_is_emitted_every_monitor_period() {
    let mut bench = Bench::new(25.0);
    bench.run_ticks(1, 100);
    let reports: Vec<_> = bench
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].mode, StateId::Idle);
    assert_eq!(reports[0].last_reading_c, Some(25.0));
    assert_eq!(reports[1].control_updates, 100);
    // Idle writes no CSV.
    assert!(bench.link.samples().is_empty());
}
