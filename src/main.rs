//! thermoloop host simulation.
//!
//! Runs the controller against a simulated heater block: operator lines
//! are read from stdin, CSV samples and acknowledgements go to stdout,
//! the operator log goes to stderr.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                      │
//! │                                                              │
//! │  SimulatedRig        CsvLogger       LogEventSink            │
//! │  (Sensor+Actuator)   (Transport)     (EventSink)             │
//! │  MonotonicClock      stdin reader ─▶ CommandSlot             │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            Supervisor (pure logic)                     │  │
//! │  │  Scheduler · FSM · PID · FaultRecovery                 │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `thermoloop [--config FILE] [--fault-every N] [--run-for MS]`

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use thermoloop::adapters::csv_logger::CsvLogger;
use thermoloop::adapters::hardware::SimulatedRig;
use thermoloop::adapters::log_sink::LogEventSink;
use thermoloop::adapters::time::MonotonicClock;
use thermoloop::app::ports::Clock;
use thermoloop::app::supervisor::Supervisor;
use thermoloop::config::SystemConfig;
use thermoloop::sensors::thermal_model::ThermalModel;
use thermoloop::serial::{CommandSlot, LineProducer};

/// Main loop pause between iterations.
const LOOP_PAUSE: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct Args {
    config_path: Option<String>,
    fault_every: Option<u32>,
    run_for_ms: Option<u32>,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => {
                result.config_path = Some(value.context("--config needs a path")?.clone());
                i += 1;
            }
            "--fault-every" => {
                let n = value.context("--fault-every needs a count")?;
                result.fault_every = Some(n.parse().with_context(|| format!("bad count {n:?}"))?);
                i += 1;
            }
            "--run-for" => {
                let ms = value.context("--run-for needs milliseconds")?;
                result.run_for_ms = Some(ms.parse().with_context(|| format!("bad duration {ms:?}"))?);
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?} (try --help)"),
        }
        i += 1;
    }

    Ok(result)
}

fn print_help() {
    println!("thermoloop - PWM heater controller (host simulation)");
    println!();
    println!("USAGE:");
    println!("    thermoloop [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>      JSON configuration (missing fields use defaults)");
    println!("        --fault-every <N>    make every N-th sensor read fail");
    println!("        --run-for <MS>       exit after MS milliseconds");
    println!("    -h, --help               print this help");
    println!();
    println!("COMMANDS (stdin):");
    println!("    /set yr: <C>   /safeData[: N]   /monitor   /stop");
}

fn load_config(path: Option<&str>) -> Result<SystemConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {path}"))?
        }
        None => SystemConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Feed stdin into the command slot.  Waits for each line to be taken so
/// piped scripts are not collapsed to their last line.
fn pump_stdin(mut producer: LineProducer<'static>) {
    let stdin = std::io::stdin();
    for byte in stdin.lock().bytes() {
        let Ok(byte) = byte else { break };
        if producer.on_byte(byte) {
            while producer.is_pending() {
                std::thread::sleep(LOOP_PAUSE);
            }
        }
    }
    info!("stdin closed, no further commands");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let args = parse_args()?;
    let config = load_config(args.config_path.as_deref())?;
    info!(
        "thermoloop starting: period {}ms, setpoint {:.2} C, gains kp={} ki={} kd={}",
        config.control_period_ms, config.initial_setpoint_c, config.kp, config.ki, config.kd
    );

    let clock = MonotonicClock::new();
    let mut rig = SimulatedRig::new(&config, ThermalModel::default());
    if let Some(n) = args.fault_every {
        warn!("Simulating a sensor fault every {n} reads");
        rig.fail_every(n);
    }
    let mut link = CsvLogger::new(std::io::stdout());
    let mut sink = LogEventSink::new();
    let mut supervisor = Supervisor::new(config, clock.now_ms())?;

    // The slot lives for the whole process; the reader thread may still be
    // blocked on stdin when the loop exits.
    let slot: &'static mut CommandSlot = Box::leak(Box::new(CommandSlot::new()));
    let (producer, mut inbox) = slot.split();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || pump_stdin(producer))
        .context("spawning stdin reader")?;

    loop {
        let now = clock.now_ms();
        if args.run_for_ms.is_some_and(|limit| now >= limit) {
            break;
        }
        rig.advance(now);
        supervisor.poll(now, &mut inbox, &mut rig, &mut link, &mut sink);
        std::thread::sleep(LOOP_PAUSE);
    }

    let status = supervisor.status();
    info!(
        "thermoloop stopping in {:?} after {} control updates, {} sensor faults",
        status.mode, status.control_updates, status.total_faults
    );
    Ok(())
}
