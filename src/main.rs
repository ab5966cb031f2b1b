//! MasterCell host simulator.
//!
//! Runs the rule engine against a dumped rule image with a scripted set of
//! input changes and logs every frame that would go on the bus.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  SimVehicle (InputPort · AuxMessageSource · NeutralSafety) │
//! │  LogTransport (TransportPort · LocalOutputPort)            │
//! │  LogEventSink (EventSink)                                  │
//! │                                                            │
//! │  ─────────────── Port Trait Boundary ───────────────       │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────┐      │
//! │  │     EngineService (tracker · aggregator · gate)  │      │
//! │  └──────────────────────────────────────────────────┘      │
//! │                                                            │
//! │  TickSource (1 ms) ──▶ SIGNALS ──▶ main loop               │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Script lines are `<ms> <target> <on|off>` where target is an input
//! number (0-43), `ign` or `neutral`. `#` starts a comment.
//!
//! ```bash
//! mastercell-sim --image front_engine.bin --script turn_and_brake.txt -d 4000
//! ```
#![deny(unused_must_use)]

use std::cell::Cell;
use std::convert::Infallible;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use embedded_hal::digital::{ErrorType, InputPin};
use log::info;

use mastercell::adapters::log_sink::LogEventSink;
use mastercell::adapters::log_transport::LogTransport;
use mastercell::adapters::memory_store::MemoryRuleStore;
use mastercell::adapters::pin_input::PinNeutralSafety;
use mastercell::app::ports::{
    AuxMessageSource, ExternalMessage, InputPort, LocalOutputPort, NeutralSafetyPort, TransportPort,
};
use mastercell::app::service::EngineService;
use mastercell::config::EngineConfig;
use mastercell::events::{SIGNALS, TickSource};
use mastercell::rules::{Destination, InputId, InputSet};

/// MasterCell rule engine simulator
#[derive(Parser, Debug)]
#[command(name = "mastercell-sim")]
#[command(version)]
#[command(about = "Run the MasterCell rule engine against a rule image on the host")]
struct Args {
    /// 4096-byte rule store image (EEPROM dump). Blank store if omitted.
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// JSON engine configuration. Defaults if omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scripted input changes.
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Simulated run time in milliseconds.
    #[arg(short, long, default_value_t = 5000)]
    duration_ms: u32,

    /// Frames kept in the transmit history.
    #[arg(long, default_value_t = 256)]
    history: usize,
}

// ── Script ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Target {
    Input(InputId),
    Ignition,
    Neutral,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    at_ms: u32,
    target: Target,
    on: bool,
}

fn parse_script(text: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (n, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [at, target, level] = fields[..] else {
            bail!("line {}: expected `<ms> <target> <on|off>`", n + 1);
        };
        let at_ms = at.parse().with_context(|| format!("line {}: bad time", n + 1))?;
        let target = match target {
            "ign" => Target::Ignition,
            "neutral" => Target::Neutral,
            num => {
                let number: u8 = num.parse().with_context(|| format!("line {}: bad input", n + 1))?;
                match InputId::new(number) {
                    Some(input) => Target::Input(input),
                    None => bail!("line {}: input {} out of range", n + 1, number),
                }
            }
        };
        let on = match level {
            "on" | "1" => true,
            "off" | "0" => false,
            other => bail!("line {}: bad level `{}`", n + 1, other),
        };
        steps.push(Step { at_ms, target, on });
    }
    steps.sort_by_key(|s| s.at_ms);
    Ok(steps)
}

// ── Simulated vehicle ─────────────────────────────────────────

/// GPIO level set by the script. High until something pulls it down.
#[derive(Clone)]
struct ScriptPin(Rc<Cell<bool>>);

impl ErrorType for ScriptPin {
    type Error = Infallible;
}

impl InputPin for ScriptPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

struct SimVehicle {
    inputs: InputSet,
    ignition: bool,
    /// Neutral switch pulls the pin low, as on the module harness.
    neutral_pin: ScriptPin,
    neutral: PinNeutralSafety<ScriptPin>,
    aux: Vec<ExternalMessage>,
    bus: LogTransport,
}

impl SimVehicle {
    fn new(history: usize) -> Self {
        let neutral_pin = ScriptPin(Rc::new(Cell::new(true)));
        Self {
            inputs: InputSet::empty(),
            ignition: false,
            neutral: PinNeutralSafety::new(neutral_pin.clone(), true),
            neutral_pin,
            aux: Vec::new(),
            bus: LogTransport::new(history),
        }
    }

    fn apply(&mut self, step: Step) {
        match step.target {
            Target::Input(input) => self.inputs.set(input, step.on),
            Target::Ignition => self.ignition = step.on,
            Target::Neutral => self.neutral_pin.0.set(!step.on),
        }
    }
}

impl InputPort for SimVehicle {
    fn input_state(&self, input: InputId) -> bool {
        self.inputs.contains(input)
    }

    fn ignition_flag(&self) -> bool {
        self.ignition
    }
}

impl TransportPort for SimVehicle {
    fn transmit(&mut self, priority: u8, destination: Destination, payload: &[u8; 8]) {
        self.bus.transmit(priority, destination, payload);
    }
}

impl AuxMessageSource for SimVehicle {
    fn aux_messages(&self) -> &[ExternalMessage] {
        &self.aux
    }
}

impl NeutralSafetyPort for SimVehicle {
    fn neutral_engaged(&mut self) -> bool {
        self.neutral.neutral_engaged()
    }
}

impl LocalOutputPort for SimVehicle {
    fn set_local_output(&mut self, channel: u8, on: bool) {
        self.bus.set_local_output(channel, on);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("MasterCell simulator v{}", env!("CARGO_PKG_VERSION"));

    let store = match &args.image {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            MemoryRuleStore::from_bytes(&bytes).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?
        }
        None => MemoryRuleStore::blank(),
    };

    let config = match &args.config {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_json(&bytes).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?
        }
        None => EngineConfig::default(),
    };

    let steps = match &args.script {
        Some(path) => parse_script(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let mut vehicle = SimVehicle::new(args.history);
    let mut sink = LogEventSink::new();
    let mut ticks = TickSource::new(config.pattern_tick_ms, config.heartbeat_ms);
    let scan_ms = config.scan_interval_ms;
    let mut service = EngineService::new(store, config);

    // Steps at time zero describe the power-up state.
    let mut pending = steps.into_iter().peekable();
    while let Some(step) = pending.next_if(|s| s.at_ms == 0) {
        vehicle.apply(step);
    }
    service.start(0, &mut vehicle, &mut sink);

    for _ in 0..args.duration_ms {
        ticks.advance(1, &SIGNALS);
        let now = ticks.uptime_ms();
        while let Some(step) = pending.next_if(|s| s.at_ms <= now) {
            vehicle.apply(step);
        }
        if now % scan_ms == 0 {
            service.scan(now, &mut vehicle, &SIGNALS, &mut sink);
        }
        service.run_pending(&SIGNALS, &mut vehicle, &mut sink);
    }

    let frames = vehicle.bus.history().count();
    info!(
        "{} frames in history, {} heartbeats, {} neutral read errors",
        frames,
        sink.heartbeats(),
        vehicle.neutral.read_errors()
    );
    let json = service
        .diagnostics()
        .to_json()
        .map_err(|e| anyhow::anyhow!("diagnostics: {}", e))?;
    println!("{}", json);
    Ok(())
}
