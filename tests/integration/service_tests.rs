//! Integration tests for the EngineService → ports pipeline.
//!
//! Every test runs the real scan / signal / broadcast loop against the
//! mock vehicle and asserts on the frames that reached the bus.

use mastercell::adapters::memory_store::MemoryRuleStore;
use mastercell::app::events::AppEvent;
use mastercell::app::ports::ExternalMessage;
use mastercell::app::service::EngineService;
use mastercell::config::EngineConfig;
use mastercell::events::{Signal, SignalFlags};
use mastercell::rules::{Destination, RuleConfig, RuleRecord};

use crate::mock_hw::{ImageBuilder, MockVehicle, RecordingSink, payload};

const LIGHTS: Destination = Destination::new(0xFF01, 0x1E);
const STARTER: Destination = Destination::new(0xFF02, 0x1E);
const FUEL: Destination = Destination::new(0xFF04, 0x1E);

struct Rig {
    svc: EngineService<MemoryRuleStore>,
    car: MockVehicle,
    sink: RecordingSink,
    flags: SignalFlags,
    now: u32,
}

impl Rig {
    fn start(image: ImageBuilder, car: MockVehicle) -> Self {
        let mut rig = Self {
            svc: EngineService::new(image.build(), EngineConfig::default()),
            car,
            sink: RecordingSink::new(),
            flags: SignalFlags::new(),
            now: 0,
        };
        rig.svc.start(0, &mut rig.car, &mut rig.sink);
        rig
    }

    /// One scan followed by whatever it raised.
    fn step(&mut self, advance_ms: u32) {
        self.now += advance_ms;
        self.svc.scan(self.now, &mut self.car, &self.flags, &mut self.sink);
        self.svc.run_pending(&self.flags, &mut self.car, &mut self.sink);
    }

    fn pattern_tick(&mut self) {
        self.flags.raise(Signal::PatternTick);
        self.svc.run_pending(&self.flags, &mut self.car, &mut self.sink);
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn startup_broadcasts_inputs_already_on() {
    let mut car = MockVehicle::new();
    car.set(0, true);
    car.set(6, true);
    let rig = Rig::start(
        ImageBuilder::new()
            .on(0, 0, RuleRecord::new(3, LIGHTS, payload(0x01)))
            .one_button(6, STARTER, 0x02),
        car,
    );

    // the held one-button input is not activated at startup
    assert_eq!(rig.car.frames.len(), 1);
    assert_eq!(rig.car.frames[0].priority, 3);
    assert_eq!(rig.car.frames[0].destination, LIGHTS);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::Started { active_inputs: 1, broadcast: 1 })),
        1
    );
}

#[test]
fn startup_snapshot_suppresses_repeat() {
    let mut car = MockVehicle::new();
    car.set(0, true);
    let mut rig = Rig::start(ImageBuilder::new().on(0, 0, RuleRecord::new(6, LIGHTS, payload(0x01))), car);
    rig.car.take_frames();

    rig.flags.raise(Signal::StateChange);
    rig.step(10);
    assert!(rig.car.frames.is_empty());
}

// ── Transitions ───────────────────────────────────────────────

#[test]
fn input_cycle_sends_value_then_clearing_frame() {
    let mut rig = Rig::start(
        ImageBuilder::new().on(0, 0, RuleRecord::new(6, LIGHTS, payload(0x01))),
        MockVehicle::new(),
    );

    rig.car.set(0, true);
    rig.step(10);
    rig.car.set(0, false);
    rig.step(10);
    rig.step(10);

    assert_eq!(rig.car.byte0_history(LIGHTS), [0x01, 0x00]);
    assert!(rig.svc.engine().rules().is_empty());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::InputChanged { .. })),
        2
    );
}

#[test]
fn flashing_rule_refreshes_on_every_pattern_tick() {
    let mut rig = Rig::start(
        ImageBuilder::new().on(0, 0, RuleRecord::new(6, LIGHTS, payload(0x01)).with_pattern(1, 1)),
        MockVehicle::new(),
    );

    rig.car.set(0, true);
    rig.step(10);
    for _ in 0..4 {
        rig.pattern_tick();
    }

    assert_eq!(rig.car.byte0_history(LIGHTS), [0x01, 0x01, 0x00, 0x01, 0x00]);
}

#[test]
fn steady_rule_is_silent_on_pattern_tick() {
    let mut rig = Rig::start(
        ImageBuilder::new().on(0, 0, RuleRecord::new(6, LIGHTS, payload(0x01))),
        MockVehicle::new(),
    );
    rig.car.set(0, true);
    rig.step(10);
    rig.car.take_frames();

    rig.pattern_tick();
    assert!(rig.car.frames.is_empty());
}

// ── One-button start ──────────────────────────────────────────

#[test]
fn one_button_start_sequence() {
    let mut rig = Rig::start(ImageBuilder::new().one_button(6, STARTER, 0x02), MockVehicle::new());
    rig.car.neutral = true;

    rig.car.set(6, true);
    rig.step(10);
    assert_eq!(rig.car.last_to(STARTER).map(|f| f.payload[0]), Some(0x02));
    assert!(rig.svc.engine().ignition());

    // hold past the starter delay
    for _ in 0..100 {
        rig.step(10);
    }
    assert_eq!(rig.car.last_to(STARTER).map(|f| f.payload[0]), Some(0x03));

    rig.car.set(6, false);
    rig.step(10);
    assert_eq!(rig.car.byte0_history(STARTER), [0x02, 0x03, 0x02]);
    assert!(rig.svc.engine().ignition());

    // neutral is only read while the button is held
    let reads = rig.car.neutral_reads;
    rig.step(10);
    assert_eq!(rig.car.neutral_reads, reads);
}

#[test]
fn one_button_without_neutral_never_cranks() {
    let mut rig = Rig::start(ImageBuilder::new().one_button(6, STARTER, 0x02), MockVehicle::new());
    rig.car.set(6, true);
    for _ in 0..200 {
        rig.step(10);
    }
    assert_eq!(rig.car.byte0_history(STARTER), [0x02]);
}

#[test]
fn one_button_ignition_drives_tracked_rules() {
    let tracked = RuleConfig {
        track_ignition: true,
        ..RuleConfig::default()
    };
    let mut rig = Rig::start(
        ImageBuilder::new()
            .one_button(6, STARTER, 0x02)
            .on(20, 0, RuleRecord::new(6, FUEL, payload(0x08)).with_config(tracked)),
        MockVehicle::new(),
    );

    rig.car.set(6, true);
    rig.step(10);
    rig.car.set(6, false);
    rig.step(10);
    assert_eq!(rig.car.byte0_history(FUEL), [0x08]);

    rig.car.set(6, true);
    rig.step(10);
    rig.car.set(6, false);
    rig.step(10);
    assert_eq!(rig.car.byte0_history(FUEL), [0x08, 0x00]);
    assert_eq!(rig.car.last_to(STARTER).map(|f| f.payload[0]), Some(0x00));
    assert!(!rig.svc.engine().ignition());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::IgnitionChanged(_))),
        2
    );
}

#[test]
fn rejected_manual_rule_is_reported() {
    let mut rig = Rig::start(ImageBuilder::new().one_button(6, STARTER, 0x0C), MockVehicle::new());
    rig.car.set(6, true);
    rig.step(10);

    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ManualRuleFailed { .. })),
        1
    );
    assert!(rig.car.last_to(STARTER).is_none());
    assert_eq!(rig.svc.diagnostics().manual_rule_failures, 1);
}

// ── External ignition and auxiliary messages ─────────────────

#[test]
fn external_ignition_loads_and_clears_tracked_rules() {
    let tracked = RuleConfig {
        track_ignition: true,
        ..RuleConfig::default()
    };
    let mut rig = Rig::start(
        ImageBuilder::new()
            .on(20, 0, RuleRecord::new(6, FUEL, payload(0x08)).with_config(tracked))
            .on(21, 0, RuleRecord::new(6, FUEL, payload(0x10)).with_config(tracked)),
        MockVehicle::new(),
    );

    rig.car.ignition = true;
    rig.step(10);
    rig.car.ignition = false;
    rig.step(10);
    rig.step(10);

    assert_eq!(rig.car.byte0_history(FUEL), [0x18, 0x00]);
}

#[test]
fn aux_messages_merge_with_default_priority() {
    let mut rig = Rig::start(
        ImageBuilder::new().on(0, 0, RuleRecord::new(3, LIGHTS, payload(0x01))),
        MockVehicle::new(),
    );
    let wipers = Destination::new(0xFF10, 0x21);
    rig.car.aux.push(ExternalMessage {
        destination: wipers,
        payload: payload(0x40),
    });
    rig.car.aux.push(ExternalMessage {
        destination: LIGHTS,
        payload: payload(0x80),
    });
    rig.car.set(0, true);
    rig.step(10);

    let lights = rig.car.last_to(LIGHTS).unwrap();
    assert_eq!((lights.priority, lights.payload[0]), (3, 0x81));
    let w = rig.car.last_to(wipers).unwrap();
    assert_eq!((w.priority, w.payload[0]), (6, 0x40));

    // unchanged aux contents do not trigger another broadcast
    rig.car.take_frames();
    rig.step(10);
    assert!(rig.car.frames.is_empty());
}

// ── Heartbeat ─────────────────────────────────────────────────

#[test]
fn heartbeat_reports_diagnostics() {
    let mut rig = Rig::start(
        ImageBuilder::new().on(0, 0, RuleRecord::new(6, LIGHTS, payload(0x01))),
        MockVehicle::new(),
    );
    rig.car.set(0, true);
    rig.step(10);
    rig.flags.raise(Signal::Heartbeat);
    rig.step(10);

    let beat = rig.sink.events.iter().find_map(|e| match e {
        AppEvent::Heartbeat(d) => Some(*d),
        _ => None,
    });
    let d = beat.expect("heartbeat emitted");
    assert_eq!(d.uptime_ms, 20);
    // the lights frame and the heartbeat frame itself
    assert_eq!(d.frames_sent, 2);
    assert_eq!(d.active_rules, 1);
    assert_eq!(d.fault_count(), 0);
}

#[test]
fn heartbeat_frame_carries_ignition_from_an_input() {
    let switch = RuleRecord::new(6, LIGHTS, payload(0x01)).with_config(RuleConfig {
        sets_ignition: true,
        ..RuleConfig::default()
    });
    let mut rig = Rig::start(ImageBuilder::new().on(1, 0, switch), MockVehicle::new());
    let status = Destination::new(0xFF00, 0x80);

    rig.flags.raise(Signal::Heartbeat);
    rig.step(10);
    assert_eq!(rig.car.byte0_history(status), [0x00]);

    rig.car.set(1, true);
    rig.step(10);
    assert!(rig.svc.engine().ignition());
    rig.flags.raise(Signal::Heartbeat);
    rig.step(10);

    let beat = rig.car.last_to(status).unwrap();
    assert_eq!((beat.priority, beat.payload), (6, payload(0x01)));
    assert_eq!(rig.car.byte0_history(status), [0x00, 0x01]);
    // routed to the bus even though it shares the local-output group
    assert!(rig.car.outputs.is_empty());
}

#[test]
fn snapshot_overflow_is_reported() {
    let mut rig = Rig::start(ImageBuilder::new(), MockVehicle::new());
    for n in 0..24u16 {
        rig.car.aux.push(ExternalMessage {
            destination: Destination::new(0xFE00 + n, 0x21),
            payload: payload(0x01),
        });
    }
    rig.step(10);
    assert_eq!(rig.car.frames.len(), 24);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SnapshotFull(_))), 0);

    rig.car.aux.clear();
    rig.car.aux.push(ExternalMessage {
        destination: Destination::new(0xFD00, 0x21),
        payload: payload(0x02),
    });
    rig.step(10);

    assert_eq!(rig.car.byte0_history(Destination::new(0xFD00, 0x21)), [0x02]);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SnapshotFull(_))), 1);
    assert_eq!(rig.svc.diagnostics().snapshot_drops, 1);
}
