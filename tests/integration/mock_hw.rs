//! Mock vehicle adapter for integration tests.
//!
//! Records every frame and local output write so tests can assert on the
//! full bus history without a CAN controller.

use mastercell::adapters::memory_store::MemoryRuleStore;
use mastercell::app::events::AppEvent;
use mastercell::app::ports::{
    AuxMessageSource, EventSink, ExternalMessage, InputPort, LocalOutputPort, NeutralSafetyPort, TransportPort,
};
use mastercell::rules::{Destination, Direction, InputId, InputSet, RuleConfig, RuleRecord};

// ── Frame record ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentFrame {
    pub priority: u8,
    pub destination: Destination,
    pub payload: [u8; 8],
}

// ── MockVehicle ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockVehicle {
    pub inputs: InputSet,
    pub ignition: bool,
    pub neutral: bool,
    pub aux: Vec<ExternalMessage>,
    pub frames: Vec<SentFrame>,
    pub outputs: Vec<(u8, bool)>,
    pub neutral_reads: u32,
}

#[allow(dead_code)]
impl MockVehicle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, n: u8, on: bool) {
        self.inputs.set(input(n), on);
    }

    /// Byte 0 of every frame sent to `destination`, oldest first.
    pub fn byte0_history(&self, destination: Destination) -> Vec<u8> {
        self.frames
            .iter()
            .filter(|f| f.destination == destination)
            .map(|f| f.payload[0])
            .collect()
    }

    pub fn last_to(&self, destination: Destination) -> Option<SentFrame> {
        self.frames.iter().rev().find(|f| f.destination == destination).copied()
    }

    pub fn take_frames(&mut self) -> Vec<SentFrame> {
        std::mem::take(&mut self.frames)
    }
}

impl InputPort for MockVehicle {
    fn input_state(&self, input: InputId) -> bool {
        self.inputs.contains(input)
    }

    fn ignition_flag(&self) -> bool {
        self.ignition
    }
}

impl TransportPort for MockVehicle {
    fn transmit(&mut self, priority: u8, destination: Destination, payload: &[u8; 8]) {
        self.frames.push(SentFrame {
            priority,
            destination,
            payload: *payload,
        });
    }
}

impl AuxMessageSource for MockVehicle {
    fn aux_messages(&self) -> &[ExternalMessage] {
        &self.aux
    }
}

impl NeutralSafetyPort for MockVehicle {
    fn neutral_engaged(&mut self) -> bool {
        self.neutral_reads += 1;
        self.neutral
    }
}

impl LocalOutputPort for MockVehicle {
    fn set_local_output(&mut self, channel: u8, on: bool) {
        self.outputs.push((channel, on));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rule image helpers ────────────────────────────────────────

pub fn input(n: u8) -> InputId {
    InputId::new(n).expect("input in range")
}

pub fn payload(byte0: u8) -> [u8; 8] {
    [byte0, 0, 0, 0, 0, 0, 0, 0]
}

/// Builder over a blank rule image.
pub struct ImageBuilder {
    image: MemoryRuleStore,
}

#[allow(dead_code)]
impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            image: MemoryRuleStore::blank(),
        }
    }

    pub fn on(mut self, n: u8, index: u8, record: RuleRecord) -> Self {
        self.put(n, index, Direction::On, &record);
        self
    }

    pub fn off(mut self, n: u8, index: u8, record: RuleRecord) -> Self {
        self.put(n, index, Direction::Off, &record);
        self
    }

    /// First ON rule flagged one-button with `ignition_bit` in byte 0.
    pub fn one_button(self, n: u8, destination: Destination, ignition_bit: u8) -> Self {
        let config = RuleConfig {
            one_button: true,
            ..RuleConfig::default()
        };
        self.on(n, 0, RuleRecord::new(6, destination, payload(ignition_bit)).with_config(config))
    }

    pub fn build(self) -> MemoryRuleStore {
        self.image
    }

    fn put(&mut self, n: u8, index: u8, direction: Direction, record: &RuleRecord) {
        assert!(self.image.put(input(n), index, direction, record), "no slot for input {n} index {index}");
    }
}
