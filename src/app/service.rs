//! Engine service, the hexagonal core.
//!
//! [`EngineService`] owns the [`Engine`] and the routing configuration.
//! It exposes a hardware-agnostic API. All I/O flows through port traits
//! injected at call sites, so the whole control loop runs on the host
//! against mock adapters.
//!
//! ```text
//!   InputPort ──▶ ┌──────────────────────────┐ ──▶ TransportPort
//!  AuxMessages ──▶│      EngineService        │ ──▶ LocalOutputPort
//!  NeutralSafety ▶│ tracker · aggregator · gate│ ──▶ EventSink
//!                 └──────────────────────────┘
//! ```
//!
//! The main loop calls [`scan`](EngineService::scan) every scan interval
//! and [`run_pending`](EngineService::run_pending) whenever signals may
//! be pending.

use heapless::Vec;
use log::{debug, info};

use crate::config::EngineConfig;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::engine::gate::{BroadcastReason, SendList};
use crate::engine::{AggregatedMessage, Engine};
use crate::events::{Signal, SignalFlags};
use crate::rules::{Destination, InputId};

use super::events::AppEvent;
use super::ports::{EventSink, ExternalMessage, LocalOutputPort, RuleStoragePort, TransportPort, VehicleIo};

/// Auxiliary messages remembered between scans for change detection.
const MAX_AUX_MESSAGES: usize = 16;

/// Priority of the heartbeat status frame.
const HEARTBEAT_PRIORITY: u8 = 6;

// ───────────────────────────────────────────────────────────────
// EngineService
// ───────────────────────────────────────────────────────────────

pub struct EngineService<S> {
    engine: Engine<S>,
    config: EngineConfig,
    last_aux: Option<Vec<ExternalMessage, MAX_AUX_MESSAGES>>,
    uptime_ms: u32,
    frames_sent: u32,
    local_updates: u32,
}

impl<S: RuleStoragePort> EngineService<S> {
    /// Construct the service. Reads the one-button flags from the store;
    /// call [`start`](Self::start) before the first scan.
    pub fn new(storage: S, config: EngineConfig) -> Self {
        let engine = Engine::new(storage, &config);
        Self {
            engine,
            config,
            last_aux: None,
            uptime_ms: 0,
            frames_sent: 0,
            local_updates: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Activate every input that is already on and broadcast the full
    /// aggregated table once.
    ///
    /// One-button inputs are skipped here; a button held at power-up is
    /// seen as a press on the first scan.
    pub fn start(&mut self, now_ms: u32, io: &mut impl VehicleIo, sink: &mut impl EventSink) {
        self.uptime_ms = now_ms;
        let mut active_inputs = 0u8;
        for input in InputId::all() {
            if self.engine.is_one_button_input(input) || !io.input_state(input) {
                continue;
            }
            self.engine.on_input_transition(input, true);
            active_inputs += 1;
        }

        if let Some(on) = self.engine.refresh_ignition(io.ignition_flag()) {
            sink.emit(&AppEvent::IgnitionChanged(on));
        }
        self.last_aux = Vec::from_slice(io.aux_messages()).ok();

        let all = self.engine.prepare_full_broadcast(io.aux_messages());
        self.send(&all, io);
        if let Err(error) = self.engine.complete_broadcast(&all) {
            sink.emit(&AppEvent::SnapshotFull(error));
        }

        info!(
            "engine started: {} inputs on, {} messages broadcast",
            active_inputs,
            all.len()
        );
        sink.emit(&AppEvent::Started {
            active_inputs,
            broadcast: all.len(),
        });
    }

    // ── Per-scan orchestration ────────────────────────────────

    /// Read inputs, run the one-button machines and recompute ignition.
    /// Raises [`Signal::StateChange`] and returns `true` when anything
    /// that feeds aggregation changed.
    pub fn scan(&mut self, now_ms: u32, io: &mut impl VehicleIo, flags: &SignalFlags, sink: &mut impl EventSink) -> bool {
        self.uptime_ms = now_ms;
        let mut changed = false;

        // 1. Debounced input edges
        let previous = self.engine.inputs();
        for input in InputId::all() {
            let on = io.input_state(input);
            if on == previous.contains(input) {
                continue;
            }
            self.engine.on_input_transition(input, on);
            sink.emit(&AppEvent::InputChanged { input, on });
            changed = true;
        }

        // 2. One-button machines; neutral is sampled only while held
        for input in self.engine.one_button_inputs().iter() {
            let neutral = self.engine.inputs().contains(input) && io.neutral_engaged();
            let Some((action, result)) = self.engine.poll_one_button(input, now_ms, neutral) else {
                continue;
            };
            sink.emit(&AppEvent::OneButton { input, action });
            if let Err(error) = result {
                sink.emit(&AppEvent::ManualRuleFailed { input, error });
            }
            changed = true;
        }

        // 3. Combined ignition flag
        if let Some(on) = self.engine.refresh_ignition(io.ignition_flag()) {
            sink.emit(&AppEvent::IgnitionChanged(on));
            changed = true;
        }

        // 4. Auxiliary bus contents
        let aux = io.aux_messages();
        if self.last_aux.as_deref() != Some(aux) {
            self.last_aux = Vec::from_slice(aux).ok();
            changed = true;
        }

        if changed {
            flags.raise(Signal::StateChange);
        }
        changed
    }

    /// Service every pending signal.
    ///
    /// State changes go first so their one-shot clearing entries are sent
    /// before a pattern-tick broadcast purges them.
    pub fn run_pending(&mut self, flags: &SignalFlags, io: &mut impl VehicleIo, sink: &mut impl EventSink) {
        if flags.take(Signal::StateChange) {
            self.broadcast(BroadcastReason::StateChange, io, sink);
        }
        if flags.take(Signal::PatternTick) {
            self.engine.pattern_tick();
            self.broadcast(BroadcastReason::PatternTick, io, sink);
        }
        if flags.take(Signal::Heartbeat) {
            self.send_heartbeat(io);
            sink.emit(&AppEvent::Heartbeat(self.diagnostics()));
        }
    }

    /// Transmit the status frame. Byte 0 bit 0 carries the combined
    /// ignition flag. Always goes to the bus, even when the heartbeat
    /// group is also the local-output group.
    pub fn send_heartbeat(&mut self, io: &mut impl TransportPort) {
        let destination = Destination::new(self.config.heartbeat_group, self.config.heartbeat_address);
        let payload = [u8::from(self.engine.ignition()) & 0x01, 0, 0, 0, 0, 0, 0, 0];
        io.transmit(HEARTBEAT_PRIORITY, destination, &payload);
        self.frames_sent = self.frames_sent.saturating_add(1);
    }

    /// Aggregate, select and transmit for `reason`.
    pub fn broadcast(&mut self, reason: BroadcastReason, io: &mut impl VehicleIo, sink: &mut impl EventSink) -> usize {
        let due = self.engine.prepare_broadcast(reason, io.aux_messages());
        self.send(&due, io);
        if let Err(error) = self.engine.complete_broadcast(&due) {
            sink.emit(&AppEvent::SnapshotFull(error));
        }
        if !due.is_empty() {
            sink.emit(&AppEvent::Broadcast {
                reason,
                sent: due.len(),
            });
        }
        due.len()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    /// Direct engine access for manual-rule commands and tests.
    pub fn engine_mut(&mut self) -> &mut Engine<S> {
        &mut self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            uptime_ms: self.uptime_ms,
            frames_sent: self.frames_sent,
            local_updates: self.local_updates,
            ..self.engine.diagnostics()
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Route each message to the local outputs or the CAN transport.
    fn send(&mut self, messages: &SendList, io: &mut (impl TransportPort + LocalOutputPort)) {
        for msg in messages {
            if msg.destination.group == self.config.local_output_group {
                self.apply_local(msg, io);
            } else {
                io.transmit(msg.priority, msg.destination, &msg.payload);
                self.frames_sent = self.frames_sent.saturating_add(1);
            }
        }
    }

    fn apply_local(&mut self, msg: &AggregatedMessage, io: &mut impl LocalOutputPort) {
        let byte = msg.payload[usize::from(self.config.local_output_byte & 0x07)];
        for binding in &self.config.local_outputs {
            io.set_local_output(binding.channel, byte & binding.mask != 0);
        }
        self.local_updates = self.local_updates.saturating_add(1);
        debug!("local outputs <- 0x{:02X}", byte);
    }
}
