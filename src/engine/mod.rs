//! The rule engine context.
//!
//! [`Engine`] owns every piece of mutable engine state (active rules,
//! pattern timers, last-sent snapshot, one-button latches, input and
//! ignition state) and is passed by reference from the main loop. Nothing
//! here touches hardware; the [`app`](crate::app) layer moves data between
//! ports and the engine.
//!
//! ```text
//!   inputs ──▶ tracker ──▶ pattern timers
//!                 │               │
//!                 ▼               ▼
//!           aggregator ◀── conditions
//!                 │
//!                 ▼
//!               gate ──▶ send list (+ purge one-shot)
//! ```

pub mod aggregator;
pub mod conditions;
pub mod gate;
pub mod one_button;
pub mod pattern;
pub mod tracker;

use log::{info, warn};

use crate::app::ports::{ExternalMessage, RuleStoragePort};
use crate::config::EngineConfig;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::error::{CapacityError, Result};
use crate::rules::{InputId, InputSet, RuleStore};

use aggregator::AggregatedTable;
use gate::{BroadcastReason, SendList, TransmissionGate};
use one_button::{OneButtonAction, OneButtonPool};
use pattern::PatternScheduler;
use tracker::ActiveRules;

pub struct Engine<S> {
    store: RuleStore<S>,
    rules: ActiveRules,
    patterns: PatternScheduler,
    gate: TransmissionGate,
    one_button: OneButtonPool,
    /// Inputs whose first ON rule is flagged one-button, read once at start.
    one_button_inputs: InputSet,
    /// Ordinary inputs whose first ON rule marks them as ignition sources.
    ignition_inputs: InputSet,
    inputs: InputSet,
    ignition: bool,
    aux_priority: u8,
    destination_drops: u32,
    manual_failures: u32,
}

impl<S: RuleStoragePort> Engine<S> {
    pub fn new(storage: S, config: &EngineConfig) -> Self {
        let mut store = RuleStore::new(storage);
        let one_button_inputs: InputSet = InputId::all().filter(|&i| store.is_one_button_input(i)).collect();
        if one_button_inputs.bits() != 0 {
            info!("one-button inputs: {:#013x}", one_button_inputs.bits());
        }
        let ignition_inputs: InputSet = InputId::all()
            .filter(|&i| !one_button_inputs.contains(i) && store.is_ignition_input(i))
            .collect();
        if ignition_inputs.bits() != 0 {
            info!("ignition inputs: {:#013x}", ignition_inputs.bits());
        }

        Self {
            store,
            rules: ActiveRules::new(),
            patterns: PatternScheduler::new(),
            gate: TransmissionGate::new(),
            one_button: OneButtonPool::new(config.quick_press_ms, config.starter_delay_ms),
            one_button_inputs,
            ignition_inputs,
            inputs: InputSet::empty(),
            ignition: false,
            aux_priority: config.aux_default_priority,
            destination_drops: 0,
            manual_failures: 0,
        }
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Record a debounced input edge. Ordinary inputs swap their rule
    /// sets; one-button inputs are left to [`poll_one_button`].
    ///
    /// [`poll_one_button`]: Self::poll_one_button
    pub fn on_input_transition(&mut self, input: InputId, on: bool) {
        self.inputs.set(input, on);
        if self.one_button_inputs.contains(input) {
            return;
        }
        self.rules
            .on_input_transition(&mut self.store, &mut self.patterns, input, on);
    }

    /// Run the one-button machine for `input` and apply its rule edit.
    pub fn poll_one_button(&mut self, input: InputId, now_ms: u32, neutral: bool) -> Option<(OneButtonAction, Result<()>)> {
        let pressed = self.inputs.contains(input);
        // a refused press is counted in the pool
        let action = self.one_button.update(input, pressed, now_ms, neutral).ok().flatten()?;
        let result = match action {
            OneButtonAction::SetManual { ignition, starter } => self.set_manual_rule(input, ignition, starter),
            OneButtonAction::ClearManual => {
                self.clear_manual_rule(input);
                Ok(())
            }
        };
        Some((action, result))
    }

    pub fn set_manual_rule(&mut self, input: InputId, ignition_on: bool, starter_on: bool) -> Result<()> {
        let result = self.rules.set_manual_rule(
            &mut self.store,
            &mut self.patterns,
            input,
            ignition_on,
            starter_on,
        );
        if let Err(e) = result {
            self.manual_failures = self.manual_failures.saturating_add(1);
            warn!("{}: manual rule rejected: {}", input, e);
        }
        result
    }

    pub fn clear_manual_rule(&mut self, input: InputId) {
        self.rules
            .clear_manual_rule(&mut self.store, &mut self.patterns, input);
    }

    // ── Ignition ──────────────────────────────────────────────

    /// Combine the external ignition flag, the ignition inputs and the
    /// one-button latches. Rebuilds ignition-tracking rules and returns the
    /// new level when the combined flag changed.
    pub fn refresh_ignition(&mut self, external: bool) -> Option<bool> {
        let ignition =
            external || self.inputs.intersects(self.ignition_inputs) || self.one_button.any_ignition();
        if ignition == self.ignition {
            return None;
        }
        self.ignition = ignition;
        self.rebuild_track_ignition();
        Some(ignition)
    }

    /// Re-apply the current ignition level to ignition-tracking rules.
    pub fn rebuild_track_ignition(&mut self) {
        self.rules.rebuild_track_ignition(&mut self.store, self.ignition);
    }

    // ── Pattern tick and broadcast ────────────────────────────

    pub fn pattern_tick(&mut self) {
        self.patterns.tick();
    }

    /// Aggregate the active rules with `external` messages.
    pub fn aggregate(&mut self, external: &[ExternalMessage]) -> AggregatedTable {
        let table = aggregator::aggregate(
            &self.rules,
            &self.patterns,
            self.inputs,
            self.ignition,
            external,
            self.aux_priority,
        );
        self.destination_drops = self.destination_drops.saturating_add(table.dropped());
        table
    }

    /// Messages due for `reason`. Call [`complete_broadcast`] once they
    /// have been handed to the transport.
    ///
    /// [`complete_broadcast`]: Self::complete_broadcast
    pub fn prepare_broadcast(&mut self, reason: BroadcastReason, external: &[ExternalMessage]) -> SendList {
        let mut table = self.aggregate(external);
        self.gate.select_for_send(&mut table, reason)
    }

    /// Record what was sent and drop one-shot rules.
    ///
    /// One-shot rules are purged even when the snapshot refused a
    /// destination; the refusal is returned for the caller to report.
    pub fn complete_broadcast(&mut self, sent: &[AggregatedMessage]) -> core::result::Result<(), CapacityError> {
        let recorded = self.gate.record_sent(sent);
        self.rules.purge_one_shot();
        recorded
    }

    /// Everything currently aggregated, used for the startup broadcast.
    pub fn prepare_full_broadcast(&mut self, external: &[ExternalMessage]) -> SendList {
        self.aggregate(external).iter().copied().collect()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn inputs(&self) -> InputSet {
        self.inputs
    }

    pub fn ignition(&self) -> bool {
        self.ignition
    }

    pub fn is_one_button_input(&self, input: InputId) -> bool {
        self.one_button_inputs.contains(input)
    }

    pub fn one_button_inputs(&self) -> InputSet {
        self.one_button_inputs
    }

    pub fn rules(&self) -> &ActiveRules {
        &self.rules
    }

    pub fn patterns(&self) -> &PatternScheduler {
        &self.patterns
    }

    pub fn gate(&self) -> &TransmissionGate {
        &self.gate
    }

    pub fn one_button(&self) -> &OneButtonPool {
        &self.one_button
    }

    pub fn store(&self) -> &RuleStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RuleStore<S> {
        &mut self.store
    }

    /// Engine-owned counters; transport counters are filled in by the caller.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            store_reads: self.store.reads(),
            bounds_errors: self.store.bounds_errors(),
            active_rule_overflows: self.rules.overflows(),
            clearing_drops: self.rules.clearing_drops(),
            destination_drops: self.destination_drops,
            snapshot_drops: self.gate.dropped(),
            one_button_overflows: self.one_button.overflows(),
            manual_rule_failures: self.manual_failures,
            active_rules: self.rules.len() as u16,
            armed_patterns: self.patterns.armed_count() as u16,
            ignition: self.ignition,
            ..DiagnosticsSnapshot::default()
        }
    }
}

pub use aggregator::AggregatedMessage;
