//! Active-rule tracker.
//!
//! Holds the bounded list of rules currently contributing to aggregation.
//! Input transitions swap an input's ON set for its OFF set (or back) and
//! leave one-shot clearing entries behind so every destination the input
//! was driving receives an explicit all-zero update. The one-button
//! machine and the ignition tracker edit the same list.
//!
//! ```text
//!   transition(input, on)
//!     ├─ collect distinct destinations of the input's current rules
//!     ├─ remove them
//!     ├─ push one one-shot clearing rule per destination
//!     ├─ load ≤8 ON / ≤2 OFF rules from the store
//!     └─ arm or disarm the input's pattern timer
//! ```

use heapless::Vec;
use log::{debug, info, warn};

use crate::app::ports::RuleStoragePort;
use crate::error::{CapacityError, ConfigInconsistency, Result};
use crate::rules::{Destination, Direction, InputId, RuleRecord, RuleStore};

use super::pattern::PatternScheduler;

pub const MAX_ACTIVE_RULES: usize = 64;

/// Distinct destinations collected from one input's rules.
const MAX_CLEARING_PER_INPUT: usize = 8;

/// Destination plus the priority its clearing frame is sent with.
type ClearingKey = (Destination, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveRule {
    /// Owning input; `None` for rules that follow the ignition flag.
    pub input: Option<InputId>,
    pub index: u8,
    pub direction: Direction,
    /// Removed after the next transmission.
    pub one_shot: bool,
    pub record: RuleRecord,
}

impl ActiveRule {
    fn clearing(input: Option<InputId>, (destination, priority): ClearingKey) -> Self {
        Self {
            input,
            index: 0,
            direction: Direction::Off,
            one_shot: true,
            record: RuleRecord::clearing(priority, destination),
        }
    }
}

pub struct ActiveRules {
    rules: Vec<ActiveRule, MAX_ACTIVE_RULES>,
    overflows: u32,
    clearing_drops: u32,
}

impl ActiveRules {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            overflows: 0,
            clearing_drops: 0,
        }
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ActiveRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn for_input(&self, input: InputId) -> impl Iterator<Item = &ActiveRule> {
        self.rules.iter().filter(move |r| r.input == Some(input))
    }

    /// Insertions refused because the list was full.
    pub fn overflows(&self) -> u32 {
        self.overflows
    }

    /// Destinations that got no clearing frame because one input drove
    /// more than `MAX_CLEARING_PER_INPUT` of them.
    pub fn clearing_drops(&self) -> u32 {
        self.clearing_drops
    }

    /// Append `rule`; a full list refuses it and counts the drop.
    pub fn insert(&mut self, rule: ActiveRule) -> core::result::Result<(), CapacityError> {
        if self.rules.push(rule).is_err() {
            self.overflows = self.overflows.saturating_add(1);
            warn!(
                "active-rule list full, dropped rule for {}",
                rule.record.destination
            );
            return Err(CapacityError::ActiveRules);
        }
        Ok(())
    }

    // ── Input transitions ─────────────────────────────────────

    /// Swap `input`'s rule set for the one matching its new state.
    /// Returns the number of stored rules loaded.
    pub fn on_input_transition<S: RuleStoragePort>(
        &mut self,
        store: &mut RuleStore<S>,
        patterns: &mut PatternScheduler,
        input: InputId,
        on: bool,
    ) -> usize {
        let cleared = self.take_input(input);
        self.push_clearing(Some(input), &cleared);

        let direction = Direction::from_state(on);
        let found = store.rules_for(input, direction);
        let mut loaded = 0;
        // timing comes from rule 0, and only if it is actually active
        let mut lead = None;
        for &(index, record) in &found {
            if record.config.track_ignition {
                continue;
            }
            let rule = ActiveRule {
                input: Some(input),
                index,
                direction,
                one_shot: direction == Direction::Off,
                record,
            };
            if self.insert(rule).is_ok() {
                loaded += 1;
                if index == 0 {
                    lead = Some(record);
                }
            }
        }

        match lead {
            Some(r) if on && r.has_pattern() => patterns.arm(input, r.pattern_on, r.pattern_off),
            _ => patterns.disarm(input),
        }

        debug!(
            "{} -> {}: cleared {} destinations, loaded {} rules",
            input,
            if on { "ON" } else { "OFF" },
            cleared.len(),
            loaded
        );
        loaded
    }

    // ── One-button manual rules ───────────────────────────────

    /// Replace `input`'s rules with a single persistent rule whose payload
    /// byte 0 carries only the requested ignition and starter bits.
    ///
    /// Fails without touching the list when the input's first ON rule is
    /// missing, has no single ignition bit, or there is no room.
    pub fn set_manual_rule<S: RuleStoragePort>(
        &mut self,
        store: &mut RuleStore<S>,
        patterns: &mut PatternScheduler,
        input: InputId,
        ignition_on: bool,
        starter_on: bool,
    ) -> Result<()> {
        let mut record = store.first_on_rule(input)?;
        let byte0 = manual_byte(record.payload[0], ignition_on, starter_on)?;

        let owned = self.for_input(input).count();
        if self.rules.len() - owned >= MAX_ACTIVE_RULES {
            self.overflows = self.overflows.saturating_add(1);
            return Err(CapacityError::ActiveRules.into());
        }

        let _ = self.take_input(input);
        patterns.disarm(input);
        record.payload = [byte0, 0, 0, 0, 0, 0, 0, 0];
        self.insert(ActiveRule {
            input: Some(input),
            index: 0,
            direction: Direction::On,
            one_shot: false,
            record,
        })?;
        info!(
            "{} manual rule: ignition={} starter={} (0x{:02X})",
            input, ignition_on, starter_on, byte0
        );
        Ok(())
    }

    /// Drop `input`'s rules and send one clearing frame for its first ON
    /// rule's destination.
    pub fn clear_manual_rule<S: RuleStoragePort>(
        &mut self,
        store: &mut RuleStore<S>,
        patterns: &mut PatternScheduler,
        input: InputId,
    ) {
        let _ = self.take_input(input);
        if let Ok(record) = store.first_on_rule(input) {
            let _ = self.insert(ActiveRule::clearing(Some(input), record.clearing_key()));
        }
        patterns.disarm(input);
        info!("{} manual rule cleared", input);
    }

    // ── Ignition-tracking rules ───────────────────────────────

    /// Re-evaluate every track-ignition rule against the ignition flag.
    pub fn rebuild_track_ignition<S: RuleStoragePort>(&mut self, store: &mut RuleStore<S>, ignition_on: bool) {
        let mut removed: Vec<ClearingKey, MAX_ACTIVE_RULES> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.record.config.track_ignition) {
            push_unique(&mut removed, rule.record.clearing_key());
        }
        self.rules.retain(|r| !r.record.config.track_ignition);

        if !ignition_on {
            self.push_clearing(None, &removed);
            info!("ignition off: cleared {} tracked destinations", removed.len());
            return;
        }

        let mut loaded = 0usize;
        for input in InputId::all() {
            for (index, record) in store.rules_for(input, Direction::On) {
                if !record.config.track_ignition {
                    continue;
                }
                let rule = ActiveRule {
                    input: None,
                    index,
                    direction: Direction::On,
                    one_shot: false,
                    record,
                };
                if self.insert(rule).is_err() {
                    return;
                }
                loaded += 1;
            }
        }
        info!("ignition on: loaded {} tracked rules", loaded);
    }

    /// Remove every one-shot entry. Returns how many were removed.
    pub fn purge_one_shot(&mut self) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| !r.one_shot);
        before - self.rules.len()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Remove `input`'s rules and return their distinct destinations.
    fn take_input(&mut self, input: InputId) -> Vec<ClearingKey, MAX_CLEARING_PER_INPUT> {
        let mut keys = Vec::new();
        for rule in self.rules.iter().filter(|r| r.input == Some(input)) {
            if !push_unique(&mut keys, rule.record.clearing_key()) {
                self.clearing_drops = self.clearing_drops.saturating_add(1);
                warn!("{}: too many destinations to clear, dropping {}", input, rule.record.destination);
            }
        }
        self.rules.retain(|r| r.input != Some(input));
        keys
    }

    /// A refused insertion is already counted in `overflows`.
    fn push_clearing(&mut self, input: Option<InputId>, keys: &[ClearingKey]) {
        for &key in keys {
            if self.insert(ActiveRule::clearing(input, key)).is_err() {
                break;
            }
        }
    }
}

impl Default for ActiveRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Add `key` unless its destination is already listed. Returns `false`
/// only when a new destination did not fit.
fn push_unique<const N: usize>(keys: &mut Vec<ClearingKey, N>, key: ClearingKey) -> bool {
    if keys.iter().any(|(d, _)| *d == key.0) {
        return true;
    }
    keys.push(key).is_ok()
}

/// Payload byte 0 of a manual rule.
///
/// The stored byte must carry exactly one bit, the ignition bit. The
/// starter bit sits one position lower, wrapping from bit 0 to bit 7.
pub fn manual_byte(stored: u8, ignition_on: bool, starter_on: bool) -> core::result::Result<u8, ConfigInconsistency> {
    match stored.count_ones() {
        0 => return Err(ConfigInconsistency::NoIgnitionBit),
        1 => {}
        _ => return Err(ConfigInconsistency::MultipleIgnitionBits(stored)),
    }
    let ignition = stored;
    let starter = stored.rotate_right(1);

    let mut byte = 0;
    if ignition_on {
        byte |= ignition;
    }
    if starter_on {
        byte |= starter;
    }
    Ok(byte)
}
