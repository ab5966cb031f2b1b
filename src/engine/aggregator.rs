//! Two-pass merge of active rules into unique outgoing messages.
//!
//! Pass 1 builds a per-destination mask of every bit driven by a rule whose
//! input is flashing. Pass 2 ORs each rule's effective payload into its
//! destination:
//!
//! | rule state                        | effective payload        |
//! |-----------------------------------|--------------------------|
//! | input flashing, in OFF phase      | all zero                 |
//! | overridable                       | payload & !pattern mask  |
//! | otherwise                         | payload                  |
//!
//! The override lets a turn signal own the shared filament of a brake
//! light. Auxiliary messages are OR'd in last.

use heapless::Vec;
use log::warn;
use serde::Serialize;

use crate::app::ports::ExternalMessage;
use crate::error::CapacityError;
use crate::rules::{Destination, InputId, InputSet};

use super::conditions;
use super::pattern::PatternScheduler;
use super::tracker::ActiveRules;

pub const MAX_DESTINATIONS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregatedMessage {
    pub destination: Destination,
    pub priority: u8,
    pub payload: [u8; 8],
    /// At least one contributor's input is flashing.
    pub has_pattern: bool,
    /// Payload differs from the last transmitted one. Set by the gate.
    pub changed: bool,
}

impl AggregatedMessage {
    fn new(destination: Destination, priority: u8) -> Self {
        Self {
            destination,
            priority,
            payload: [0; 8],
            has_pattern: false,
            changed: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct AggregatedTable {
    messages: Vec<AggregatedMessage, MAX_DESTINATIONS>,
    dropped: u32,
}

impl AggregatedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, AggregatedMessage> {
        self.messages.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, AggregatedMessage> {
        self.messages.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, destination: Destination) -> Option<&AggregatedMessage> {
        self.messages.iter().find(|m| m.destination == destination)
    }

    /// Destinations refused because the table was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// OR `payload` into `destination`, creating the entry with `priority`.
    /// A new entry that does not fit is refused and counted.
    pub fn merge(
        &mut self,
        destination: Destination,
        priority: u8,
        payload: &[u8; 8],
    ) -> Result<&mut AggregatedMessage, CapacityError> {
        let pos = match self.messages.iter().position(|m| m.destination == destination) {
            Some(pos) => pos,
            None => {
                if self.messages.push(AggregatedMessage::new(destination, priority)).is_err() {
                    self.dropped = self.dropped.saturating_add(1);
                    warn!("destination table full, dropped {}", destination);
                    return Err(CapacityError::Destinations);
                }
                self.messages.len() - 1
            }
        };
        let msg = &mut self.messages[pos];
        or_into(&mut msg.payload, payload);
        Ok(msg)
    }
}

fn or_into(acc: &mut [u8; 8], bytes: &[u8; 8]) {
    for (a, b) in acc.iter_mut().zip(bytes) {
        *a |= *b;
    }
}

/// Build the aggregated table for the current engine state.
pub fn aggregate(
    rules: &ActiveRules,
    patterns: &PatternScheduler,
    inputs: InputSet,
    ignition: bool,
    external: &[ExternalMessage],
    aux_priority: u8,
) -> AggregatedTable {
    let armed = |input: Option<InputId>| input.is_some_and(|i| patterns.is_armed(i));

    // Pass 1: bits owned by flashing inputs, per destination.
    let mut masks: Vec<(Destination, [u8; 8]), MAX_DESTINATIONS> = Vec::new();
    for rule in rules.iter().filter(|r| armed(r.input)) {
        let dest = rule.record.destination;
        match masks.iter_mut().find(|(d, _)| *d == dest) {
            Some((_, mask)) => or_into(mask, &rule.record.payload),
            None => {
                let _ = masks.push((dest, rule.record.payload));
            }
        }
    }

    // Pass 2: merge.
    let mut table = AggregatedTable::new();
    for rule in rules.iter() {
        let record = &rule.record;
        let flashing = armed(rule.input);
        let dark = flashing && rule.input.is_some_and(|i| !patterns.is_on_phase(i));

        if !conditions::satisfied(record, inputs, ignition) {
            continue;
        }

        let effective = if dark {
            [0; 8]
        } else if record.config.overridable {
            let mask = masks
                .iter()
                .find(|(d, _)| *d == record.destination)
                .map_or([0; 8], |(_, m)| *m);
            core::array::from_fn(|k| record.payload[k] & !mask[k])
        } else {
            record.payload
        };

        // refusals are counted in the table
        if let Ok(msg) = table.merge(record.destination, record.priority, &effective) {
            msg.has_pattern |= flashing;
        }
    }

    for ext in external {
        let _ = table.merge(ext.destination, aux_priority, &ext.payload);
    }
    table
}
