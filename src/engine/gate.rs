//! Transmission gate: decides which aggregated messages go on the wire.
//!
//! A pattern tick refreshes every flashing destination even when its bytes
//! did not change; a state change sends only destinations whose payload
//! differs from what was last sent. Only messages actually sent update
//! the last-sent snapshot.

use heapless::Vec;
use log::warn;
use serde::Serialize;

use crate::error::CapacityError;
use crate::rules::Destination;

use super::aggregator::{AggregatedMessage, AggregatedTable, MAX_DESTINATIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BroadcastReason {
    PatternTick,
    StateChange,
}

pub type SendList = Vec<AggregatedMessage, MAX_DESTINATIONS>;

#[derive(Debug, Default)]
pub struct TransmissionGate {
    last_sent: Vec<(Destination, [u8; 8]), MAX_DESTINATIONS>,
    dropped: u32,
}

impl TransmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `changed` on every entry of `table` and return the ones due.
    pub fn select_for_send(&self, table: &mut AggregatedTable, reason: BroadcastReason) -> SendList {
        let mut due = SendList::new();
        for msg in table.iter_mut() {
            msg.changed = self.last_sent(msg.destination) != Some(msg.payload);
            let send = match reason {
                BroadcastReason::PatternTick => msg.has_pattern,
                BroadcastReason::StateChange => msg.changed,
            };
            if send {
                // same capacity as the table
                let _ = due.push(*msg);
            }
        }
        due
    }

    /// Remember the payloads that were just transmitted.
    ///
    /// Every entry is processed; if any new destination found the snapshot
    /// full the call reports it after the rest were recorded.
    pub fn record_sent(&mut self, sent: &[AggregatedMessage]) -> Result<(), CapacityError> {
        let mut result = Ok(());
        for msg in sent {
            match self.last_sent.iter_mut().find(|(d, _)| *d == msg.destination) {
                Some((_, payload)) => *payload = msg.payload,
                None => {
                    if self.last_sent.push((msg.destination, msg.payload)).is_err() {
                        self.dropped = self.dropped.saturating_add(1);
                        warn!("last-sent snapshot full, {} untracked", msg.destination);
                        result = Err(CapacityError::Snapshot);
                    }
                }
            }
        }
        result
    }

    pub fn last_sent(&self, destination: Destination) -> Option<[u8; 8]> {
        self.last_sent
            .iter()
            .find(|(d, _)| *d == destination)
            .map(|(_, p)| *p)
    }

    pub fn tracked(&self) -> usize {
        self.last_sent.len()
    }

    /// Sent destinations the snapshot had no room for.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
