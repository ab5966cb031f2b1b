//! Runtime diagnostics.
//!
//! Every non-fatal condition in the engine is counted rather than raised:
//! rejected store lookups, refused insertions into bounded tables and
//! manual-rule edits that contradicted the stored configuration. The
//! counters are collected on demand into a serializable snapshot for the
//! display, the heartbeat log and the configuration tool.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub uptime_ms: u32,
    /// Records read from the rule store.
    pub store_reads: u32,
    /// Lookups rejected for range, alignment or storage failures.
    pub bounds_errors: u32,
    /// Rules refused by the full active-rule list.
    pub active_rule_overflows: u32,
    /// Destinations left without a clearing frame on a transition.
    pub clearing_drops: u32,
    /// Destinations refused by a full aggregation table.
    pub destination_drops: u32,
    /// Sent destinations the last-sent snapshot could not track.
    pub snapshot_drops: u32,
    /// One-button inputs refused by the full state pool.
    pub one_button_overflows: u32,
    /// Manual-rule edits that failed.
    pub manual_rule_failures: u32,
    /// Frames handed to the CAN transport.
    pub frames_sent: u32,
    /// Updates applied to local outputs.
    pub local_updates: u32,
    /// Rules currently active.
    pub active_rules: u16,
    /// Pattern timers currently armed.
    pub armed_patterns: u16,
    pub ignition: bool,
}

impl DiagnosticsSnapshot {
    /// Sum of every capacity and lookup problem seen so far.
    pub fn fault_count(&self) -> u32 {
        self.bounds_errors
            .saturating_add(self.active_rule_overflows)
            .saturating_add(self.clearing_drops)
            .saturating_add(self.destination_drops)
            .saturating_add(self.snapshot_drops)
            .saturating_add(self.one_button_overflows)
            .saturating_add(self.manual_rule_failures)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
