//! Engine configuration parameters
//!
//! All tunable timing and routing parameters for the rule engine.
//! The simulator loads overrides from JSON; firmware builds use the defaults.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// One local output channel driven from a bit of the local-output message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOutputBinding {
    /// Output channel number as printed on the harness (OUT7, OUT8, ...).
    pub channel: u8,
    /// Bit mask within the local-output data byte.
    pub mask: u8,
}

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- Timing ---
    /// Pattern tick period (milliseconds); one pattern unit
    pub pattern_tick_ms: u32,
    /// Heartbeat period (milliseconds)
    pub heartbeat_ms: u32,
    /// Input scan period (milliseconds)
    pub scan_interval_ms: u32,

    // --- One-button start ---
    /// Releases shorter than this are quick presses (milliseconds)
    pub quick_press_ms: u32,
    /// Hold time before the starter may engage (milliseconds)
    pub starter_delay_ms: u32,

    // --- Heartbeat frame ---
    /// Group number of the periodic status frame
    pub heartbeat_group: u16,
    /// Source address the status frame is sent from
    pub heartbeat_address: u8,

    // --- Aggregation ---
    /// Priority given to auxiliary-bus messages that open a new destination
    pub aux_default_priority: u8,

    // --- Local outputs ---
    /// Group number routed to on-board outputs instead of the CAN bus
    pub local_output_group: u16,
    /// Payload byte carrying the local output bits
    pub local_output_byte: u8,
    /// Channel bindings within that byte
    pub local_outputs: heapless::Vec<LocalOutputBinding, 8>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut local_outputs = heapless::Vec::new();
        // OUT7 / OUT8; OUT1-OUT6 are hard-wired
        let _ = local_outputs.push(LocalOutputBinding { channel: 7, mask: 0x40 });
        let _ = local_outputs.push(LocalOutputBinding { channel: 8, mask: 0x80 });

        Self {
            // Timing
            pattern_tick_ms: 250,
            heartbeat_ms: 1000,
            scan_interval_ms: 10,

            // One-button start
            quick_press_ms: 500,
            starter_delay_ms: 1000, // fuel pump prime time

            // Heartbeat frame
            heartbeat_group: 0xFF00,
            heartbeat_address: 0x80,

            // Aggregation
            aux_default_priority: 6,

            // Local outputs
            local_output_group: 0xFF00,
            local_output_byte: 3,
            local_outputs,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern_tick_ms == 0 || self.heartbeat_ms == 0 || self.scan_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("periods must be nonzero"));
        }
        if self.scan_interval_ms > self.pattern_tick_ms {
            return Err(ConfigError::ValidationFailed("scan slower than pattern tick"));
        }
        if self.quick_press_ms > self.starter_delay_ms {
            return Err(ConfigError::ValidationFailed("quick press longer than starter delay"));
        }
        if self.aux_default_priority > 7 {
            return Err(ConfigError::ValidationFailed("priority above 7"));
        }
        if self.local_output_byte > 7 {
            return Err(ConfigError::ValidationFailed("local output byte outside payload"));
        }
        if self.local_outputs.iter().any(|b| b.mask == 0) {
            return Err(ConfigError::ValidationFailed("local output with empty mask"));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
