//! The 32-byte rule record.
//!
//! ```text
//!  0      priority (low 3 bits)
//!  1..=2  group number, big endian
//!  3      station address
//!  4      config flags (four 2-bit fields, value 01 = enabled)
//!  5..=6  unused
//!  7      pattern timing: high nibble ON ticks, low nibble OFF ticks
//!  8..=15 must-be-on condition bitmap
//! 16..=23 must-be-off condition bitmap
//! 24..=31 CAN payload
//! ```
//!
//! Records are authored by an external tool, so this layout is bit-exact.
//! A record whose first four bytes are all 0xFF is a blank slot.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{InputId, InputSet, TOTAL_INPUTS};

pub const RECORD_LEN: usize = 32;

const OFFSET_PRIORITY: usize = 0;
const OFFSET_GROUP: usize = 1;
const OFFSET_ADDRESS: usize = 3;
const OFFSET_CONFIG: usize = 4;
const OFFSET_PATTERN: usize = 7;
const OFFSET_MUST_BE_ON: usize = 8;
const OFFSET_MUST_BE_OFF: usize = 16;
const OFFSET_PAYLOAD: usize = 24;

// Config byte fields: mask, enabled value.
const CFG_SETS_IGNITION: (u8, u8) = (0x03, 0x01);
const CFG_OVERRIDABLE: (u8, u8) = (0x0C, 0x04);
const CFG_ONE_BUTTON: (u8, u8) = (0x30, 0x10);
const CFG_TRACK_IGNITION: (u8, u8) = (0xC0, 0x40);

/// Condition byte 5 carries two flags above inputs 40..43.
const COND_SECURITY_BIT: u64 = 1 << 44;
const COND_IGNITION_BIT: u64 = 1 << 45;
const COND_INPUT_BITS: u64 = (1 << TOTAL_INPUTS) - 1;

// ───────────────────────────────────────────────────────────────
// Destination
// ───────────────────────────────────────────────────────────────

/// A distinct outgoing message: J1939 group number plus station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub group: u16,
    pub address: u8,
}

impl Destination {
    pub const fn new(group: u16, address: u8) -> Self {
        Self { group, address }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}/{:02X}", self.group, self.address)
    }
}

// ───────────────────────────────────────────────────────────────
// Config flags
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// The input acts as an ignition source.
    pub sets_ignition: bool,
    /// Bits also driven by a flashing rule on the same destination are
    /// suppressed while that pattern is armed.
    pub overridable: bool,
    /// The input is a momentary one-button-start switch.
    pub one_button: bool,
    /// The rule follows the ignition flag instead of its input.
    pub track_ignition: bool,
}

impl RuleConfig {
    pub fn from_byte(b: u8) -> Self {
        let field = |(mask, value): (u8, u8)| b & mask == value;
        Self {
            sets_ignition: field(CFG_SETS_IGNITION),
            overridable: field(CFG_OVERRIDABLE),
            one_button: field(CFG_ONE_BUTTON),
            track_ignition: field(CFG_TRACK_IGNITION),
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut b = 0;
        for (on, (_, value)) in [
            (self.sets_ignition, CFG_SETS_IGNITION),
            (self.overridable, CFG_OVERRIDABLE),
            (self.one_button, CFG_ONE_BUTTON),
            (self.track_ignition, CFG_TRACK_IGNITION),
        ] {
            if on {
                b |= value;
            }
        }
        b
    }
}

// ───────────────────────────────────────────────────────────────
// Condition mask
// ───────────────────────────────────────────────────────────────

/// 44 input bits plus the security and ignition flags.
///
/// Input `n` lives in byte `n / 8`, bit `n % 8`, which is bit `n` of the
/// little-endian interpretation of the eight bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMask(u64);

impl ConditionMask {
    pub const NONE: Self = Self(0);

    pub fn from_bytes(raw: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(raw))
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn with_input(self, input: InputId) -> Self {
        Self(self.0 | 1 << input.get())
    }

    pub fn with_ignition(self) -> Self {
        Self(self.0 | COND_IGNITION_BIT)
    }

    pub fn with_security(self) -> Self {
        Self(self.0 | COND_SECURITY_BIT)
    }

    /// Input bits only, as an [`InputSet`]-compatible mask.
    pub const fn inputs(self) -> u64 {
        self.0 & COND_INPUT_BITS
    }

    pub const fn ignition(self) -> bool {
        self.0 & COND_IGNITION_BIT != 0
    }

    pub const fn security(self) -> bool {
        self.0 & COND_SECURITY_BIT != 0
    }

    /// True when every input bit in the mask is present in `set`.
    pub const fn all_in(self, set: InputSet) -> bool {
        self.inputs() & !set.bits() == 0
    }

    /// True when no input bit in the mask is present in `set`.
    pub const fn none_in(self, set: InputSet) -> bool {
        self.inputs() & set.bits() == 0
    }
}

// ───────────────────────────────────────────────────────────────
// RuleRecord
// ───────────────────────────────────────────────────────────────

/// A decoded, immutable rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub priority: u8,
    pub destination: Destination,
    pub config: RuleConfig,
    /// ON phase length in pattern ticks (0..=15).
    pub pattern_on: u8,
    /// OFF phase length in pattern ticks (0..=15).
    pub pattern_off: u8,
    pub must_be_on: ConditionMask,
    pub must_be_off: ConditionMask,
    pub payload: [u8; 8],
}

impl RuleRecord {
    /// A plain rule with no conditions, pattern or flags.
    pub const fn new(priority: u8, destination: Destination, payload: [u8; 8]) -> Self {
        Self {
            priority: priority & 0x07,
            destination,
            config: RuleConfig {
                sets_ignition: false,
                overridable: false,
                one_button: false,
                track_ignition: false,
            },
            pattern_on: 0,
            pattern_off: 0,
            must_be_on: ConditionMask::NONE,
            must_be_off: ConditionMask::NONE,
            payload,
        }
    }

    /// All-zero payload used to switch a destination's outputs off.
    pub const fn clearing(priority: u8, destination: Destination) -> Self {
        Self::new(priority, destination, [0; 8])
    }

    /// `None` for a blank (all-0xFF header) slot.
    pub fn decode(raw: &[u8; RECORD_LEN]) -> Option<Self> {
        if raw[..4].iter().all(|&b| b == 0xFF) {
            return None;
        }

        let mut on = [0u8; 8];
        let mut off = [0u8; 8];
        let mut payload = [0u8; 8];
        on.copy_from_slice(&raw[OFFSET_MUST_BE_ON..OFFSET_MUST_BE_ON + 8]);
        off.copy_from_slice(&raw[OFFSET_MUST_BE_OFF..OFFSET_MUST_BE_OFF + 8]);
        payload.copy_from_slice(&raw[OFFSET_PAYLOAD..OFFSET_PAYLOAD + 8]);

        let pattern = raw[OFFSET_PATTERN];
        Some(Self {
            priority: raw[OFFSET_PRIORITY] & 0x07,
            destination: Destination::new(
                u16::from_be_bytes([raw[OFFSET_GROUP], raw[OFFSET_GROUP + 1]]),
                raw[OFFSET_ADDRESS],
            ),
            config: RuleConfig::from_byte(raw[OFFSET_CONFIG]),
            pattern_on: pattern >> 4,
            pattern_off: pattern & 0x0F,
            must_be_on: ConditionMask::from_bytes(on),
            must_be_off: ConditionMask::from_bytes(off),
            payload,
        })
    }

    /// Inverse of [`decode`](Self::decode), used to author rule images.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut raw = [0u8; RECORD_LEN];
        raw[OFFSET_PRIORITY] = self.priority & 0x07;
        raw[OFFSET_GROUP..OFFSET_GROUP + 2].copy_from_slice(&self.destination.group.to_be_bytes());
        raw[OFFSET_ADDRESS] = self.destination.address;
        raw[OFFSET_CONFIG] = self.config.to_byte();
        raw[OFFSET_PATTERN] = (self.pattern_on & 0x0F) << 4 | (self.pattern_off & 0x0F);
        raw[OFFSET_MUST_BE_ON..OFFSET_MUST_BE_ON + 8].copy_from_slice(&self.must_be_on.to_bytes());
        raw[OFFSET_MUST_BE_OFF..OFFSET_MUST_BE_OFF + 8]
            .copy_from_slice(&self.must_be_off.to_bytes());
        raw[OFFSET_PAYLOAD..].copy_from_slice(&self.payload);
        raw
    }

    /// A rule with nonzero ON or OFF timing flashes.
    pub const fn has_pattern(&self) -> bool {
        self.pattern_on != 0 || self.pattern_off != 0
    }

    /// Identity used when generating clearing messages.
    pub const fn clearing_key(&self) -> (Destination, u8) {
        (self.destination, self.priority)
    }

    // ── Builders (rule authoring and tests) ───────────────────

    pub const fn with_pattern(mut self, on: u8, off: u8) -> Self {
        self.pattern_on = on & 0x0F;
        self.pattern_off = off & 0x0F;
        self
    }

    pub const fn with_config(mut self, config: RuleConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn with_conditions(mut self, must_be_on: ConditionMask, must_be_off: ConditionMask) -> Self {
        self.must_be_on = must_be_on;
        self.must_be_off = must_be_off;
        self
    }
}
