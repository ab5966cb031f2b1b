//! Unified error types for the MasterCell rule engine.
//!
//! Three categories exist and none of them is fatal to the control loop:
//! absence (no usable rule at a location), capacity exhaustion (a bounded
//! table refused an insertion) and configuration inconsistency (a stored
//! rule cannot be used the way its flags claim). All variants are `Copy`
//! so they can be counted and logged without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The rule store has no usable record at the requested location.
    Absent(LookupError),
    /// A fixed-capacity table refused an insertion.
    Capacity(CapacityError),
    /// A stored rule contradicts the role its input is configured for.
    Config(ConfigInconsistency),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent(e) => write!(f, "absent: {e}"),
            Self::Capacity(e) => write!(f, "capacity: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule store lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// Input number is not in `0..TOTAL_INPUTS`.
    InputOutOfRange(u8),
    /// Rule index is beyond the per-input count for the direction.
    IndexOutOfRange { input: u8, index: u8 },
    /// The input has no region allocated for the direction.
    NoRegion(u8),
    /// Computed address is not word aligned.
    Misaligned(u16),
    /// Record would extend past the end of the store.
    OutOfBounds(u16),
    /// The storage driver failed the read.
    Storage(u16),
    /// The slot holds a blank (all-0xFF) record.
    Blank(u16),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputOutOfRange(n) => write!(f, "input {n} out of range"),
            Self::IndexOutOfRange { input, index } => {
                write!(f, "rule {index} out of range for input {input}")
            }
            Self::NoRegion(n) => write!(f, "input {n} has no region for this direction"),
            Self::Misaligned(addr) => write!(f, "address 0x{addr:04X} not word aligned"),
            Self::OutOfBounds(addr) => write!(f, "address 0x{addr:04X} out of bounds"),
            Self::Storage(addr) => write!(f, "storage read failed at 0x{addr:04X}"),
            Self::Blank(addr) => write!(f, "blank record at 0x{addr:04X}"),
        }
    }
}

impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        Self::Absent(e)
    }
}

// ---------------------------------------------------------------------------
// Capacity exhaustion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// Active-rule list is full.
    ActiveRules,
    /// Aggregated-message table is full.
    Destinations,
    /// Last-sent snapshot is full.
    Snapshot,
    /// One-button state pool is full.
    OneButtonPool,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveRules => write!(f, "active-rule list full"),
            Self::Destinations => write!(f, "destination table full"),
            Self::Snapshot => write!(f, "last-sent snapshot full"),
            Self::OneButtonPool => write!(f, "one-button pool full"),
        }
    }
}

impl From<CapacityError> for Error {
    fn from(e: CapacityError) -> Self {
        Self::Capacity(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration inconsistency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigInconsistency {
    /// Payload byte 0 of the one-button rule has no bit set.
    NoIgnitionBit,
    /// Payload byte 0 of the one-button rule has more than one bit set.
    MultipleIgnitionBits(u8),
}

impl fmt::Display for ConfigInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIgnitionBit => write!(f, "no ignition bit in payload byte 0"),
            Self::MultipleIgnitionBits(b) => {
                write!(f, "multiple ignition bits in payload byte 0 (0x{b:02X})")
            }
        }
    }
}

impl From<ConfigInconsistency> for Error {
    fn from(e: ConfigInconsistency) -> Self {
        Self::Config(e)
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = core::result::Result<T, Error>;
