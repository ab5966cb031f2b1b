//! Stored rules ("cases") and the identifiers they are keyed by.
//!
//! ```text
//!   RuleStoragePort ──▶ RuleStore (address + decode) ──▶ RuleRecord
//! ```
//!
//! Every input owns a fixed slice of ON rules and a (usually empty) slice
//! of OFF rules inside a 4096-byte store. [`layout`] holds the static
//! count/offset tables, [`record`] the bit-exact 32-byte record format and
//! [`store`] the validated accessor.

use core::fmt;

use serde::{Deserialize, Serialize};

pub mod layout;
pub mod record;
pub mod store;

pub use record::{ConditionMask, Destination, RuleConfig, RuleRecord};
pub use store::RuleStore;

/// Number of logical inputs (38 standard + 6 high-side).
pub const TOTAL_INPUTS: usize = 44;

/// Number of standard inputs; the remainder are high-side inputs.
pub const STANDARD_INPUTS: usize = 38;

// ───────────────────────────────────────────────────────────────
// InputId
// ───────────────────────────────────────────────────────────────

/// A logical input number in `0..TOTAL_INPUTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputId(u8);

impl InputId {
    /// Returns `None` for out-of-range numbers.
    pub const fn new(n: u8) -> Option<Self> {
        if (n as usize) < TOTAL_INPUTS {
            Some(Self(n))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Every valid input in ascending order.
    pub fn all() -> impl Iterator<Item = InputId> {
        (0..TOTAL_INPUTS as u8).map(InputId)
    }

    pub const fn is_high_side(self) -> bool {
        self.index() >= STANDARD_INPUTS
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_high_side() {
            write!(f, "HSIN{:02}", self.index() - STANDARD_INPUTS + 1)
        } else {
            write!(f, "IN{:02}", self.index() + 1)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Direction
// ───────────────────────────────────────────────────────────────

/// Which rule set of an input applies: the one loaded when it turns on
/// or the one loaded when it turns off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    On,
    Off,
}

impl Direction {
    pub const fn from_state(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Most rules the tracker loads for one transition in this direction.
    pub const fn max_rules(self) -> u8 {
        match self {
            Self::On => 8,
            Self::Off => 2,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// InputSet
// ───────────────────────────────────────────────────────────────

/// Snapshot of all input states as a bitmask, bit n = input n.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSet(u64);

impl InputSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, input: InputId) -> bool {
        self.0 & (1 << input.0) != 0
    }

    pub fn set(&mut self, input: InputId, on: bool) {
        if on {
            self.0 |= 1 << input.0;
        } else {
            self.0 &= !(1 << input.0);
        }
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Inputs present in `self` but not in `other`, and vice versa.
    pub const fn diff(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = InputId> {
        InputId::all().filter(move |i| self.contains(*i))
    }
}

impl FromIterator<InputId> for InputSet {
    fn from_iter<T: IntoIterator<Item = InputId>>(iter: T) -> Self {
        let mut set = Self::empty();
        for input in iter {
            set.set(input, true);
        }
        set
    }
}
