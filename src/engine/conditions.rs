//! Cross-input conditional logic.
//!
//! A rule only contributes when every input named in its `must_be_on` mask
//! is on and every input named in its `must_be_off` mask is off. The
//! ignition flag participates through its own bit. The security bit is
//! decoded but never evaluated.

use crate::rules::{InputSet, RuleRecord};

pub fn satisfied(record: &RuleRecord, inputs: InputSet, ignition: bool) -> bool {
    let on = record.must_be_on;
    let off = record.must_be_off;

    if !on.all_in(inputs) || !off.none_in(inputs) {
        return false;
    }
    if on.ignition() && !ignition {
        return false;
    }
    !(off.ignition() && ignition)
}
