//! Validated access to the rule store.
//!
//! [`RuleStore`] turns (input, index, direction) into a record address and
//! decodes the record behind it. Rejections never escalate: they are
//! counted in `bounds_errors` and reported to the caller as absence.

use log::{debug, warn};

use crate::app::ports::RuleStoragePort;
use crate::error::LookupError;

use super::layout::{self, RECORD_SIZE, STORE_SIZE};
use super::record::{RECORD_LEN, RuleRecord};
use super::{Direction, InputId, TOTAL_INPUTS};

pub struct RuleStore<S> {
    storage: S,
    bounds_errors: u32,
    reads: u32,
}

impl<S: RuleStoragePort> RuleStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            bounds_errors: 0,
            reads: 0,
        }
    }

    /// Record address for rule `index` of `input` in `direction`.
    pub fn address(&mut self, input: u8, index: u8, direction: Direction) -> Result<u16, LookupError> {
        let result = Self::compute_address(input, index, direction);
        if let Err(e) = result {
            self.reject(e);
        }
        result
    }

    fn compute_address(input: u8, index: u8, direction: Direction) -> Result<u16, LookupError> {
        let n = input as usize;
        if n >= TOTAL_INPUTS {
            return Err(LookupError::InputOutOfRange(input));
        }
        if index >= layout::rule_count(n, direction) {
            return Err(LookupError::IndexOutOfRange { input, index });
        }
        let offset = layout::region_offset(n, direction).ok_or(LookupError::NoRegion(input))?;
        let address = layout::region_base(direction) + offset + u16::from(index) * RECORD_SIZE;
        Self::check_address(address)?;
        Ok(address)
    }

    fn check_address(address: u16) -> Result<(), LookupError> {
        if address < layout::ON_REGION_BASE || u32::from(address) + u32::from(RECORD_SIZE) > u32::from(STORE_SIZE) {
            return Err(LookupError::OutOfBounds(address));
        }
        if address & 0x01 != 0 {
            return Err(LookupError::Misaligned(address));
        }
        Ok(())
    }

    /// Read and decode the record at `address`; `Ok(None)` for a blank slot.
    pub fn decode(&mut self, address: u16) -> Result<Option<RuleRecord>, LookupError> {
        if let Err(e) = Self::check_address(address) {
            self.reject(e);
            return Err(e);
        }

        let mut raw = [0u8; RECORD_LEN];
        self.reads = self.reads.saturating_add(1);
        if let Err(e) = self.storage.read_record(address, &mut raw) {
            warn!("rule store read at 0x{:04X} failed: {}", address, e);
            self.reject(LookupError::Storage(address));
            return Err(LookupError::Storage(address));
        }
        Ok(RuleRecord::decode(&raw))
    }

    /// Address + decode; a blank slot is reported as [`LookupError::Blank`].
    pub fn load(&mut self, input: InputId, index: u8, direction: Direction) -> Result<RuleRecord, LookupError> {
        let address = self.address(input.get(), index, direction)?;
        self.decode(address)?.ok_or(LookupError::Blank(address))
    }

    /// Rules that exist for `input` in `direction`, capped at the
    /// per-direction maximum, in slot order.
    pub fn rules_for(
        &mut self,
        input: InputId,
        direction: Direction,
    ) -> heapless::Vec<(u8, RuleRecord), 8> {
        let mut out = heapless::Vec::new();
        let count = layout::rule_count(input.index(), direction).min(direction.max_rules());
        for index in 0..count {
            if let Ok(record) = self.load(input, index, direction) {
                // capacity equals the ON maximum, so this cannot fail
                let _ = out.push((index, record));
            }
        }
        out
    }

    /// First ON rule of `input`, which carries its per-input settings.
    pub fn first_on_rule(&mut self, input: InputId) -> Result<RuleRecord, LookupError> {
        self.load(input, 0, Direction::On)
    }

    pub fn is_one_button_input(&mut self, input: InputId) -> bool {
        self.first_on_rule(input).is_ok_and(|r| r.config.one_button)
    }

    pub fn is_ignition_input(&mut self, input: InputId) -> bool {
        self.first_on_rule(input).is_ok_and(|r| r.config.sets_ignition)
    }

    fn reject(&mut self, e: LookupError) {
        self.bounds_errors = self.bounds_errors.saturating_add(1);
        debug!("rule lookup rejected: {}", e);
    }

    // ── Diagnostics ───────────────────────────────────────────

    pub fn bounds_errors(&self) -> u32 {
        self.bounds_errors
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
