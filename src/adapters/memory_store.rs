//! RAM-backed rule image.
//!
//! Implements [`RuleStoragePort`] over a 4096-byte array. Used by the host
//! simulator (loaded from a dumped EEPROM image) and by tests, which author
//! rules directly into the image with [`MemoryRuleStore::put`].

use crate::app::ports::{RuleStoragePort, StorageError};
use crate::rules::layout::{self, STORE_SIZE};
use crate::rules::record::RECORD_LEN;
use crate::rules::{Direction, InputId, RuleRecord};

const SIZE: usize = STORE_SIZE as usize;

pub struct MemoryRuleStore {
    image: [u8; SIZE],
    reads: u32,
}

impl MemoryRuleStore {
    /// Erased store: every byte 0xFF, so every slot is blank.
    pub fn blank() -> Self {
        Self {
            image: [0xFF; SIZE],
            reads: 0,
        }
    }

    /// Copy a dumped image. Short images are padded with 0xFF.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() > SIZE {
            return Err(StorageError::OutOfRange);
        }
        let mut store = Self::blank();
        store.image[..bytes.len()].copy_from_slice(bytes);
        Ok(store)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }

    /// Write `record` into the slot for (input, index, direction).
    /// Returns `false` when the layout has no such slot.
    pub fn put(&mut self, input: InputId, index: u8, direction: Direction, record: &RuleRecord) -> bool {
        match Self::slot(input, index, direction) {
            Some(start) => {
                self.image[start..start + RECORD_LEN].copy_from_slice(&record.encode());
                true
            }
            None => false,
        }
    }

    /// Number of `read_record` calls served.
    pub fn reads(&self) -> u32 {
        self.reads
    }

    fn slot(input: InputId, index: u8, direction: Direction) -> Option<usize> {
        if index >= layout::rule_count(input.index(), direction) {
            return None;
        }
        let offset = layout::region_offset(input.index(), direction)?;
        let start = usize::from(layout::region_base(direction) + offset) + usize::from(index) * RECORD_LEN;
        (start + RECORD_LEN <= SIZE).then_some(start)
    }
}

impl RuleStoragePort for MemoryRuleStore {
    fn read_record(&mut self, address: u16, buf: &mut [u8; RECORD_LEN]) -> Result<(), StorageError> {
        let start = usize::from(address);
        if start + RECORD_LEN > SIZE {
            return Err(StorageError::OutOfRange);
        }
        if start & 0x01 != 0 {
            return Err(StorageError::Misaligned);
        }
        self.reads += 1;
        buf.copy_from_slice(&self.image[start..start + RECORD_LEN]);
        Ok(())
    }
}
