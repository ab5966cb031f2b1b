//! Static store layout: per-input rule counts and byte offsets.
//!
//! The rule image is produced by an external configuration tool, so these
//! tables are part of the binary contract and must not be reordered.

use super::{Direction, TOTAL_INPUTS};

/// Total size of the rule store in bytes.
pub const STORE_SIZE: u16 = 4096;

/// Size of one rule record in bytes.
pub const RECORD_SIZE: u16 = 32;

/// First byte of the ON-rule region.
pub const ON_REGION_BASE: u16 = 0x0022;

/// First byte of the OFF-rule region.
pub const OFF_REGION_BASE: u16 = 0x0D62;

/// Marker for "no region allocated".
const NONE: u16 = 0xFFFF;

#[rustfmt::skip]
const ON_COUNTS: [u8; TOTAL_INPUTS] = [
    4, 2, 4, 4, 2, 6, 1, 6,
    1, 2, 2, 2, 2, 2, 6, 2,
    2, 6, 2, 2, 2, 2, 6, 6,
    2, 2, 2, 2, 2, 2, 2, 2,
    1, 1, 1, 1, 1, 1,
    2, 2, 1, 1, 1, 1,
];

#[rustfmt::skip]
const OFF_COUNTS: [u8; TOTAL_INPUTS] = [
    2, 2, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 2,
    0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0,
];

#[rustfmt::skip]
const ON_OFFSETS: [u16; TOTAL_INPUTS] = [
       0,  128,  192,  320,  448,  512,  704,  736,
     928,  960, 1024, 1088, 1152, 1216, 1280, 1472,
    1536, 1600, 1792, 1856, 1920, 1984, 2048, 2240,
    2432, 2496, 2560, 2624, 2688, 2752, 2816, 2880,
    2944, 2976, 3008, 3040, 3072, 3104,
    3136, 3200, 3264, 3296, 3328, 3360,
];

#[rustfmt::skip]
const OFF_OFFSETS: [u16; TOTAL_INPUTS] = [
       0,   64, NONE, NONE, NONE, NONE, NONE, NONE,
    NONE, NONE, NONE, NONE, NONE, NONE, NONE, NONE,
    NONE, NONE, NONE, NONE, NONE, NONE, NONE, NONE,
     160,  224,  288,  352,  416,  480,  544,  608,
    NONE, NONE, NONE, NONE, NONE, NONE,
    NONE, NONE, NONE, NONE, NONE, NONE,
];

/// Number of rule slots an input owns in the given direction.
pub fn rule_count(input: usize, direction: Direction) -> u8 {
    let table = match direction {
        Direction::On => &ON_COUNTS,
        Direction::Off => &OFF_COUNTS,
    };
    table.get(input).copied().unwrap_or(0)
}

/// Byte offset of the input's first slot relative to the region base.
pub fn region_offset(input: usize, direction: Direction) -> Option<u16> {
    let table = match direction {
        Direction::On => &ON_OFFSETS,
        Direction::Off => &OFF_OFFSETS,
    };
    table.get(input).copied().filter(|&o| o != NONE)
}

pub const fn region_base(direction: Direction) -> u16 {
    match direction {
        Direction::On => ON_REGION_BASE,
        Direction::Off => OFF_REGION_BASE,
    }
}
