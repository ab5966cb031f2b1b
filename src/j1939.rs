//! J1939 29-bit identifier packing.
//!
//! Rules address messages by a 16-bit group (PDU format + PDU specific)
//! and the station address that originates them. Data page and extended
//! data page are always zero on this bus.

use crate::rules::Destination;

/// Largest valid 29-bit identifier.
pub const MAX_ID: u32 = 0x1FFF_FFFF;

/// Pack priority, group and address into an extended CAN identifier.
pub fn can_id(priority: u8, destination: Destination) -> u32 {
    let mut id = u32::from(destination.address);
    id |= u32::from(destination.group) << 8;
    id |= u32::from(priority & 0x07) << 26;
    id
}

/// Inverse of [`can_id`]; `None` for identifiers wider than 29 bits.
pub fn split_id(id: u32) -> Option<(u8, Destination)> {
    if id > MAX_ID {
        return None;
    }
    let priority = ((id >> 26) & 0x07) as u8;
    let group = ((id >> 8) & 0xFFFF) as u16;
    let address = (id & 0xFF) as u8;
    Some((priority, Destination::new(group, address)))
}
