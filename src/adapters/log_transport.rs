//! Logging CAN transport.
//!
//! Stands in for the J1939 driver on the host: every frame is packed into
//! its 29-bit identifier, logged and kept in a bounded history so the
//! simulator can print what went on the wire. Local output writes are
//! recorded the same way.

use std::collections::VecDeque;

use log::info;

use crate::app::ports::{LocalOutputPort, TransportPort};
use crate::j1939;
use crate::rules::Destination;

/// One transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
    pub payload: [u8; 8],
}

impl Frame {
    pub fn destination(&self) -> Option<Destination> {
        j1939::split_id(self.id).map(|(_, d)| d)
    }
}

pub struct LogTransport {
    history: VecDeque<Frame>,
    capacity: usize,
    outputs: [bool; 16],
}

impl LogTransport {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            outputs: [false; 16],
        }
    }

    /// Frames in transmission order, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Frame> {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn output(&self, channel: u8) -> bool {
        self.outputs.get(usize::from(channel)).copied().unwrap_or(false)
    }
}

impl TransportPort for LogTransport {
    fn transmit(&mut self, priority: u8, destination: Destination, payload: &[u8; 8]) {
        let frame = Frame {
            id: j1939::can_id(priority, destination),
            payload: *payload,
        };
        info!("CAN TX {:08X} [{:02X?}]", frame.id, frame.payload);
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(frame);
    }
}

impl LocalOutputPort for LogTransport {
    fn set_local_output(&mut self, channel: u8, on: bool) {
        if let Some(slot) = self.outputs.get_mut(usize::from(channel)) {
            if *slot != on {
                info!("OUT{} -> {}", channel, if on { "ON" } else { "OFF" });
            }
            *slot = on;
        }
    }
}
