//! Port traits — the boundary between the rule engine and the vehicle.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EngineService (domain)
//! ```
//!
//! Driven adapters (rule storage, input scanner, CAN transport, auxiliary
//! bus translator, local output drivers) implement these traits. The
//! [`EngineService`](super::service::EngineService) consumes them via
//! generics, so the engine never touches hardware directly and every
//! collaborator can be replaced by a recording mock on the host.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::record::RECORD_LEN;
use crate::rules::{Destination, InputId};

// ───────────────────────────────────────────────────────────────
// Rule storage port (driven adapter: EEPROM → domain)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable, 4096-byte rule store. Reads are word aligned.
pub trait RuleStoragePort {
    /// Fill `buf` with the record that starts at `address`.
    fn read_record(&mut self, address: u16, buf: &mut [u8; RECORD_LEN]) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Address is outside the device.
    OutOfRange,
    /// The device rejected a non word-aligned access.
    Misaligned,
    /// The device did not answer or returned a bad checksum.
    ReadFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "address out of range"),
            Self::Misaligned => write!(f, "misaligned access"),
            Self::ReadFailed => write!(f, "read failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: scanner → domain)
// ───────────────────────────────────────────────────────────────

/// Debounced input states owned by the external scanner.
pub trait InputPort {
    fn input_state(&self, input: InputId) -> bool;

    /// Ignition reported from outside the rule inputs (auxiliary bus).
    fn ignition_flag(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain → CAN)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget message transmission.
pub trait TransportPort {
    fn transmit(&mut self, priority: u8, destination: Destination, payload: &[u8; 8]);
}

// ───────────────────────────────────────────────────────────────
// Auxiliary message source (driven adapter: translator → domain)
// ───────────────────────────────────────────────────────────────

/// A message already translated into the engine's addressing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMessage {
    pub destination: Destination,
    pub payload: [u8; 8],
}

/// Supplies extra messages to merge into every aggregation.
pub trait AuxMessageSource {
    fn aux_messages(&self) -> &[ExternalMessage];
}

// ───────────────────────────────────────────────────────────────
// Neutral-safety port
// ───────────────────────────────────────────────────────────────

/// The transmission is in park/neutral; gates the starter.
pub trait NeutralSafetyPort {
    fn neutral_engaged(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Local output port (driven adapter: domain → on-board drivers)
// ───────────────────────────────────────────────────────────────

/// On-board high-side outputs driven by rules instead of CAN frames.
pub trait LocalOutputPort {
    fn set_local_output(&mut self, channel: u8, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Combined vehicle I/O
// ───────────────────────────────────────────────────────────────

/// Everything the main loop touches on the vehicle side.
pub trait VehicleIo:
    InputPort + TransportPort + AuxMessageSource + NeutralSafetyPort + LocalOutputPort
{
}

impl<T> VehicleIo for T where
    T: InputPort + TransportPort + AuxMessageSource + NeutralSafetyPort + LocalOutputPort
{
}

// ───────────────────────────────────────────────────────────────
// Configuration errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is outside its allowed range.
    ValidationFailed(&'static str),
    /// The stored representation could not be parsed.
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "config corrupted"),
        }
    }
}
