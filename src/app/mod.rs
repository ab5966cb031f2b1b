//! Application core: orchestration with zero direct I/O.
//!
//! The [`service::EngineService`] drives the rule engine from a main loop.
//! All interaction with the vehicle happens through **port traits**
//! defined in [`ports`], keeping this layer testable without a CAN bus or
//! an EEPROM.

pub mod events;
pub mod ports;
pub mod service;
