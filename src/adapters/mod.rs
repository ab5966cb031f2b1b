//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements         | Connects to               |
//! |-----------------|--------------------|---------------------------|
//! | `log_sink`      | EventSink          | Serial / `log` output     |
//! | `log_transport` | TransportPort      | Logged J1939 frames       |
//! |                 | LocalOutputPort    | Logged OUT7/OUT8 levels   |
//! | `memory_store`  | RuleStoragePort    | RAM copy of the EEPROM    |
//! | `pin_input`     | NeutralSafetyPort  | `embedded-hal` input pin  |

pub mod log_sink;
pub mod log_transport;
pub mod memory_store;
pub mod pin_input;
