//! MasterCell rule engine library.
//!
//! Turns 44 debounced inputs into J1939 output messages driven by rules
//! ("cases") held in a 4096-byte store. The engine is pure logic; every
//! hardware touch point is a port trait in [`app::ports`], so the whole
//! control loop runs on the host against the adapters in [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod events;
pub mod j1939;
pub mod rules;
