//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a slice of the engine
//! against the mock vehicle. All tests run on the host with no CAN
//! controller or EEPROM required.

mod mock_hw;
mod scenario_tests;
mod service_tests;
