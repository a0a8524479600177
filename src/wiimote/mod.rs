//! Wii Remote support
//!
//! This module covers everything the bridge knows about the controller:
//! - Device-side types and driver events
//! - The driver boundary (discovery, commands, event sink)
//! - A mock driver for tests and driverless runs

pub mod driver;
pub mod mock;
pub mod types;

// Re-export commonly used items
pub use driver::*;
pub use mock::{DeviceCommand, MockDevice, MockDriver};
pub use types::*;
