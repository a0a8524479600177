//! Event routing and persisted preferences

pub mod config;
pub mod router;

pub use config::{ConfigError, ConfigStore, FileConfigStore, MemoryConfigStore, Preferences};
pub use router::InputEventRouter;
