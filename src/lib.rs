//! wiimote-mouse: Wii Remote to host pointer bridge
//!
//! Connects to a Wii Remote, maps its IR position onto the selected monitors
//! and turns A/B and the D-pad into mouse buttons and wheel scrolling.

pub mod backend;
pub mod display;
pub mod manager;
pub mod mapping;
pub mod session;
pub mod supervisor;
pub mod wiimote;

// Re-export commonly used items
pub use backend::{MouseButton, PointerBackend};
pub use display::{DisplaySource, DisplaySpaceMapper, Monitor, Rect, VirtualRegion};
pub use manager::{BridgeManager, BridgeParts};
pub use mapping::{ConfigStore, FileConfigStore, InputEventRouter, Preferences};
pub use session::{SessionConfig, SharedSession};
pub use supervisor::{ConnectionState, ConnectionSupervisor, SupervisorSettings};
pub use wiimote::{Device, DeviceDriver, DeviceEvent, DeviceId, EventSink, SensorBarPosition, Sensitivity};
