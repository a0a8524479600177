//! Device driver boundary
//!
//! The controller's wire protocol lives in an external driver. This module
//! describes what the bridge needs from it: discovery, a handful of device
//! commands, and a callback sink for the events the bridge acts on.

use crate::wiimote::types::{
    ButtonsEvent, DeviceEvent, DeviceId, IrEvent, LedPattern, SensorBarPosition, Sensitivity,
};
use log::trace;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device discovery failed: {0}")]
    Discovery(String),

    #[error("Device command '{command}' failed: {reason}")]
    Command { command: &'static str, reason: String },

    #[error("Device {0} is no longer connected")]
    Gone(DeviceId),
}

/// Receiver for the events the bridge acts on.
///
/// Called on the driver's callback thread, in arrival order. Implementations
/// must return quickly.
pub trait EventSink: Send + Sync {
    fn on_buttons(&self, event: &ButtonsEvent);

    fn on_ir(&self, event: &IrEvent);

    fn on_disconnection(&self, device: DeviceId);
}

/// Route one driver event to `sink`. Kinds the sink has no handler for are dropped here.
pub fn deliver(sink: &dyn EventSink, event: &DeviceEvent) {
    match event {
        DeviceEvent::Buttons(e) => sink.on_buttons(e),
        DeviceEvent::Ir(e) => sink.on_ir(e),
        DeviceEvent::Disconnected(device) => sink.on_disconnection(*device),
        other => trace!("Ignoring {:?} from {}", other, other.device()),
    }
}

/// A connected controller
pub trait Device: Send + Sync {
    fn id(&self) -> DeviceId;

    fn set_leds(&self, leds: LedPattern) -> Result<(), DeviceError>;

    fn enable_ir_tracking(&self) -> Result<(), DeviceError>;

    fn enable_motion_sensing(&self) -> Result<(), DeviceError>;

    fn set_sensor_bar(&self, position: SensorBarPosition) -> Result<(), DeviceError>;

    /// Tell the device the size of the area its IR coordinates should span
    fn set_virtual_resolution(&self, width: u32, height: u32) -> Result<(), DeviceError>;

    fn set_ir_sensitivity(&self, level: Sensitivity) -> Result<(), DeviceError>;

    fn register_event_sink(&self, sink: Arc<dyn EventSink>);

    fn disconnect(&self) -> Result<(), DeviceError>;
}

/// Entry point into the external driver
pub trait DeviceDriver: Send + Sync {
    /// Look for up to `max` controllers. An empty result is not an error.
    fn discover(&self, max: usize, exclusive: bool) -> Result<Vec<Arc<dyn Device>>, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiimote::types::{Buttons, MotionSensingEvent, StatusEvent};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl EventSink for Recorder {
        fn on_buttons(&self, _event: &ButtonsEvent) {
            self.seen.lock().unwrap().push("buttons");
        }

        fn on_ir(&self, _event: &IrEvent) {
            self.seen.lock().unwrap().push("ir");
        }

        fn on_disconnection(&self, _device: DeviceId) {
            self.seen.lock().unwrap().push("disconnection");
        }
    }

    #[test]
    fn deliver_routes_handled_kinds_and_drops_the_rest() {
        let sink = Recorder::default();
        let device = DeviceId(1);

        deliver(&sink, &DeviceEvent::MotionSensing(MotionSensingEvent {
            device,
            roll: 0.0,
            pitch: 1.0,
            yaw: 2.0,
        }));
        deliver(&sink, &DeviceEvent::Buttons(ButtonsEvent {
            device,
            pressed: Buttons::default(),
            released: Buttons::default(),
            held: Buttons::default(),
        }));
        deliver(&sink, &DeviceEvent::Status(StatusEvent {
            device,
            battery: 0.5,
            speaker_enabled: false,
        }));
        deliver(&sink, &DeviceEvent::Ir(IrEvent { device, x: 1, y: 1 }));
        deliver(&sink, &DeviceEvent::Disconnected(device));

        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec!["buttons", "ir", "disconnection"]
        );
    }
}
