//! Shared session state
//!
//! The live device handle and the device-side settings it must carry are
//! kept behind one lock. The device remembers nothing between connections,
//! so every newly installed handle receives the full settings.
//!
//! Lock order: this lock comes after the supervisor's connection lock and the
//! mapper's display lock; nothing is acquired while it is held.

use crate::display::VirtualRegion;
use crate::wiimote::driver::{Device, DeviceError, EventSink};
use crate::wiimote::types::{DeviceId, LedPattern, SensorBarPosition, Sensitivity};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// User-selected settings that are pushed to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub sensitivity: Sensitivity,
    pub sensor_bar: SensorBarPosition,
}

struct SessionState {
    config: SessionConfig,
    /// Size of the selectable screen area; `None` while no monitor is selected
    resolution: Option<(u32, u32)>,
    device: Option<Arc<dyn Device>>,
}

/// Session handle shared by the manager, the mapper, the supervisor and the router
pub struct SharedSession {
    state: Mutex<SessionState>,
}

/// Log a failed device command; the session carries on.
fn check(result: Result<(), DeviceError>) {
    if let Err(e) = result {
        warn!("{}", e);
    }
}

impl SharedSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: Mutex::new(SessionState {
                config,
                resolution: None,
                device: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> SessionConfig {
        self.lock().config
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.lock().resolution
    }

    pub fn device(&self) -> Option<Arc<dyn Device>> {
        self.lock().device.clone()
    }

    pub fn device_id(&self) -> Option<DeviceId> {
        self.lock().device.as_ref().map(|d| d.id())
    }

    pub fn is_connected(&self) -> bool {
        self.lock().device.is_some()
    }

    /// Whether `id` belongs to the currently installed device
    pub fn is_current(&self, id: DeviceId) -> bool {
        self.device_id() == Some(id)
    }

    /// Update the IR sensitivity. Returns true when it was applied to a live device.
    pub fn set_sensitivity(&self, sensitivity: Sensitivity) -> bool {
        let mut state = self.lock();
        state.config.sensitivity = sensitivity;
        match &state.device {
            Some(device) => {
                check(device.set_ir_sensitivity(sensitivity));
                true
            }
            None => false,
        }
    }

    /// Update the sensor bar position. Returns true when it was applied to a live device.
    pub fn set_sensor_bar(&self, position: SensorBarPosition) -> bool {
        let mut state = self.lock();
        state.config.sensor_bar = position;
        match &state.device {
            Some(device) => {
                check(device.set_sensor_bar(position));
                true
            }
            None => false,
        }
    }

    /// Record the size of `region` as the device's operating resolution and
    /// push it to the live device. Degenerate regions are never pushed.
    pub fn set_resolution(&self, region: &VirtualRegion) {
        let mut state = self.lock();
        state.resolution = region.resolution();
        match (state.resolution, &state.device) {
            (Some((width, height)), Some(device)) => {
                debug!("Virtual resolution -> {}x{}", width, height);
                check(device.set_virtual_resolution(width, height));
            }
            (None, _) => debug!("No monitor selected; virtual resolution left unchanged"),
            _ => {}
        }
    }

    /// Make `device` the session's device and push every setting to it.
    pub fn install(&self, device: Arc<dyn Device>, sink: Option<Arc<dyn EventSink>>) {
        let mut state = self.lock();

        check(device.set_leds(LedPattern::PLAYER_ONE));
        check(device.enable_ir_tracking());
        check(device.enable_motion_sensing());
        check(device.set_sensor_bar(state.config.sensor_bar));
        if let Some((width, height)) = state.resolution {
            check(device.set_virtual_resolution(width, height));
        }
        check(device.set_ir_sensitivity(state.config.sensitivity));
        match sink {
            Some(sink) => device.register_event_sink(sink),
            None => warn!("No event sink attached; {} events will be dropped", device.id()),
        }

        info!("✓ {} connected", device.id());
        state.device = Some(device);
    }

    /// Remove and return the current device, if any.
    pub fn take_device(&self) -> Option<Arc<dyn Device>> {
        self.lock().device.take()
    }

    /// Drop the current device if it is `id`. Returns false for stale ids.
    pub fn clear_if_current(&self, id: DeviceId) -> bool {
        let mut state = self.lock();
        match &state.device {
            Some(device) if device.id() == id => {
                state.device = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiimote::mock::{DeviceCommand, MockDevice};

    fn region(width: i32, height: i32) -> VirtualRegion {
        VirtualRegion { x: 0, y: 0, width, height }
    }

    #[test]
    fn install_pushes_full_config() {
        let session = SharedSession::new(SessionConfig {
            sensitivity: Sensitivity::new(5).unwrap(),
            sensor_bar: SensorBarPosition::Below,
        });
        session.set_resolution(&region(1920, 1080));

        let device = Arc::new(MockDevice::new(DeviceId(1)));
        session.install(device.clone(), None);

        assert_eq!(
            device.commands(),
            vec![
                DeviceCommand::SetLeds(LedPattern::PLAYER_ONE),
                DeviceCommand::EnableIrTracking,
                DeviceCommand::EnableMotionSensing,
                DeviceCommand::SetSensorBar(SensorBarPosition::Below),
                DeviceCommand::SetVirtualResolution { width: 1920, height: 1080 },
                DeviceCommand::SetIrSensitivity(Sensitivity::new(5).unwrap()),
            ]
        );
        assert_eq!(session.device_id(), Some(DeviceId(1)));
    }

    #[test]
    fn degenerate_region_is_not_pushed() {
        let session = SharedSession::new(SessionConfig::default());
        let device = Arc::new(MockDevice::new(DeviceId(1)));
        session.install(device.clone(), None);
        device.clear_commands();

        session.set_resolution(&VirtualRegion::EMPTY);
        assert!(device.commands().is_empty());
        assert_eq!(session.resolution(), None);

        session.set_resolution(&region(800, 600));
        assert_eq!(
            device.commands(),
            vec![DeviceCommand::SetVirtualResolution { width: 800, height: 600 }]
        );
    }

    #[test]
    fn setters_only_touch_a_live_device() {
        let session = SharedSession::new(SessionConfig::default());
        let level = Sensitivity::new(2).unwrap();
        assert!(!session.set_sensitivity(level));
        assert_eq!(session.config().sensitivity, level);

        let device = Arc::new(MockDevice::new(DeviceId(4)));
        session.install(device.clone(), None);
        device.clear_commands();

        assert!(session.set_sensor_bar(SensorBarPosition::Below));
        assert_eq!(
            device.commands(),
            vec![DeviceCommand::SetSensorBar(SensorBarPosition::Below)]
        );
    }

    #[test]
    fn stale_ids_do_not_clear() {
        let session = SharedSession::new(SessionConfig::default());
        session.install(Arc::new(MockDevice::new(DeviceId(2))), None);

        assert!(!session.clear_if_current(DeviceId(1)));
        assert!(session.is_current(DeviceId(2)));
        assert!(session.clear_if_current(DeviceId(2)));
        assert!(!session.is_connected());
        assert!(session.take_device().is_none());
    }
}
