//! Mock device driver for testing.
//!
//! `MockDriver` stands in for the external controller driver: discovery can
//! be scripted to fail a number of times or to find nothing at all, every
//! device command is logged and recorded, and tests can inject events as if
//! they came from the driver's callback thread. Clones share state.

use crate::wiimote::driver::{deliver, Device, DeviceDriver, DeviceError, EventSink};
use crate::wiimote::types::{DeviceEvent, DeviceId, LedPattern, SensorBarPosition, Sensitivity};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single recorded device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    SetLeds(LedPattern),
    EnableIrTracking,
    EnableMotionSensing,
    SetSensorBar(SensorBarPosition),
    SetVirtualResolution { width: u32, height: u32 },
    SetIrSensitivity(Sensitivity),
    RegisterSink,
    Disconnect,
}

/// Mock controller that logs and records commands instead of talking to hardware.
pub struct MockDevice {
    id: DeviceId,
    commands: Mutex<Vec<DeviceCommand>>,
    sinks: Mutex<Vec<Arc<dyn EventSink>>>,
    connected: AtomicBool,
}

impl MockDevice {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            commands: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Everything recorded so far, oldest first.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        lock(&self.commands).clone()
    }

    pub fn clear_commands(&self) {
        lock(&self.commands).clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn sink_count(&self) -> usize {
        lock(&self.sinks).len()
    }

    /// Deliver `event` to every registered sink, as the driver's callback thread would.
    pub fn emit(&self, event: DeviceEvent) {
        let sinks = lock(&self.sinks).clone();
        for sink in sinks {
            deliver(sink.as_ref(), &event);
        }
    }

    fn push(&self, command: DeviceCommand) {
        info!("[MOCK WIIMOTE] {}: {:?}", self.id, command);
        lock(&self.commands).push(command);
    }

    fn record(&self, command: DeviceCommand) -> Result<(), DeviceError> {
        self.push(command);
        Ok(())
    }
}

impl Device for MockDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn set_leds(&self, leds: LedPattern) -> Result<(), DeviceError> {
        self.record(DeviceCommand::SetLeds(leds))
    }

    fn enable_ir_tracking(&self) -> Result<(), DeviceError> {
        self.record(DeviceCommand::EnableIrTracking)
    }

    fn enable_motion_sensing(&self) -> Result<(), DeviceError> {
        self.record(DeviceCommand::EnableMotionSensing)
    }

    fn set_sensor_bar(&self, position: SensorBarPosition) -> Result<(), DeviceError> {
        self.record(DeviceCommand::SetSensorBar(position))
    }

    fn set_virtual_resolution(&self, width: u32, height: u32) -> Result<(), DeviceError> {
        self.record(DeviceCommand::SetVirtualResolution { width, height })
    }

    fn set_ir_sensitivity(&self, level: Sensitivity) -> Result<(), DeviceError> {
        self.record(DeviceCommand::SetIrSensitivity(level))
    }

    fn register_event_sink(&self, sink: Arc<dyn EventSink>) {
        self.push(DeviceCommand::RegisterSink);
        lock(&self.sinks).push(sink);
    }

    fn disconnect(&self) -> Result<(), DeviceError> {
        self.connected.store(false, Ordering::SeqCst);
        self.record(DeviceCommand::Disconnect)
    }
}

#[derive(Default)]
struct DriverState {
    available: bool,
    failures_left: usize,
    delay: Duration,
    next_id: u32,
    calls: usize,
    in_flight: usize,
    max_in_flight: usize,
    devices: Vec<Arc<MockDevice>>,
}

/// Mock driver with scriptable discovery.
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<DriverState>>,
}

impl MockDriver {
    /// A driver that finds a new controller on every discovery.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState {
                available: true,
                next_id: 1,
                ..DriverState::default()
            })),
        }
    }

    /// A driver that never finds anything until `set_available(true)`.
    pub fn empty() -> Self {
        let driver = Self::new();
        driver.set_available(false);
        driver
    }

    pub fn set_available(&self, available: bool) {
        lock(&self.state).available = available;
    }

    /// Make the next `count` discoveries come back empty.
    pub fn fail_next(&self, count: usize) {
        lock(&self.state).failures_left = count;
    }

    /// Make every discovery block for `delay` before answering.
    pub fn set_discovery_delay(&self, delay: Duration) {
        lock(&self.state).delay = delay;
    }

    pub fn discover_calls(&self) -> usize {
        lock(&self.state).calls
    }

    /// Highest number of discoveries that were ever running at the same time.
    pub fn max_concurrent_discoveries(&self) -> usize {
        lock(&self.state).max_in_flight
    }

    /// Every device handed out so far, oldest first.
    pub fn devices(&self) -> Vec<Arc<MockDevice>> {
        lock(&self.state).devices.clone()
    }

    pub fn last_device(&self) -> Option<Arc<MockDevice>> {
        lock(&self.state).devices.last().cloned()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceDriver for MockDriver {
    fn discover(&self, max: usize, exclusive: bool) -> Result<Vec<Arc<dyn Device>>, DeviceError> {
        let delay = {
            let mut state = lock(&self.state);
            state.calls += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = lock(&self.state);
        state.in_flight -= 1;
        debug!(
            "[MOCK WIIMOTE] discover(max={}, exclusive={}) call #{}",
            max, exclusive, state.calls
        );

        if max == 0 || !state.available {
            return Ok(Vec::new());
        }
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Ok(Vec::new());
        }

        let device = Arc::new(MockDevice::new(DeviceId(state.next_id)));
        state.next_id += 1;
        state.devices.push(Arc::clone(&device));
        info!("[MOCK WIIMOTE] Found {}", device.id());
        Ok(vec![device as Arc<dyn Device>])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_failures_then_success() {
        let driver = MockDriver::new();
        driver.fail_next(2);

        assert!(driver.discover(1, false).unwrap().is_empty());
        assert!(driver.discover(1, false).unwrap().is_empty());
        let found = driver.discover(1, false).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), DeviceId(1));
        assert_eq!(driver.discover_calls(), 3);

        let second = driver.discover(1, false).unwrap();
        assert_eq!(second[0].id(), DeviceId(2));
        assert_eq!(driver.devices().len(), 2);
    }

    #[test]
    fn empty_driver_finds_nothing() {
        let driver = MockDriver::empty();
        assert!(driver.discover(1, false).unwrap().is_empty());
        driver.set_available(true);
        assert_eq!(driver.discover(1, false).unwrap().len(), 1);
    }

    #[test]
    fn device_records_commands() {
        let device = MockDevice::new(DeviceId(9));
        device.set_leds(LedPattern::PLAYER_ONE).unwrap();
        device.set_virtual_resolution(1920, 1080).unwrap();
        device.disconnect().unwrap();

        assert_eq!(
            device.commands(),
            vec![
                DeviceCommand::SetLeds(LedPattern::PLAYER_ONE),
                DeviceCommand::SetVirtualResolution { width: 1920, height: 1080 },
                DeviceCommand::Disconnect,
            ]
        );
        assert!(!device.is_connected());
    }
}
