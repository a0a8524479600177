//! High-level bridge manager
//!
//! Owns the mapper, the session, the supervisor and the router, and exposes
//! the user intents: connect, disconnect, screen selection, sensitivity and
//! sensor bar position. Every intent that changes a preference persists it.

use crate::display::{DisplaySource, DisplaySpaceMapper, Monitor, VirtualRegion};
use crate::mapping::config::{ConfigStore, Preferences};
use crate::mapping::router::InputEventRouter;
use crate::session::{SessionConfig, SharedSession};
use crate::supervisor::{ConnectionState, ConnectionSupervisor, SupervisorSettings};
use crate::wiimote::driver::{DeviceDriver, EventSink};
use crate::wiimote::types::{SensorBarPosition, Sensitivity};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Collaborators the manager is built from
pub struct BridgeParts {
    pub driver: Arc<dyn DeviceDriver>,
    pub display_source: Arc<dyn DisplaySource>,
    pub store: Box<dyn ConfigStore>,
    pub settings: SupervisorSettings,
}

/// Manager for the Wii Remote to pointer bridge
pub struct BridgeManager {
    display: Arc<DisplaySpaceMapper>,
    session: Arc<SharedSession>,
    supervisor: Arc<ConnectionSupervisor>,
    router: Arc<InputEventRouter>,
    store: Box<dyn ConfigStore>,
    /// Never held while another lock is taken
    prefs: Mutex<Preferences>,
}

impl BridgeManager {
    /// Load preferences, detect screens and wire the components together.
    pub fn new(parts: BridgeParts) -> Self {
        let BridgeParts {
            driver,
            display_source,
            store,
            settings,
        } = parts;

        let loaded = match store.load() {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("Could not load preferences, using defaults: {}", e);
                Some(Preferences::new())
            }
        };
        let first_run = loaded.is_none();
        let prefs = loaded.unwrap_or_default();

        let config = prefs.session_config();
        info!(
            "Session settings: sensitivity={} sensor bar={}",
            config.sensitivity, config.sensor_bar
        );

        let session = Arc::new(SharedSession::new(config));
        let display = Arc::new(DisplaySpaceMapper::new(display_source, Arc::clone(&session)));
        let supervisor = Arc::new(ConnectionSupervisor::new(driver, Arc::clone(&session), settings));
        let router = Arc::new(InputEventRouter::new(
            Arc::clone(&display),
            Arc::clone(&supervisor),
        ));
        supervisor.attach_sink(Arc::downgrade(&router) as Weak<dyn EventSink>);

        let manager = Self {
            display,
            session,
            supervisor,
            router,
            store,
            prefs: Mutex::new(prefs),
        };

        let monitors = manager.display.detect();
        manager.apply_saved_selection(0);

        if first_run {
            info!("No saved preferences; writing defaults");
            let defaults = Preferences::with_defaults(monitors.len());
            *manager.prefs() = defaults;
            manager.persist();
        }

        manager
    }

    fn prefs(&self) -> MutexGuard<'_, Preferences> {
        self.prefs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Save the current preferences. Failures are logged and otherwise ignored.
    fn persist(&self) {
        let prefs = self.prefs();
        if let Err(e) = self.store.save(&prefs) {
            warn!("Failed to save preferences: {}", e);
        }
    }

    /// Deselect monitors from index `from` on that were saved as deselected.
    fn apply_saved_selection(&self, from: usize) {
        let count = self.display.monitors().len();
        let deselected: Vec<usize> = {
            let prefs = self.prefs();
            (from..count).filter(|&i| !prefs.screen_selected(i)).collect()
        };
        for index in deselected {
            debug!("Monitor {} deselected by saved preferences", index);
            self.display.set_selected(index, false);
        }
    }

    /// Connect, blocking until a device is installed or the attempt is cancelled.
    pub fn connect(&self) -> bool {
        self.supervisor.connect()
    }

    /// Start connecting in the background.
    pub fn start(&self) {
        info!("Looking for a Wii Remote (press 1 and 2 together)...");
        self.supervisor.start();
    }

    /// Cancel any connection attempt and release the device.
    pub fn shutdown(&self) {
        self.supervisor.disconnect();
    }

    /// Re-query the host's monitors and return the new region.
    pub fn redetect_screens(&self) -> VirtualRegion {
        let known = self.display.monitors().len();
        self.display.detect();
        self.apply_saved_selection(known);
        self.display.region()
    }

    /// Select or deselect a monitor, persist the choice and return the new region.
    pub fn set_monitor_selected(&self, index: usize, selected: bool) -> VirtualRegion {
        let region = self.display.set_selected(index, selected);
        if index < self.display.monitors().len() {
            self.prefs().set_screen_selected(index, selected);
            self.persist();
        }
        region
    }

    pub fn set_sensitivity(&self, sensitivity: Sensitivity) {
        let applied = self.session.set_sensitivity(sensitivity);
        info!(
            "Sensitivity -> {}{}",
            sensitivity,
            if applied { "" } else { " (applied on next connect)" }
        );
        self.prefs().set_sensitivity(sensitivity);
        self.persist();
    }

    pub fn set_sensor_bar(&self, position: SensorBarPosition) {
        let applied = self.session.set_sensor_bar(position);
        info!(
            "Sensor bar -> {}{}",
            position,
            if applied { "" } else { " (applied on next connect)" }
        );
        self.prefs().set_sensor_bar(position);
        self.persist();
    }

    pub fn region(&self) -> VirtualRegion {
        self.display.region()
    }

    pub fn monitors(&self) -> Vec<Monitor> {
        self.display.monitors()
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session.config()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Wait up to `timeout` for the connection to reach `target`.
    pub fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> bool {
        self.supervisor.wait_for_state(target, timeout)
    }

    /// Snapshot of the in-memory preferences
    pub fn preferences(&self) -> Preferences {
        self.prefs().clone()
    }

    /// Event sink registered on connected devices
    pub fn router(&self) -> Arc<InputEventRouter> {
        Arc::clone(&self.router)
    }
}

impl Drop for BridgeManager {
    fn drop(&mut self) {
        if self.supervisor.state() != ConnectionState::Idle {
            info!("Shutting down bridge (Drop)...");
            self.supervisor.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Rect, StaticDisplaySource};
    use crate::mapping::config::MemoryConfigStore;
    use crate::wiimote::mock::{DeviceCommand, MockDriver};

    fn settings() -> SupervisorSettings {
        SupervisorSettings {
            retry_interval: Duration::from_millis(10),
        }
    }

    fn manager(store: MemoryConfigStore, monitors: Vec<Rect>) -> (BridgeManager, MockDriver, StaticDisplaySource) {
        let driver = MockDriver::new();
        let source = StaticDisplaySource::new(monitors);
        let manager = BridgeManager::new(BridgeParts {
            driver: Arc::new(driver.clone()),
            display_source: Arc::new(source.clone()),
            store: Box::new(store),
            settings: settings(),
        });
        (manager, driver, source)
    }

    fn two_monitors() -> Vec<Rect> {
        vec![Rect::new(0, 0, 1920, 1080), Rect::new(1920, 0, 1280, 1024)]
    }

    #[test]
    fn first_run_writes_defaults() {
        let store = MemoryConfigStore::new();
        let (manager, _, _) = manager(store.clone(), two_monitors());

        assert_eq!(manager.session_config(), SessionConfig::default());
        assert_eq!(store.saved(), Some(Preferences::with_defaults(2)));
        assert_eq!(manager.region(), VirtualRegion { x: 0, y: 0, width: 3200, height: 1080 });
    }

    #[test]
    fn saved_preferences_seed_the_session() {
        let mut prefs = Preferences::new();
        prefs.set_sensitivity(Sensitivity::new(5).unwrap());
        prefs.set_sensor_bar(SensorBarPosition::Below);
        prefs.set_screen_selected(0, false);
        let store = MemoryConfigStore::with_preferences(prefs);

        let (manager, _, _) = manager(store.clone(), two_monitors());

        assert_eq!(manager.session_config().sensitivity.get(), 5);
        assert_eq!(manager.session_config().sensor_bar, SensorBarPosition::Below);
        assert!(!manager.monitors()[0].selected);
        assert_eq!(manager.region(), VirtualRegion { x: 1920, y: 0, width: 1280, height: 1024 });
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn sensitivity_while_connected_reaches_device() {
        let store = MemoryConfigStore::new();
        let (manager, driver, _) = manager(store.clone(), two_monitors());
        assert!(manager.connect());

        let device = driver.last_device().unwrap();
        device.clear_commands();
        let level = Sensitivity::new(1).unwrap();
        manager.set_sensitivity(level);

        assert_eq!(device.commands(), vec![DeviceCommand::SetIrSensitivity(level)]);
        assert_eq!(store.saved().unwrap().sensitivity(), level);
        manager.shutdown();
    }

    #[test]
    fn sensor_bar_while_disconnected_is_applied_on_connect() {
        let store = MemoryConfigStore::new();
        let (manager, driver, _) = manager(store.clone(), two_monitors());

        manager.set_sensor_bar(SensorBarPosition::Below);
        assert!(driver.devices().is_empty());
        assert_eq!(store.saved().unwrap().sensor_bar(), SensorBarPosition::Below);

        assert!(manager.connect());
        let device = driver.last_device().unwrap();
        assert!(device
            .commands()
            .contains(&DeviceCommand::SetSensorBar(SensorBarPosition::Below)));
        manager.shutdown();
    }

    #[test]
    fn monitor_toggle_is_persisted() {
        let store = MemoryConfigStore::new();
        let (manager, _, _) = manager(store.clone(), two_monitors());

        let region = manager.set_monitor_selected(1, false);
        assert_eq!(region, VirtualRegion { x: 0, y: 0, width: 1920, height: 1080 });
        assert!(!store.saved().unwrap().screen_selected(1));

        manager.set_monitor_selected(1, true);
        assert!(store.saved().unwrap().screen_selected(1));
        assert_eq!(manager.region().width, 3200);
    }

    #[test]
    fn unknown_monitor_is_not_persisted() {
        let store = MemoryConfigStore::new();
        let (manager, _, _) = manager(store.clone(), two_monitors());
        let saves = store.save_count();

        manager.set_monitor_selected(7, false);
        assert_eq!(store.save_count(), saves);
        assert!(manager.preferences().get("screen7Selected").is_none());
    }

    #[test]
    fn failed_save_keeps_in_memory_change() {
        let store = MemoryConfigStore::new();
        let (manager, _, _) = manager(store.clone(), two_monitors());
        store.fail_saves(true);

        let level = Sensitivity::new(2).unwrap();
        manager.set_sensitivity(level);
        manager.set_monitor_selected(0, false);

        assert_eq!(manager.session_config().sensitivity, level);
        assert_eq!(manager.preferences().sensitivity(), level);
        assert!(!manager.monitors()[0].selected);
        assert_eq!(store.saved().unwrap().sensitivity(), Sensitivity::default());
    }

    #[test]
    fn redetect_applies_saved_selection_to_new_monitors() {
        let store = MemoryConfigStore::new();
        let (manager, _, source) = manager(store, two_monitors());
        manager.set_monitor_selected(1, false);

        source.set_monitors(vec![Rect::new(0, 0, 1920, 1080)]);
        manager.redetect_screens();
        source.set_monitors(two_monitors());
        let region = manager.redetect_screens();

        assert!(!manager.monitors()[1].selected);
        assert_eq!(region, VirtualRegion { x: 0, y: 0, width: 1920, height: 1080 });
    }

    #[test]
    fn drop_releases_device() {
        let (manager, driver, _) = manager(MemoryConfigStore::new(), two_monitors());
        assert!(manager.connect());
        let device = driver.last_device().unwrap();

        drop(manager);
        assert!(!device.is_connected());
    }
}
