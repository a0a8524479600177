//! Persisted preferences
//!
//! Preferences are a flat TOML table stored in the user's home directory:
//!
//! ```toml
//! sensitivity = 3
//! sensorBarPosition = "above"
//! screen0Selected = true
//! screen1Selected = false
//! ```
//!
//! Values are read leniently: a value of the wrong type or out of range logs
//! a warning and falls back to its default instead of failing the whole load.

use crate::session::SessionConfig;
use crate::wiimote::types::{SensorBarPosition, Sensitivity};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Preferences file name, placed in the home directory
pub const CONFIG_FILENAME: &str = ".wiimotemouse.toml";

pub const KEY_SENSITIVITY: &str = "sensitivity";
pub const KEY_SENSOR_BAR: &str = "sensorBarPosition";

/// Key holding the selection flag of monitor `index`
pub fn screen_key(index: usize) -> String {
    format!("screen{}Selected", index)
}

/// Get the preferences path (home directory, or the current dir as a fallback)
pub fn default_config_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(CONFIG_FILENAME),
        None => PathBuf::from(CONFIG_FILENAME),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse preferences: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Flat key/value preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    entries: toml::Table,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preferences written on first run
    pub fn with_defaults(monitor_count: usize) -> Self {
        let mut prefs = Self::new();
        prefs.set_sensitivity(Sensitivity::default());
        prefs.set_sensor_bar(SensorBarPosition::default());
        for index in 0..monitor_count {
            prefs.set_screen_selected(index, true);
        }
        prefs
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.entries.get(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Deserialize `key` as `T`, or `default` when it is absent or invalid.
    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.entries.get(key) else {
            return default;
        };
        let parsed: Result<T, toml::de::Error> = value.clone().try_into();
        match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring {} = {}: {}", key, value, e);
                default
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: String, value: T) {
        match toml::Value::try_from(value) {
            Ok(value) => {
                self.entries.insert(key, value);
            }
            Err(e) => warn!("Could not store {}: {}", key, e),
        }
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.read(KEY_SENSITIVITY, Sensitivity::default())
    }

    pub fn set_sensitivity(&mut self, level: Sensitivity) {
        self.write(KEY_SENSITIVITY.to_string(), level);
    }

    pub fn sensor_bar(&self) -> SensorBarPosition {
        self.read(KEY_SENSOR_BAR, SensorBarPosition::default())
    }

    pub fn set_sensor_bar(&mut self, position: SensorBarPosition) {
        self.write(KEY_SENSOR_BAR.to_string(), position);
    }

    /// Whether monitor `index` is selected; monitors without an entry are.
    pub fn screen_selected(&self, index: usize) -> bool {
        self.read(&screen_key(index), true)
    }

    pub fn set_screen_selected(&mut self, index: usize, selected: bool) {
        self.write(screen_key(index), selected);
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sensitivity: self.sensitivity(),
            sensor_bar: self.sensor_bar(),
        }
    }
}

/// Where preferences are loaded from and saved to
pub trait ConfigStore: Send + Sync {
    /// Stored preferences, or `None` if nothing has been saved yet
    fn load(&self) -> Result<Option<Preferences>, ConfigError>;

    fn save(&self, prefs: &Preferences) -> Result<(), ConfigError>;
}

/// TOML file store
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at [`default_config_path`]
    pub fn in_home() -> Self {
        Self::new(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Option<Preferences>, ConfigError> {
        if !self.path.exists() {
            debug!("No preferences file at: {}", self.path.display());
            return Ok(None);
        }

        info!("Loading preferences from: {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)?;
        let prefs = Preferences::from_toml(&content)?;
        debug!("  - {} entries", prefs.len());
        Ok(Some(prefs))
    }

    fn save(&self, prefs: &Preferences) -> Result<(), ConfigError> {
        let content = prefs.to_toml()?;
        std::fs::write(&self.path, content)?;
        debug!("Saved preferences to: {}", self.path.display());
        Ok(())
    }
}

/// In-memory store. Clones share contents; saves can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    saved: Arc<Mutex<Option<Preferences>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(prefs: Preferences) -> Self {
        let store = Self::new();
        *store.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(prefs);
        store
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Option<Preferences> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Option<Preferences>, ConfigError> {
        Ok(self.saved())
    }

    fn save(&self, prefs: &Preferences) -> Result<(), ConfigError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "saving disabled",
            )));
        }
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(prefs.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
