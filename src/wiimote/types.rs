//! Wii Remote type definitions
//!
//! This module defines the basic data types exchanged with the device driver:
//! device identity, device-side settings, button states and the events the
//! driver delivers on its callback thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity of a connected controller, as assigned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wiimote#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingError {
    #[error("IR sensitivity must be between {min} and {max}, got {0}", min = Sensitivity::MIN, max = Sensitivity::MAX)]
    SensitivityOutOfRange(u8),

    #[error("Unknown sensor bar position '{0}' (expected 'above' or 'below')")]
    UnknownSensorBarPosition(String),
}

/// IR camera sensitivity level (1 = least sensitive, 5 = most)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Sensitivity(u8);

impl Sensitivity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Result<Self, SettingError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(SettingError::SensitivityOutOfRange(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Sensitivity {
    type Error = SettingError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Sensitivity> for u8 {
    fn from(sensitivity: Sensitivity) -> Self {
        sensitivity.0
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the IR sensor bar sits relative to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorBarPosition {
    #[default]
    Above,
    Below,
}

impl SensorBarPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorBarPosition::Above => "above",
            SensorBarPosition::Below => "below",
        }
    }
}

impl FromStr for SensorBarPosition {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(SensorBarPosition::Above),
            "below" => Ok(SensorBarPosition::Below),
            _ => Err(SettingError::UnknownSensorBarPosition(s.to_string())),
        }
    }
}

impl fmt::Display for SensorBarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player LED pattern, bit 0 = LED 1 ... bit 3 = LED 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPattern(pub u8);

impl LedPattern {
    pub const PLAYER_ONE: LedPattern = LedPattern(0b0001);

    pub fn is_lit(self, led: u8) -> bool {
        led < 4 && self.0 & (1 << led) != 0
    }
}

/// Generic button states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons {
    // Face buttons
    pub a: bool,
    pub b: bool,
    pub one: bool,
    pub two: bool,

    // System buttons
    pub plus: bool,
    pub minus: bool,
    pub home: bool,

    // D-pad
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Button transition report. `pressed`/`released` hold the edges seen by this
/// report, `held` every button currently down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonsEvent {
    pub device: DeviceId,
    pub pressed: Buttons,
    pub released: Buttons,
    pub held: Buttons,
}

/// IR pointer position in device virtual-resolution coordinates.
/// Zero on either axis means the camera has no fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrEvent {
    pub device: DeviceId,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSensingEvent {
    pub device: DeviceId,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    Nunchuk,
    ClassicController,
    GuitarHero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionEvent {
    Inserted { device: DeviceId, expansion: Expansion },
    Removed { device: DeviceId, expansion: Expansion },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusEvent {
    pub device: DeviceId,
    /// Battery level, 0.0 to 1.0
    pub battery: f32,
    pub speaker_enabled: bool,
}

/// Everything the driver can report on its callback thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    Buttons(ButtonsEvent),
    Ir(IrEvent),
    MotionSensing(MotionSensingEvent),
    Expansion(ExpansionEvent),
    Status(StatusEvent),
    Disconnected(DeviceId),
}

impl DeviceEvent {
    /// The device this event came from
    pub fn device(&self) -> DeviceId {
        match self {
            DeviceEvent::Buttons(e) => e.device,
            DeviceEvent::Ir(e) => e.device,
            DeviceEvent::MotionSensing(e) => e.device,
            DeviceEvent::Expansion(ExpansionEvent::Inserted { device, .. })
            | DeviceEvent::Expansion(ExpansionEvent::Removed { device, .. }) => *device,
            DeviceEvent::Status(e) => e.device,
            DeviceEvent::Disconnected(device) => *device,
        }
    }
}
