//! Backend abstraction for host pointer injection
//!
//! This module provides a unified interface for sending pointer events
//! (absolute moves, button presses, wheel ticks) to the operating system.

pub mod mock_mouse;
pub mod mouse_sendinput;

#[cfg(windows)]
pub use mouse_sendinput::MouseSendInputBackend;

pub use mock_mouse::{MockPointerBackend, PointerCommand};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend operation failed: {0}")]
    Operation(String),

    #[error("Could not bind pointer to monitor {index}: {reason}")]
    Bind { index: usize, reason: String },
}

/// Unified backend interface for pointer operations.
///
/// Coordinates are absolute host screen pixels in the virtual desktop space.
/// Implementations must be callable from the driver callback thread.
pub trait PointerBackend: Send + Sync {
    /// Move the pointer to (x, y)
    fn move_absolute(&self, x: i32, y: i32) -> Result<(), BackendError>;

    /// Press a mouse button (button down)
    fn button_down(&self, button: MouseButton) -> Result<(), BackendError>;

    /// Release a mouse button (button up)
    fn button_up(&self, button: MouseButton) -> Result<(), BackendError>;

    /// Rotate the wheel by `delta` notches. Negative scrolls up (away from the user).
    fn scroll(&self, delta: i32) -> Result<(), BackendError>;

    /// Press and release a mouse button
    fn click(&self, button: MouseButton) -> Result<(), BackendError> {
        self.button_down(button)?;
        self.button_up(button)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

#[cfg(windows)]
impl PointerBackend for MouseSendInputBackend {
    fn move_absolute(&self, x: i32, y: i32) -> Result<(), BackendError> {
        MouseSendInputBackend::move_absolute(x, y).map_err(BackendError::Operation)
    }

    fn button_down(&self, button: MouseButton) -> Result<(), BackendError> {
        MouseSendInputBackend::button_down(button.as_str()).map_err(BackendError::Operation)
    }

    fn button_up(&self, button: MouseButton) -> Result<(), BackendError> {
        MouseSendInputBackend::button_up(button.as_str()).map_err(BackendError::Operation)
    }

    fn scroll(&self, delta: i32) -> Result<(), BackendError> {
        MouseSendInputBackend::wheel(delta).map_err(BackendError::Operation)
    }
}
