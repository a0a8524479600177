//! Mock pointer backend for testing.
//!
//! This backend logs pointer events instead of actually sending them
//! to the OS, and records them so tests can assert on exactly what the
//! router emitted and in what order. Clones share one recording.

use super::{BackendError, MouseButton, PointerBackend};
use log::info;
use std::sync::{Arc, Mutex, PoisonError};

/// A single recorded pointer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCommand {
    MoveAbsolute { x: i32, y: i32 },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Scroll(i32),
}

/// Mock pointer backend that logs and records events instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct MockPointerBackend {
    commands: Arc<Mutex<Vec<PointerCommand>>>,
}

impl MockPointerBackend {
    /// Create a new mock pointer backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn commands(&self) -> Vec<PointerCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded absolute moves only.
    pub fn moves(&self) -> Vec<(i32, i32)> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                PointerCommand::MoveAbsolute { x, y } => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, command: PointerCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl PointerBackend for MockPointerBackend {
    fn move_absolute(&self, x: i32, y: i32) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Move absolute: x={}, y={}", x, y);
        self.record(PointerCommand::MoveAbsolute { x, y });
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Button DOWN: {}", button.as_str());
        self.record(PointerCommand::ButtonDown(button));
        Ok(())
    }

    fn button_up(&self, button: MouseButton) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Button UP: {}", button.as_str());
        self.record(PointerCommand::ButtonUp(button));
        Ok(())
    }

    fn scroll(&self, delta: i32) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Scroll: {}", delta);
        self.record(PointerCommand::Scroll(delta));
        Ok(())
    }
}
