//! Static display source.
//!
//! Reports a fixed, replaceable list of monitors and binds every one of them
//! to a shared [`MockPointerBackend`]. Used on platforms without a native
//! source and by tests, which can also make enumeration or individual
//! bindings fail.

use super::{DisplayError, DisplaySource, Rect};
use crate::backend::{BackendError, MockPointerBackend, PointerBackend};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct SourceState {
    monitors: Vec<Rect>,
    unbindable: HashSet<usize>,
    enumeration_fails: bool,
}

#[derive(Clone, Default)]
pub struct StaticDisplaySource {
    state: Arc<Mutex<SourceState>>,
    pointer: MockPointerBackend,
}

impl StaticDisplaySource {
    pub fn new(monitors: Vec<Rect>) -> Self {
        let source = Self::default();
        source.set_monitors(monitors);
        source
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the monitors reported by the next detection
    pub fn set_monitors(&self, monitors: Vec<Rect>) {
        self.lock().monitors = monitors;
    }

    /// Make binding the monitor at `index` fail
    pub fn fail_binding(&self, index: usize) {
        self.lock().unbindable.insert(index);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.lock().enumeration_fails = fail;
    }

    /// The backend every bound monitor actuates
    pub fn pointer(&self) -> MockPointerBackend {
        self.pointer.clone()
    }
}

impl DisplaySource for StaticDisplaySource {
    fn enumerate(&self) -> Result<Vec<Rect>, DisplayError> {
        let state = self.lock();
        if state.enumeration_fails {
            return Err(DisplayError::Platform("display enumeration disabled".to_string()));
        }
        Ok(state.monitors.clone())
    }

    fn bind_pointer(&self, index: usize, _bounds: &Rect) -> Result<Arc<dyn PointerBackend>, BackendError> {
        if self.lock().unbindable.contains(&index) {
            return Err(BackendError::Bind {
                index,
                reason: "binding disabled".to_string(),
            });
        }
        Ok(Arc::new(self.pointer.clone()))
    }
}
