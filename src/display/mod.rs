//! Host display topology and the virtual pointer region
//!
//! The mapper keeps the detected monitors, which of them are selected, the
//! pointer actuator bound to each one, and the bounding box of the selected
//! monitors. That bounding box is the area the controller's IR coordinates
//! are mapped into, so every change to it is forwarded to the session (and
//! from there to a connected device).
//!
//! Lock order: the display lock is taken after the supervisor's connection
//! lock and before the session lock.

pub mod mock;
#[cfg(windows)]
pub mod windows;

pub use mock::StaticDisplaySource;
#[cfg(windows)]
pub use self::windows::WindowsDisplaySource;

use crate::backend::{BackendError, PointerBackend};
use crate::session::SharedSession;
use log::{debug, info, warn};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("platform API error while enumerating monitors: {0}")]
    Platform(String),
}

/// Screen rectangle in host pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }
}

/// A detected monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monitor {
    pub index: usize,
    pub bounds: Rect,
    pub selected: bool,
    /// Whether a pointer actuator could be bound to this monitor
    pub bound: bool,
}

/// Bounding box of the selected monitors, in host pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl VirtualRegion {
    /// Region used when no monitor is selected
    pub const EMPTY: VirtualRegion = VirtualRegion { x: 0, y: 0, width: 0, height: 0 };

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Size to hand to the device, or `None` for a degenerate region
    pub fn resolution(&self) -> Option<(u32, u32)> {
        if self.is_degenerate() {
            None
        } else {
            Some((self.width as u32, self.height as u32))
        }
    }
}

impl Default for VirtualRegion {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Union bounding box of the selected monitors; `EMPTY` when none is selected.
pub fn compute_region(monitors: &[Monitor]) -> VirtualRegion {
    let mut selected = monitors.iter().filter(|m| m.selected).map(|m| m.bounds);

    let Some(first) = selected.next() else {
        return VirtualRegion::EMPTY;
    };

    let (min_x, min_y, max_x, max_y) = selected.fold(
        (first.x, first.y, first.right(), first.bottom()),
        |(min_x, min_y, max_x, max_y), b| {
            (min_x.min(b.x), min_y.min(b.y), max_x.max(b.right()), max_y.max(b.bottom()))
        },
    );

    VirtualRegion {
        x: min_x,
        y: min_y,
        width: max_x.saturating_sub(min_x),
        height: max_y.saturating_sub(min_y),
    }
}

/// Where monitors and their pointer actuators come from.
pub trait DisplaySource: Send + Sync {
    /// Current monitor bounds. The primary monitor comes first.
    fn enumerate(&self) -> Result<Vec<Rect>, DisplayError>;

    /// Bind a pointer actuator to the monitor at `index`.
    fn bind_pointer(&self, index: usize, bounds: &Rect) -> Result<Arc<dyn PointerBackend>, BackendError>;
}

#[derive(Default)]
struct DisplayState {
    monitors: Vec<Monitor>,
    pointers: Vec<Option<Arc<dyn PointerBackend>>>,
    region: VirtualRegion,
}

/// Owner of the monitor set and the virtual region derived from it
pub struct DisplaySpaceMapper {
    source: Arc<dyn DisplaySource>,
    session: Arc<SharedSession>,
    state: RwLock<DisplayState>,
}

impl DisplaySpaceMapper {
    /// Create a mapper with no monitors; call [`detect`](Self::detect) to populate it.
    pub fn new(source: Arc<dyn DisplaySource>, session: Arc<SharedSession>) -> Self {
        Self {
            source,
            session,
            state: RwLock::new(DisplayState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DisplayState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DisplayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Query the host for its monitors and replace the monitor set.
    ///
    /// Selection flags survive by index; new monitors start selected. A
    /// monitor whose pointer binding fails stays listed but unbound. If the
    /// host cannot be queried at all, the previous set is kept.
    pub fn detect(&self) -> Vec<Monitor> {
        let bounds = match self.source.enumerate() {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!("Screen detection failed, keeping previous monitors: {}", e);
                return self.monitors();
            }
        };

        let pointers: Vec<Option<Arc<dyn PointerBackend>>> = bounds
            .iter()
            .enumerate()
            .map(|(index, b)| match self.source.bind_pointer(index, b) {
                Ok(pointer) => Some(pointer),
                Err(e) => {
                    warn!("Monitor {} excluded from pointer output: {}", index, e);
                    None
                }
            })
            .collect();

        let mut state = self.write();
        let monitors: Vec<Monitor> = bounds
            .into_iter()
            .enumerate()
            .map(|(index, b)| Monitor {
                index,
                bounds: b,
                selected: state.monitors.get(index).map_or(true, |m| m.selected),
                bound: pointers[index].is_some(),
            })
            .collect();

        info!("Detected {} monitor(s)", monitors.len());
        for m in &monitors {
            debug!(
                "  Monitor {}: {}x{} at ({}, {}) selected={} bound={}",
                m.index, m.bounds.width, m.bounds.height, m.bounds.x, m.bounds.y, m.selected, m.bound
            );
        }

        state.monitors = monitors.clone();
        state.pointers = pointers;
        self.recompute(&mut state);
        monitors
    }

    /// Select or deselect one monitor and return the resulting region.
    pub fn set_selected(&self, index: usize, selected: bool) -> VirtualRegion {
        let mut state = self.write();
        match state.monitors.get_mut(index) {
            Some(monitor) => monitor.selected = selected,
            None => {
                warn!("No monitor {} to {}", index, if selected { "select" } else { "deselect" });
                return state.region;
            }
        }
        self.recompute(&mut state)
    }

    fn recompute(&self, state: &mut DisplayState) -> VirtualRegion {
        state.region = compute_region(&state.monitors);
        info!(
            "Pointer region: {}x{} at ({}, {})",
            state.region.width, state.region.height, state.region.x, state.region.y
        );
        self.session.set_resolution(&state.region);
        state.region
    }

    /// Snapshot of the current region
    pub fn region(&self) -> VirtualRegion {
        self.read().region
    }

    /// Snapshot of the current monitor set
    pub fn monitors(&self) -> Vec<Monitor> {
        self.read().monitors.clone()
    }

    /// Actuator of the primary monitor, `None` when it could not be bound
    pub fn pointer(&self) -> Option<Arc<dyn PointerBackend>> {
        self.pointer_for(0)
    }

    pub fn pointer_for(&self, index: usize) -> Option<Arc<dyn PointerBackend>> {
        self.read().pointers.get(index).cloned().flatten()
    }
}
