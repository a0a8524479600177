//! Windows display source via `EnumDisplayMonitors` / `GetMonitorInfoW`.
//!
//! Monitors are reported in virtual-desktop pixels with the primary monitor
//! first. Every monitor is actuated through SendInput, which addresses the
//! whole virtual desktop, so binding never fails here.

use super::{DisplayError, DisplaySource, Rect};
use crate::backend::{BackendError, MouseSendInputBackend, PointerBackend};
use std::sync::Arc;
use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO};

/// MONITORINFOF_PRIMARY
const PRIMARY_FLAG: u32 = 1;

#[derive(Clone, Copy, Debug, Default)]
pub struct WindowsDisplaySource;

impl WindowsDisplaySource {
    pub fn new() -> Self {
        Self
    }
}

impl DisplaySource for WindowsDisplaySource {
    fn enumerate(&self) -> Result<Vec<Rect>, DisplayError> {
        let mut found: Vec<(bool, Rect)> = Vec::new();

        // SAFETY: the callback only runs inside this call and `found` outlives it.
        // A null HDC enumerates every monitor of the virtual desktop.
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(monitor_enum_proc),
                LPARAM(&mut found as *mut Vec<(bool, Rect)> as isize),
            )
        };

        if !ok.as_bool() {
            return Err(DisplayError::Platform("EnumDisplayMonitors failed".to_string()));
        }
        if found.is_empty() {
            return Err(DisplayError::Platform(
                "EnumDisplayMonitors returned no monitors".to_string(),
            ));
        }

        // Stable sort keeps the OS order among secondaries.
        found.sort_by_key(|(primary, _)| !*primary);
        Ok(found.into_iter().map(|(_, rect)| rect).collect())
    }

    fn bind_pointer(&self, _index: usize, _bounds: &Rect) -> Result<Arc<dyn PointerBackend>, BackendError> {
        Ok(Arc::new(MouseSendInputBackend))
    }
}

/// # Safety
///
/// Called by Win32 inside `EnumDisplayMonitors`; `lparam` must point to the
/// `Vec<(bool, Rect)>` passed there.
unsafe extern "system" fn monitor_enum_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _clip: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<(bool, Rect)>);

    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };

    if GetMonitorInfoW(hmonitor, &mut info).as_bool() {
        let rc = info.rcMonitor;
        found.push((
            info.dwFlags & PRIMARY_FLAG != 0,
            Rect::new(rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top),
        ));
    }

    BOOL(1)
}
