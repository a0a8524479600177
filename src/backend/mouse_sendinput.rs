//! Windows SendInput pointer backend (absolute movement).
//!
//! Sends absolute pointer motion, button transitions and wheel notches via
//! Win32 SendInput. Absolute coordinates are virtual-desktop pixels; they are
//! normalized to the [0, 65535] range SendInput expects with
//! `MOUSEEVENTF_VIRTUALDESK`, so every monitor of a multi-monitor desktop is
//! reachable.
//!
//! Safety: wraps SendInput and converts errors to String.

#[cfg(windows)]
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK, MOUSEEVENTF_WHEEL,
    MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

/// One wheel notch, in SendInput units.
#[cfg(windows)]
const WHEEL_DELTA: i32 = 120;

#[cfg(windows)]
#[derive(Clone, Copy, Debug, Default)]
pub struct MouseSendInputBackend;

#[cfg(windows)]
impl MouseSendInputBackend {
    /// Move the pointer to virtual-desktop pixel (x, y).
    pub fn move_absolute(x: i32, y: i32) -> Result<(), String> {
        let (dx, dy) = Self::normalize(x, y);
        Self::send(dx, dy, 0, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK)
    }

    /// Press a mouse button (button down event).
    pub fn button_down(button: &str) -> Result<(), String> {
        let flags = Self::parse_button_down_flag(button)?;
        Self::send(0, 0, 0, flags)
    }

    /// Release a mouse button (button up event).
    pub fn button_up(button: &str) -> Result<(), String> {
        let flags = Self::parse_button_up_flag(button)?;
        Self::send(0, 0, 0, flags)
    }

    /// Rotate the wheel by `notches`. Negative scrolls up.
    pub fn wheel(notches: i32) -> Result<(), String> {
        // SendInput treats positive wheel data as "away from the user".
        let data = -notches * WHEEL_DELTA;
        Self::send(0, 0, data as u32, MOUSEEVENTF_WHEEL)
    }

    /// Map virtual-desktop pixels onto the normalized absolute range.
    fn normalize(x: i32, y: i32) -> (i32, i32) {
        // SAFETY: GetSystemMetrics has no preconditions.
        let (left, top, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };
        (
            Self::scale(x - left, width),
            Self::scale(y - top, height),
        )
    }

    fn scale(offset: i32, extent: i32) -> i32 {
        if extent <= 1 {
            return 0;
        }
        let scaled = (offset as i64 * 65535) / (extent as i64 - 1);
        scaled.clamp(0, 65535) as i32
    }

    /// Parse button name to down event flag.
    fn parse_button_down_flag(button: &str) -> Result<MOUSE_EVENT_FLAGS, String> {
        match button.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(MOUSEEVENTF_LEFTDOWN),
            "right" => Ok(MOUSEEVENTF_RIGHTDOWN),
            "middle" => Ok(MOUSEEVENTF_MIDDLEDOWN),
            _ => Err(format!("unsupported mouse button: '{button}' (allowed: left, right, middle)")),
        }
    }

    /// Parse button name to up event flag.
    fn parse_button_up_flag(button: &str) -> Result<MOUSE_EVENT_FLAGS, String> {
        match button.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(MOUSEEVENTF_LEFTUP),
            "right" => Ok(MOUSEEVENTF_RIGHTUP),
            "middle" => Ok(MOUSEEVENTF_MIDDLEUP),
            _ => Err(format!("unsupported mouse button: '{button}' (allowed: left, right, middle)")),
        }
    }

    fn send(dx: i32, dy: i32, mouse_data: u32, flags: MOUSE_EVENT_FLAGS) -> Result<(), String> {
        let mi = MOUSEINPUT {
            dx,
            dy,
            mouseData: mouse_data,
            dwFlags: flags,
            time: 0,
            dwExtraInfo: 0,
        };

        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 { mi },
        };

        // SAFETY: Win32 call; we pass a single INPUT struct slice.
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            use windows::Win32::Foundation::GetLastError;
            let err = unsafe { GetLastError() };
            Err(format!("SendInput failed: 0x{:08X}", err.0))
        } else {
            Ok(())
        }
    }
}

#[cfg(all(test, windows))]
mod tests {
    use super::MouseSendInputBackend as Mouse;

    #[test]
    fn button_parsing() {
        assert!(Mouse::parse_button_down_flag("left").is_ok());
        assert!(Mouse::parse_button_down_flag("Right").is_ok());
        assert!(Mouse::parse_button_down_flag("middle").is_ok());
        assert!(Mouse::parse_button_down_flag("invalid").is_err());

        assert!(Mouse::parse_button_up_flag("left").is_ok());
        assert!(Mouse::parse_button_up_flag("right").is_ok());
        assert!(Mouse::parse_button_up_flag("invalid").is_err());
    }

    #[test]
    fn scale_clamps_to_absolute_range() {
        assert_eq!(Mouse::scale(0, 1920), 0);
        assert_eq!(Mouse::scale(1919, 1920), 65535);
        assert_eq!(Mouse::scale(-10, 1920), 0);
        assert_eq!(Mouse::scale(5000, 1920), 65535);
        assert_eq!(Mouse::scale(10, 0), 0);
    }
}
