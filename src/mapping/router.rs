//! Input event router - turns Wii Remote events into pointer actions
//!
//! The router is the event sink registered on every connected device. It is
//! invoked directly on the driver's callback thread, keeps no state of its
//! own, and only takes brief snapshots of the shared region and session:
//!
//! | Event                  | Action                                  |
//! |------------------------|-----------------------------------------|
//! | A pressed / released   | left button down / up                   |
//! | B pressed / released   | right button down / up                  |
//! | Up or Left held        | scroll one notch up                     |
//! | Down or Right held     | scroll one notch down                   |
//! | IR position (x, y)     | absolute move to region origin + (x, y) |
//! | Disconnection          | handed to the supervisor                |

use crate::backend::{BackendError, MouseButton, PointerBackend};
use crate::display::DisplaySpaceMapper;
use crate::supervisor::ConnectionSupervisor;
use crate::wiimote::driver::EventSink;
use crate::wiimote::types::{ButtonsEvent, DeviceId, IrEvent};
use log::{debug, trace, warn};
use std::sync::Arc;

/// Wheel notches per scroll action; negative is up
const SCROLL_UP: i32 = -1;
const SCROLL_DOWN: i32 = 1;

pub struct InputEventRouter {
    display: Arc<DisplaySpaceMapper>,
    supervisor: Arc<ConnectionSupervisor>,
}

impl InputEventRouter {
    pub fn new(display: Arc<DisplaySpaceMapper>, supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self { display, supervisor }
    }

    /// Pointer to actuate, or `None` (with a trace) when events should be dropped
    fn target(&self, device: DeviceId, kind: &str) -> Option<Arc<dyn PointerBackend>> {
        if !self.supervisor.is_current(device) {
            debug!("Dropping {} event from stale {}", kind, device);
            return None;
        }
        let pointer = self.display.pointer();
        if pointer.is_none() {
            trace!("No pointer bound to the primary monitor; dropping {} event", kind);
        }
        pointer
    }

    fn check(result: Result<(), BackendError>, action: &str) {
        if let Err(e) = result {
            warn!("Failed to {}: {}", action, e);
        }
    }
}

impl EventSink for InputEventRouter {
    fn on_buttons(&self, event: &ButtonsEvent) {
        let Some(pointer) = self.target(event.device, "button") else {
            return;
        };

        if event.pressed.a {
            trace!("A pressed -> left down");
            Self::check(pointer.button_down(MouseButton::Left), "press left button");
        }
        if event.released.a {
            trace!("A released -> left up");
            Self::check(pointer.button_up(MouseButton::Left), "release left button");
        }
        if event.pressed.b {
            trace!("B pressed -> right down");
            Self::check(pointer.button_down(MouseButton::Right), "press right button");
        }
        if event.released.b {
            trace!("B released -> right up");
            Self::check(pointer.button_up(MouseButton::Right), "release right button");
        }

        let held = &event.held;
        if held.up || held.left {
            Self::check(pointer.scroll(SCROLL_UP), "scroll up");
        }
        if held.down || held.right {
            Self::check(pointer.scroll(SCROLL_DOWN), "scroll down");
        }
    }

    fn on_ir(&self, event: &IrEvent) {
        // 0 on either axis means no fix
        if event.x == 0 || event.y == 0 {
            return;
        }

        let region = self.display.region();
        if region.is_degenerate() {
            trace!("No monitor selected; ignoring IR position");
            return;
        }

        let Some(pointer) = self.target(event.device, "IR") else {
            return;
        };

        let (Some(x), Some(y)) = (
            region.x.checked_add(event.x),
            region.y.checked_add(event.y),
        ) else {
            debug!("IR ({}, {}) is off the host coordinate range; dropped", event.x, event.y);
            return;
        };
        trace!("IR ({}, {}) -> pointer ({}, {})", event.x, event.y, x, y);
        Self::check(pointer.move_absolute(x, y), "move pointer");
    }

    fn on_disconnection(&self, device: DeviceId) {
        self.supervisor.handle_disconnection(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PointerCommand;
    use crate::display::{Rect, StaticDisplaySource};
    use crate::session::{SessionConfig, SharedSession};
    use crate::supervisor::SupervisorSettings;
    use crate::wiimote::driver::Device;
    use crate::wiimote::mock::MockDriver;
    use crate::wiimote::types::Buttons;
    use std::time::Duration;

    struct Rig {
        router: Arc<InputEventRouter>,
        supervisor: Arc<ConnectionSupervisor>,
        display: Arc<DisplaySpaceMapper>,
        source: StaticDisplaySource,
        device: DeviceId,
    }

    fn rig(monitors: Vec<Rect>) -> Rig {
        let session = Arc::new(SharedSession::new(SessionConfig::default()));
        let source = StaticDisplaySource::new(monitors);
        let display = Arc::new(DisplaySpaceMapper::new(Arc::new(source.clone()), Arc::clone(&session)));
        display.detect();

        let driver = MockDriver::new();
        let supervisor = Arc::new(ConnectionSupervisor::new(
            Arc::new(driver.clone()),
            session,
            SupervisorSettings { retry_interval: Duration::from_millis(10) },
        ));
        let router = Arc::new(InputEventRouter::new(Arc::clone(&display), Arc::clone(&supervisor)));
        supervisor.attach_sink(Arc::downgrade(&router) as std::sync::Weak<dyn EventSink>);
        assert!(supervisor.connect());
        let device = driver.last_device().unwrap().id();

        Rig { router, supervisor, display, source, device }
    }

    fn rig_at_origin_min() -> Rig {
        rig(vec![Rect::new(i32::MIN, 0, 1920, 1080)])
    }

    fn buttons(device: DeviceId, pressed: Buttons, released: Buttons, held: Buttons) -> ButtonsEvent {
        ButtonsEvent { device, pressed, released, held }
    }

    #[test]
    fn ir_position_is_offset_by_region_origin() {
        let rig = rig(vec![Rect::new(100, 200, 1920, 1080)]);
        rig.router.on_ir(&IrEvent { device: rig.device, x: 5, y: 7 });
        assert_eq!(rig.source.pointer().moves(), vec![(105, 207)]);
    }

    #[test]
    fn ir_sentinel_produces_no_move() {
        let rig = rig(vec![Rect::new(100, 200, 1920, 1080)]);
        for (x, y) in [(0, 7), (5, 0), (0, 0), (0, 1079)] {
            rig.router.on_ir(&IrEvent { device: rig.device, x, y });
        }
        assert!(rig.source.pointer().commands().is_empty());
    }

    #[test]
    fn ir_beyond_coordinate_range_is_dropped() {
        let rig = rig(vec![Rect::new(100, 200, 1920, 1080)]);
        rig.router.on_ir(&IrEvent { device: rig.device, x: i32::MAX, y: 7 });
        rig.router.on_ir(&IrEvent { device: rig.device, x: 5, y: i32::MAX });
        assert!(rig.source.pointer().commands().is_empty());

        let rig = rig_at_origin_min();
        rig.router.on_ir(&IrEvent { device: rig.device, x: -1, y: 1 });
        assert!(rig.source.pointer().commands().is_empty());
    }

    #[test]
    fn ir_with_no_selected_monitor_is_dropped() {
        let rig = rig(vec![Rect::new(0, 0, 1920, 1080)]);
        rig.display.set_selected(0, false);
        rig.router.on_ir(&IrEvent { device: rig.device, x: 10, y: 10 });
        assert!(rig.source.pointer().commands().is_empty());
    }

    #[test]
    fn buttons_map_to_left_and_right() {
        let rig = rig(vec![Rect::new(0, 0, 1920, 1080)]);
        let a = Buttons { a: true, ..Buttons::default() };
        let b = Buttons { b: true, ..Buttons::default() };
        let none = Buttons::default();

        rig.router.on_buttons(&buttons(rig.device, a, none, a));
        rig.router.on_buttons(&buttons(rig.device, none, a, none));
        rig.router.on_buttons(&buttons(rig.device, b, none, b));
        rig.router.on_buttons(&buttons(rig.device, none, b, none));

        assert_eq!(
            rig.source.pointer().commands(),
            vec![
                PointerCommand::ButtonDown(MouseButton::Left),
                PointerCommand::ButtonUp(MouseButton::Left),
                PointerCommand::ButtonDown(MouseButton::Right),
                PointerCommand::ButtonUp(MouseButton::Right),
            ]
        );
    }

    #[test]
    fn held_dpad_scrolls_once_per_condition() {
        let rig = rig(vec![Rect::new(0, 0, 1920, 1080)]);
        let none = Buttons::default();

        let up_left = Buttons { up: true, left: true, ..Buttons::default() };
        rig.router.on_buttons(&buttons(rig.device, none, none, up_left));
        assert_eq!(rig.source.pointer().commands(), vec![PointerCommand::Scroll(-1)]);

        rig.source.pointer().clear();
        let right = Buttons { right: true, ..Buttons::default() };
        rig.router.on_buttons(&buttons(rig.device, none, none, right));
        assert_eq!(rig.source.pointer().commands(), vec![PointerCommand::Scroll(1)]);

        rig.source.pointer().clear();
        let opposing = Buttons { up: true, down: true, ..Buttons::default() };
        rig.router.on_buttons(&buttons(rig.device, none, none, opposing));
        assert_eq!(
            rig.source.pointer().commands(),
            vec![PointerCommand::Scroll(-1), PointerCommand::Scroll(1)]
        );
    }

    #[test]
    fn events_from_stale_device_are_dropped() {
        let rig = rig(vec![Rect::new(0, 0, 1920, 1080)]);
        let stale = DeviceId(rig.device.0 + 10);
        let a = Buttons { a: true, ..Buttons::default() };

        rig.router.on_ir(&IrEvent { device: stale, x: 5, y: 5 });
        rig.router.on_buttons(&buttons(stale, a, Buttons::default(), a));
        assert!(rig.source.pointer().commands().is_empty());
    }

    #[test]
    fn unbound_primary_makes_actuation_a_no_op() {
        let rig = rig(vec![Rect::new(0, 0, 1920, 1080)]);
        rig.source.fail_binding(0);
        rig.display.detect();

        rig.router.on_ir(&IrEvent { device: rig.device, x: 5, y: 5 });
        assert!(rig.source.pointer().commands().is_empty());
    }

    #[test]
    fn disconnection_goes_to_supervisor() {
        let rig = rig(vec![Rect::new(0, 0, 1920, 1080)]);
        rig.router.on_disconnection(DeviceId(rig.device.0 + 10));
        assert!(rig.supervisor.is_current(rig.device));

        rig.router.on_disconnection(rig.device);
        assert!(!rig.supervisor.is_current(rig.device));
        assert!(rig
            .supervisor
            .wait_for_state(crate::supervisor::ConnectionState::Connected, Duration::from_secs(2)));
        rig.supervisor.disconnect();
    }
}
