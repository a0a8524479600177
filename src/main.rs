//! Wiimote Mouse - Main Application
//!
//! Drives the REAL system pointer. No native Wii Remote stack is linked in,
//! so the bundled mock driver stands in for the controller.

use anyhow::bail;
use log::info;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use wiimote_mouse::display::DisplaySource;
use wiimote_mouse::mapping::config::FileConfigStore;
use wiimote_mouse::supervisor::SupervisorSettings;
use wiimote_mouse::wiimote::MockDriver;
use wiimote_mouse::{BridgeManager, BridgeParts};

#[cfg(windows)]
fn display_source() -> Arc<dyn DisplaySource> {
    Arc::new(wiimote_mouse::display::WindowsDisplaySource::new())
}

#[cfg(not(windows))]
fn display_source() -> Arc<dyn DisplaySource> {
    use wiimote_mouse::display::{Rect, StaticDisplaySource};
    Arc::new(StaticDisplaySource::new(vec![Rect::new(0, 0, 1920, 1080)]))
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Wiimote Mouse ===");
    println!();
    println!("This application will:");
    println!("1. Detect your monitors and restore the saved selection");
    println!("2. Connect to a Wii Remote, retrying every second");
    println!("3. Move the pointer with the IR camera, click with A/B, scroll with the D-pad");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let store = FileConfigStore::in_home();
    info!("Preferences file: {}", store.path().display());

    let manager = BridgeManager::new(BridgeParts {
        driver: Arc::new(MockDriver::new()),
        display_source: display_source(),
        store: Box::new(store),
        settings: SupervisorSettings::default(),
    });

    if manager.monitors().is_empty() {
        bail!("No monitors detected; nothing to map the pointer onto");
    }

    let region = manager.region();
    if region.is_degenerate() {
        println!("No monitor selected; the pointer will not move");
    } else {
        println!(
            "Pointer region: {}x{} at ({}, {})",
            region.width, region.height, region.x, region.y
        );
    }

    manager.start();

    // Keep the main thread alive; Ctrl+C ends the process
    let mut last = manager.connection_state();
    loop {
        thread::sleep(Duration::from_secs(1));

        let state = manager.connection_state();
        if state != last {
            info!("Connection state: {:?}", state);
            last = state;
        }
    }
}
