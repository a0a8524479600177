//! Device connection supervisor
//!
//! Owns the connect / retry / cancel state machine:
//!
//! ```text
//! Idle ──connect──▶ Connecting ──found──▶ Connected
//!  ▲                    │  ▲                  │
//!  │               disconnect  └──device lost─┘
//!  │                    ▼
//!  └────────────── Cancelling
//! ```
//!
//! Discovery runs on a dedicated `connect-retry` thread. Concurrent
//! `connect()` calls share that one attempt and all wake when it settles.
//! The pause between attempts is a condition-variable wait, so
//! `disconnect()` ends it immediately.
//!
//! Lock order: connection lock, then the session lock. The connection lock is
//! never held across discovery or `Device::disconnect()`.

use crate::session::SharedSession;
use crate::wiimote::driver::{Device, DeviceDriver, EventSink};
use crate::wiimote::types::DeviceId;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread;
use std::time::Duration;

/// Pause between two discovery attempts
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub retry_interval: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            retry_interval: RETRY_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Cancelling,
}

struct ConnectionStatus {
    state: ConnectionState,
    /// Set by `disconnect()`, observed by the retry loop
    cancel: bool,
}

pub struct ConnectionSupervisor {
    driver: Arc<dyn DeviceDriver>,
    session: Arc<SharedSession>,
    settings: SupervisorSettings,
    status: Mutex<ConnectionStatus>,
    changed: Condvar,
    sink: OnceLock<Weak<dyn EventSink>>,
    loops_started: AtomicUsize,
}

impl ConnectionSupervisor {
    pub fn new(
        driver: Arc<dyn DeviceDriver>,
        session: Arc<SharedSession>,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            driver,
            session,
            settings,
            status: Mutex::new(ConnectionStatus {
                state: ConnectionState::Idle,
                cancel: false,
            }),
            changed: Condvar::new(),
            sink: OnceLock::new(),
            loops_started: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the sink registered on every device this supervisor installs.
    pub fn attach_sink(&self, sink: Weak<dyn EventSink>) {
        if self.sink.set(sink).is_err() {
            warn!("Event sink already attached; keeping the first one");
        }
    }

    fn sink(&self) -> Option<Arc<dyn EventSink>> {
        self.sink.get().and_then(Weak::upgrade)
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether `id` is the device of the live session
    pub fn is_current(&self, id: DeviceId) -> bool {
        self.session.is_current(id)
    }

    /// Number of retry loops started since creation
    pub fn retry_loops_started(&self) -> usize {
        self.loops_started.load(Ordering::SeqCst)
    }

    /// Connect, blocking until a device is installed or the attempt is cancelled.
    ///
    /// Returns true when a session exists on return.
    pub fn connect(self: &Arc<Self>) -> bool {
        let mut status = self.lock();
        if status.state == ConnectionState::Idle {
            self.begin_connecting(&mut status);
        }

        let status = self
            .changed
            .wait_while(status, |s| {
                matches!(s.state, ConnectionState::Connecting | ConnectionState::Cancelling)
            })
            .unwrap_or_else(PoisonError::into_inner);
        status.state == ConnectionState::Connected
    }

    /// Start connecting in the background if idle; never blocks.
    pub fn start(self: &Arc<Self>) {
        let mut status = self.lock();
        if status.state == ConnectionState::Idle {
            self.begin_connecting(&mut status);
        }
    }

    /// Wait up to `timeout` for the supervisor to reach `target`.
    pub fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> bool {
        let (status, _) = self
            .changed
            .wait_timeout_while(self.lock(), timeout, |s| s.state != target)
            .unwrap_or_else(PoisonError::into_inner);
        status.state == target
    }

    /// Cancel any connection attempt and tear down the session.
    pub fn disconnect(&self) {
        let mut status = self.lock();
        if status.state == ConnectionState::Connecting {
            info!("Cancelling connection attempt...");
            status.state = ConnectionState::Cancelling;
            status.cancel = true;
            self.changed.notify_all();
        }

        let mut status = self
            .changed
            .wait_while(status, |s| s.state == ConnectionState::Cancelling)
            .unwrap_or_else(PoisonError::into_inner);
        status.state = ConnectionState::Idle;
        let device = self.session.take_device();
        self.changed.notify_all();
        drop(status);

        if let Some(device) = device {
            info!("Disconnecting {}...", device.id());
            release(device.as_ref());
        }
    }

    /// Driver-reported loss of `id`. Stale ids are ignored; losing the live
    /// device starts reconnecting in the background.
    pub fn handle_disconnection(self: &Arc<Self>, id: DeviceId) {
        let mut status = self.lock();
        if !self.session.clear_if_current(id) {
            debug!("Ignoring disconnection of stale {}", id);
            return;
        }

        warn!("{} disconnected", id);
        if status.state == ConnectionState::Connected {
            info!("Reconnecting...");
            self.begin_connecting(&mut status);
        }
    }

    /// Move to `Connecting` and spawn the retry loop. Caller holds the connection lock.
    fn begin_connecting(self: &Arc<Self>, status: &mut ConnectionStatus) {
        status.state = ConnectionState::Connecting;
        status.cancel = false;
        self.loops_started.fetch_add(1, Ordering::SeqCst);

        let supervisor = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("connect-retry".to_string())
            .spawn(move || supervisor.run_retry_loop());

        if let Err(e) = spawned {
            warn!("Failed to spawn connection thread: {}", e);
            status.state = ConnectionState::Idle;
            self.changed.notify_all();
        }
    }

    fn run_retry_loop(&self) {
        info!("Looking for a Wii Remote (press 1+2 to make it discoverable)...");
        let interval = self.settings.retry_interval;
        let mut attempt: u64 = 0;
        let mut stray: Option<Arc<dyn Device>> = None;

        let mut status = self.lock();
        while !status.cancel {
            drop(status);
            attempt += 1;
            let found = self.discover_one(attempt);

            status = self.lock();
            if status.cancel {
                stray = found;
                break;
            }

            if let Some(device) = found {
                self.session.install(device, self.sink());
                status.state = ConnectionState::Connected;
                self.changed.notify_all();
                return;
            }

            debug!("No Wii Remote found (attempt {}), retrying in {:?}", attempt, interval);
            status = self
                .changed
                .wait_timeout_while(status, interval, |s| !s.cancel)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        status.state = ConnectionState::Idle;
        self.changed.notify_all();
        drop(status);
        info!("Stopped looking for a Wii Remote");

        if let Some(device) = stray {
            debug!("Releasing {} found while cancelling", device.id());
            release(device.as_ref());
        }
    }

    fn discover_one(&self, attempt: u64) -> Option<Arc<dyn Device>> {
        match self.driver.discover(1, false) {
            Ok(devices) => devices.into_iter().next(),
            Err(e) => {
                debug!("Discovery attempt {} failed: {}", attempt, e);
                None
            }
        }
    }
}

fn release(device: &dyn Device) {
    if let Err(e) = device.disconnect() {
        warn!("Error disconnecting {}: {}", device.id(), e);
    }
}
