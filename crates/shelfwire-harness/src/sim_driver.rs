//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the live WebSocket driver but
//! for deterministic testing. It implements [`Driver`] so the same
//! [`shelfwire_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Nothing happens on its own: transports open, deliver and close only when
//! the test says so through a [`SimHandle`].

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use shelfwire_app::{App, Driver, DriverEvent, Toast};
use shelfwire_core::Environment;
use shelfwire_proto::{Frame, Packet};

use crate::{InvariantRegistry, SimEnv, SimInstant, SystemSnapshot};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Shared state for event injection.
///
/// This allows injection and inspection while the runtime owns the driver.
#[derive(Default)]
struct SharedState {
    pending_events: VecDeque<DriverEvent>,
    opens: Vec<(String, u64)>,
    open_generation: Option<u64>,
    sent: Vec<Bytes>,
    closes: usize,
    toasts: Vec<Toast>,
    renders: usize,
    fail_open: bool,
    fail_toasts: bool,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] trait so the same [`shelfwire_app::Runtime`]
/// orchestration code runs in both the CLI and simulation tests.
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    env: SimEnv,
    invariants: Option<InvariantRegistry>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a new simulation driver on a fresh virtual clock.
    pub fn new() -> Self {
        Self::with_env(SimEnv::new())
    }

    /// Create a driver on `env`.
    pub fn with_env(env: SimEnv) -> Self {
        Self { state: Arc::new(Mutex::new(SharedState::default())), env, invariants: None }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Handle for scripting and inspecting this driver.
    pub fn handle(&self) -> SimHandle {
        SimHandle { state: Arc::clone(&self.state), env: self.env.clone() }
    }

    fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self) -> Result<Option<DriverEvent>, Self::Error> {
        Ok(self.state().pending_events.pop_front())
    }

    fn open_transport(&mut self, endpoint: &str, generation: u64) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.fail_open {
            return Err(SimDriverError(format!("cannot open {endpoint}")));
        }
        state.opens.push((endpoint.to_string(), generation));
        state.open_generation = Some(generation);
        Ok(())
    }

    async fn send(&mut self, data: Bytes) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.open_generation.is_none() {
            return Err(SimDriverError("no transport".to_string()));
        }
        state.sent.push(data);
        Ok(())
    }

    fn close_transport(&mut self) {
        let mut state = self.state();
        if state.open_generation.take().is_some() {
            state.closes += 1;
        }
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn wall_clock_millis(&self) -> i64 {
        self.env.wall_clock_millis()
    }

    fn show_toast(&mut self, toast: &Toast) -> Result<(), Self::Error> {
        let mut state = self.state();
        if state.fail_toasts {
            return Err(SimDriverError(format!("toast rejected: {}", toast.title)));
        }
        state.toasts.push(toast.clone());
        Ok(())
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.state().renders += 1;
        if let Some(registry) = &self.invariants {
            registry.assert_all(&SystemSnapshot::from_app(app), "after render");
        }
        Ok(())
    }

    async fn stop(&mut self) {
        let mut state = self.state();
        state.open_generation = None;
        state.stopped = true;
    }
}

/// Scripting handle for a [`SimDriver`].
///
/// Events are queued and handed to the runtime one per `poll_event`.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SharedState>>,
    env: SimEnv,
}

impl SimHandle {
    fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Queue a driver event.
    pub fn inject(&self, event: DriverEvent) {
        self.state().pending_events.push_back(event);
    }

    /// Whether events are waiting.
    pub fn has_pending(&self) -> bool {
        !self.state().pending_events.is_empty()
    }

    /// Generation of the transport the runtime currently has open.
    pub fn open_generation(&self) -> Option<u64> {
        self.state().open_generation
    }

    /// Generation of the most recent open request, even if since closed.
    pub fn last_generation(&self) -> Option<u64> {
        self.state().opens.last().map(|(_, generation)| *generation)
    }

    /// Report the latest transport as open.
    pub fn transport_opened(&self) {
        if let Some(generation) = self.last_generation() {
            self.inject(DriverEvent::TransportOpened { generation });
        }
    }

    /// Deliver `frame` on the latest transport.
    pub fn deliver(&self, frame: &Frame) {
        if let Ok(data) = frame.to_bytes() {
            self.deliver_raw(data);
        }
    }

    /// Deliver raw bytes on the latest transport.
    pub fn deliver_raw(&self, data: impl Into<Bytes>) {
        if let Some(generation) = self.last_generation() {
            self.inject(DriverEvent::Received { generation, data: data.into() });
        }
    }

    /// Report the latest transport as closed or unreachable.
    pub fn transport_closed(&self, reason: &str) {
        if let Some(generation) = self.last_generation() {
            self.inject(DriverEvent::TransportClosed { generation, reason: reason.to_string() });
        }
    }

    /// Make `open_transport` fail synchronously.
    pub fn fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// Make `show_toast` fail.
    pub fn fail_toasts(&self, fail: bool) {
        self.state().fail_toasts = fail;
    }

    /// Every `(endpoint, generation)` the runtime asked to open.
    pub fn opens(&self) -> Vec<(String, u64)> {
        self.state().opens.clone()
    }

    /// Number of transports closed by the runtime.
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Drain sent frames, skipping heart-beats.
    pub fn take_sent_frames(&self) -> Vec<Frame> {
        let sent = std::mem::take(&mut self.state().sent);
        sent.iter()
            .filter_map(|data| Packet::decode_all(data).ok())
            .flatten()
            .filter_map(|packet| match packet {
                Packet::Frame(frame) => Some(frame),
                Packet::Heartbeat => None,
            })
            .collect()
    }

    /// Heart-beats sent since the last `take_sent_frames`.
    pub fn heartbeats_sent(&self) -> usize {
        self.state().sent.iter().filter(|data| data.as_ref() == b"\n").count()
    }

    /// Toasts shown so far.
    pub fn toasts(&self) -> Vec<Toast> {
        self.state().toasts.clone()
    }

    /// Render calls so far.
    pub fn renders(&self) -> usize {
        self.state().renders
    }

    /// Whether the runtime stopped the driver.
    pub fn stopped(&self) -> bool {
        self.state().stopped
    }
}
