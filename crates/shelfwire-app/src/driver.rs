//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each host implements the trait to provide platform
//! specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use bytes::Bytes;
use shelfwire_core::MonotonicInstant;

use crate::{App, AppEvent, Toast};

/// Something that happened outside the state machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Transport `generation` finished opening.
    TransportOpened {
        /// Transport generation
        generation: u64,
    },

    /// One transport message arrived.
    Received {
        /// Transport generation
        generation: u64,
        /// Raw message bytes
        data: Bytes,
    },

    /// Transport `generation` closed or could not be opened.
    TransportClosed {
        /// Transport generation
        generation: u64,
        /// Human-readable cause
        reason: String,
    },

    /// The host UI produced an event (button press, list command).
    App(AppEvent),

    /// The login state may have changed; re-read the identity provider.
    IdentityChanged,

    /// Stop the runtime.
    Shutdown,
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production and simulation.
///
/// # Implementations
///
/// - **Live**: tokio tasks running a WebSocket transport
/// - **Simulation**: scripted events and a virtual clock
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: MonotonicInstant;

    /// Wait for the next event.
    ///
    /// Returns `None` when nothing happened within the driver's tick
    /// interval, so the runtime can run timers.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<DriverEvent>, Self::Error>> + Send;

    /// Start opening a transport to `endpoint`.
    ///
    /// Must not block. The outcome is reported later as
    /// [`DriverEvent::TransportOpened`] or [`DriverEvent::TransportClosed`]
    /// tagged with `generation`. Any previous transport is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started (bad URL).
    fn open_transport(&mut self, endpoint: &str, generation: u64) -> Result<(), Self::Error>;

    /// Send one message on the current transport.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport is open or the send fails.
    fn send(&mut self, data: Bytes) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the current transport, if any.
    fn close_transport(&mut self);

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Wall-clock time, Unix milliseconds.
    fn wall_clock_millis(&self) -> i64;

    /// Show a transient alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert cannot be displayed. The runtime logs it
    /// and carries on.
    fn show_toast(&mut self, toast: &Toast) -> Result<(), Self::Error>;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop the driver and clean up resources.
    ///
    /// Waits (bounded) for closing transports to deliver what was queued on
    /// them, so a goodbye sent just before stopping reaches the server.
    fn stop(&mut self) -> impl Future<Output = ()> + Send;
}
