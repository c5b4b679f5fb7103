//! Live driver for the CLI.
//!
//! Implements [`Driver`] on tokio: transport tasks and the stdin reader feed
//! one event channel, toasts and renders go to the log.

use std::time::{Duration, Instant};

use bytes::Bytes;
use shelfwire_app::{App, Driver, DriverEvent, Toast, presentation};
use shelfwire_core::Environment;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

use crate::{
    SystemEnv, TransportError, TransportHandle,
    input::{Command, HELP},
};

/// How long `poll_event` waits before letting the runtime run timers.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// How long `stop` waits for each closing connection to say goodbye.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Event queue depth.
const EVENT_CAPACITY: usize = 64;

/// Rows shown per render.
const RENDER_LIMIT: usize = 10;

/// Live driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Tokio driver with a WebSocket transport.
pub struct LiveDriver {
    env: SystemEnv,
    events_tx: mpsc::Sender<DriverEvent>,
    events_rx: mpsc::Receiver<DriverEvent>,
    transport: Option<TransportHandle>,
    closing: Vec<JoinHandle<()>>,
    stdin_task: Option<tokio::task::AbortHandle>,
    tick_interval: Duration,
    close_grace: Duration,
}

impl Default for LiveDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDriver {
    /// Create a driver with the default tick interval.
    pub fn new() -> Self {
        Self::with_tick_interval(DEFAULT_TICK_INTERVAL)
    }

    /// Create a driver that wakes the runtime at least every `tick_interval`.
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            env: SystemEnv::new(),
            events_tx,
            events_rx,
            transport: None,
            closing: Vec::new(),
            stdin_task: None,
            tick_interval,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    /// Set how long `stop` waits for closing connections.
    #[must_use]
    pub fn with_close_grace(mut self, close_grace: Duration) -> Self {
        self.close_grace = close_grace;
        self
    }

    /// Connections closed but not yet finished flushing.
    pub fn closing_transports(&self) -> usize {
        self.closing.iter().filter(|task| !task.is_finished()).count()
    }

    /// Sender for injecting events (login hooks, tests).
    pub fn event_sender(&self) -> mpsc::Sender<DriverEvent> {
        self.events_tx.clone()
    }

    /// Read line commands from stdin.
    ///
    /// End of input is treated as `quit`.
    pub fn spawn_stdin_commands(&mut self) {
        let events = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let event = match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => match Command::parse(&line) {
                        Some(command) => command.into_event(),
                        None => {
                            tracing::info!(input = %line.trim(), "{HELP}");
                            continue;
                        },
                    },
                    Ok(None) => DriverEvent::Shutdown,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin closed");
                        DriverEvent::Shutdown
                    },
                };

                let shutdown = event == DriverEvent::Shutdown;
                if events.send(event).await.is_err() || shutdown {
                    break;
                }
            }
        });
        self.stdin_task = Some(handle.abort_handle());
    }
}

impl Driver for LiveDriver {
    type Error = DriverError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<DriverEvent>, Self::Error> {
        tokio::select! {
            event = self.events_rx.recv() => Ok(event.or(Some(DriverEvent::Shutdown))),
            () = self.env.sleep(self.tick_interval) => Ok(None),
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("interrupted");
                Ok(Some(DriverEvent::Shutdown))
            },
        }
    }

    fn open_transport(&mut self, endpoint: &str, generation: u64) -> Result<(), Self::Error> {
        self.close_transport();
        let handle = TransportHandle::spawn(endpoint, generation, self.events_tx.clone())?;
        self.transport = Some(handle);
        Ok(())
    }

    async fn send(&mut self, data: Bytes) -> Result<(), Self::Error> {
        let transport = self.transport.as_ref().ok_or(TransportError::NotOpen)?;
        transport.send(data).await?;
        Ok(())
    }

    fn close_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            tracing::debug!(generation = transport.generation(), "closing transport");
            self.closing.retain(|task| !task.is_finished());
            self.closing.push(transport.close());
        }
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn wall_clock_millis(&self) -> i64 {
        self.env.wall_clock_millis()
    }

    fn show_toast(&mut self, toast: &Toast) -> Result<(), Self::Error> {
        tracing::info!(
            action = %format_args!("{} (read {})", toast.action.label, toast.action.notification.value()),
            "{}: {}",
            toast.title,
            toast.description
        );
        Ok(())
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let (_, connection) = presentation::connection_indicator(app.is_connected());
        let unread = app.unread_count();
        let badge = presentation::unread_badge_text(unread).unwrap_or_default();

        tracing::info!(connection, badge = %badge, "{}", presentation::bell_title(unread));

        if app.store().is_empty() {
            tracing::debug!("{}", presentation::EMPTY_LIST_TEXT);
            return Ok(());
        }

        let now_ms = self.wall_clock_millis();
        for notification in app.notifications().take(RENDER_LIMIT) {
            let badge = presentation::status_badge(notification.status());
            tracing::debug!(
                id = %notification.id(),
                status = badge.label,
                color = badge.color.as_str(),
                read = notification.is_read(),
                book = notification.book_title().unwrap_or_default(),
                when = %presentation::relative_time(notification.received_at_ms(), now_ms),
                "{}",
                notification.message()
            );
        }
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(stdin_task) = self.stdin_task.take() {
            stdin_task.abort();
        }

        self.close_transport();
        for task in self.closing.drain(..) {
            let abort = task.abort_handle();
            if tokio::time::timeout(self.close_grace, task).await.is_err() {
                tracing::warn!(grace = ?self.close_grace, "transport did not close in time, aborting");
                abort.abort();
            }
        }
    }
}
