//! WebSocket transport for the client.
//!
//! Provides [`TransportHandle`], a thin layer that moves raw messages between
//! a WebSocket and the runtime. Protocol logic stays in the Sans-IO
//! [`shelfwire_core::Session`].
//!
//! Each connection attempt runs in its own task, tagged with the transport
//! generation the session handed out. Everything the task observes is
//! reported as a [`DriverEvent`] carrying that generation, so events from a
//! replaced connection are recognisably stale.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use shelfwire_app::DriverEvent;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

/// Outbound queue depth per connection.
const OUTBOUND_CAPACITY: usize = 32;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Endpoint is not a usable WebSocket URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// No connection to send on.
    #[error("transport not open")]
    NotOpen,

    /// The connection task went away.
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Handle to one WebSocket connection task.
#[derive(Debug)]
pub struct TransportHandle {
    generation: u64,
    to_server: mpsc::Sender<Bytes>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    /// Spawn a task connecting to `endpoint`.
    ///
    /// Returns immediately. The outcome arrives on `events` as
    /// [`DriverEvent::TransportOpened`] or [`DriverEvent::TransportClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidEndpoint`] if `endpoint` is not a
    /// `ws://` or `wss://` URL.
    pub fn spawn(
        endpoint: &str,
        generation: u64,
        events: mpsc::Sender<DriverEvent>,
    ) -> Result<Self, TransportError> {
        let url = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidEndpoint(format!(
                "{endpoint}: scheme must be ws or wss"
            )));
        }

        let (to_server_tx, to_server_rx) = mpsc::channel::<Bytes>(OUTBOUND_CAPACITY);
        let task = tokio::spawn(run_connection(url, generation, to_server_rx, events));

        Ok(Self { generation, to_server: to_server_tx, task })
    }

    /// Generation this connection was opened for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue one message for the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection task has already finished.
    pub async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        self.to_server
            .send(data)
            .await
            .map_err(|_| TransportError::Closed(format!("generation {}", self.generation)))
    }

    /// Close gracefully.
    ///
    /// Messages already queued are flushed before the WebSocket close frame.
    /// The returned task finishes once that has happened; await it before
    /// exiting or the queued frames may never reach the server.
    pub fn close(self) -> JoinHandle<()> {
        drop(self.to_server);
        self.task
    }
}

/// Run the connection, bridging between channels and the WebSocket.
async fn run_connection(
    url: Url,
    generation: u64,
    mut to_server: mpsc::Receiver<Bytes>,
    events: mpsc::Sender<DriverEvent>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            tracing::debug!(generation, error = %e, "websocket connect failed");
            let reason = format!("connect failed: {e}");
            let _ = events.send(DriverEvent::TransportClosed { generation, reason }).await;
            return;
        },
    };

    if events.send(DriverEvent::TransportOpened { generation }).await.is_err() {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let data = Bytes::copy_from_slice(text.as_bytes());
                    if events.send(DriverEvent::Received { generation, data }).await.is_err() {
                        break "runtime gone".to_string();
                    }
                },
                Some(Ok(Message::Binary(data))) => {
                    if events.send(DriverEvent::Received { generation, data }).await.is_err() {
                        break "runtime gone".to_string();
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => format!("closed by server: {} {}", frame.code, frame.reason.as_str()),
                        None => "closed by server".to_string(),
                    };
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => break format!("websocket error: {e}"),
                None => break "stream ended".to_string(),
            },
            outgoing = to_server.recv() => match outgoing {
                Some(data) => {
                    let message = match String::from_utf8(data.to_vec()) {
                        Ok(text) => Message::text(text),
                        Err(_) => Message::Binary(data),
                    };
                    if let Err(e) = write.send(message).await {
                        break format!("send failed: {e}");
                    }
                },
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break "closed by client".to_string();
                },
            },
        }
    };

    tracing::debug!(generation, %reason, "websocket closed");
    let _ = events.send(DriverEvent::TransportClosed { generation, reason }).await;
}
