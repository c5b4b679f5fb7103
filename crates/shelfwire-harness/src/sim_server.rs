//! Scripted STOMP broker.
//!
//! `SimServer` builds the frames a Spring-style broker would send. It keeps
//! no connection state beyond a message-id counter; the test decides when
//! each frame is delivered.

use shelfwire_core::Subscription;
use shelfwire_proto::{Command, Frame, NotificationEvent, headers};

/// Builds broker frames.
#[derive(Debug, Default)]
pub struct SimServer {
    next_message_id: u64,
    session_seq: u64,
}

impl SimServer {
    /// Create a broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// `CONNECTED` without heart-beating.
    pub fn connected(&mut self) -> Frame {
        self.connected_with_heartbeat("0,0")
    }

    /// `CONNECTED` advertising `heart_beat` (`"sx,sy"`).
    pub fn connected_with_heartbeat(&mut self, heart_beat: &str) -> Frame {
        self.session_seq += 1;
        Frame::new(Command::Connected)
            .with_header(headers::VERSION, "1.2")
            .with_header(headers::HEART_BEAT, heart_beat)
            .with_header(headers::SESSION, format!("sim-{}", self.session_seq))
            .with_header(headers::SERVER, "shelfwire-sim")
    }

    /// `MESSAGE` carrying `event` as JSON.
    pub fn notification(&mut self, subscription: &Subscription, event: &NotificationEvent) -> Frame {
        let body = event.to_json().unwrap_or_default();
        self.message(subscription, "application/json", body)
    }

    /// `MESSAGE` with an arbitrary body.
    pub fn message(
        &mut self,
        subscription: &Subscription,
        content_type: &str,
        body: impl Into<bytes::Bytes>,
    ) -> Frame {
        self.next_message_id += 1;
        Frame::new(Command::Message)
            .with_header(headers::SUBSCRIPTION, subscription.id())
            .with_header(headers::DESTINATION, subscription.destination())
            .with_header(headers::MESSAGE_ID, self.next_message_id.to_string())
            .with_header(headers::CONTENT_TYPE, content_type)
            .with_body(body.into())
    }

    /// `ERROR` frame.
    pub fn error(&self, message: &str) -> Frame {
        Frame::new(Command::Error).with_header(headers::MESSAGE, message)
    }
}
