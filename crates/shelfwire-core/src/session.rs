//! Session state machine for the notification channel.
//!
//! Manages connection lifecycle, the STOMP handshake, the per-user
//! subscription, heart-beats, reconnection and graceful shutdown. Uses the
//! action pattern: methods take time as input and return actions for the
//! driver to execute. The state machine never performs I/O.
//!
//! # State Machine
//!
//! ```text
//!                connect
//! ┌──────────────┐────────>┌────────────┐  CONNECTED   ┌───────────┐
//! │ Disconnected │         │ Connecting │─────────────>│ Connected │
//! └──────────────┘<────────└────────────┘              └───────────┘
//!    ↑    ↑     disconnect   │      ↑                         │
//!    │    │                  │ lost │ retry due               │ lost / disconnect
//!    │    │  exhausted /     ↓      │                         │
//!    │    │  disconnect   ┌────────┐                          │
//!    │    └───────────────│ Failed │                          │
//!    │                    └────────┘                          │
//!    └────────────────────────────────────────────────────────┘
//! ```
//!
//! A loss while `Connected` lands in `Disconnected` with a retry scheduled;
//! the retry then moves straight to `Connecting`.
//!
//! # Transport generations
//!
//! Every transport the session asks for is tagged with a generation number.
//! Driver events carry the generation they belong to, and events for any
//! generation other than the current one are ignored. A close callback from a
//! connection that was already torn down can therefore never affect the
//! session that replaced it.

use std::{fmt, time::Duration};

use shelfwire_proto::{Command, Frame, HeartBeat, NegotiatedHeartBeat, NotificationEvent, Packet, headers};

use crate::{
    env::MonotonicInstant,
    error::SessionError,
    identity::UserId,
    reconnect::{Backoff, ReconnectPolicy},
    router::{RouteOutcome, Subscription},
};

/// Heart-beat interval offered in both directions.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);

/// Missed-beat multiplier before the server is declared silent.
pub const HEARTBEAT_TOLERANCE: u32 = 2;

/// Default WebSocket endpoint (raw WebSocket leg of the SockJS endpoint).
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws/websocket";

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection and none in progress
    Disconnected,
    /// Transport opening or STOMP handshake in flight
    Connecting,
    /// Handshake complete, subscription active
    Connected,
    /// Last attempt failed, waiting for a retry
    Failed,
}

impl ConnectionState {
    /// Whether a connection is established or being established.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Handle for a scheduled retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryToken(u64);

impl fmt::Display for RetryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retry-{}", self.0)
    }
}

/// Actions returned by the session state machine.
///
/// The driver executes these in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a transport to `endpoint`; tag its events with `generation`
    OpenTransport {
        /// Endpoint URL
        endpoint: String,
        /// Generation the new transport belongs to
        generation: u64,
    },

    /// Encode and send this frame on the current transport
    SendFrame(Frame),

    /// Send a heart-beat on the current transport
    SendHeartbeat,

    /// Close the current transport
    CloseTransport,

    /// Call [`Session::retry_due`] with `token` once `delay` has elapsed
    ScheduleRetry {
        /// Token to pass back
        token: RetryToken,
        /// Delay from now
        delay: Duration,
        /// Retry number in the current outage (1-based)
        attempt: u32,
    },

    /// Forget the retry scheduled under `token`
    CancelRetry {
        /// Token of the cancelled retry
        token: RetryToken,
    },

    /// Hand a decoded notification to the application
    Deliver(NotificationEvent),

    /// Connection state changed
    Transition {
        /// Previous state
        from: ConnectionState,
        /// New state
        to: ConnectionState,
    },
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebSocket endpoint URL
    pub endpoint: String,
    /// Value of the STOMP `host` header
    pub host: String,
    /// Heart-beat offer sent in `CONNECT`
    pub heartbeat: HeartBeat,
    /// Reconnection schedule
    pub reconnect: ReconnectPolicy,
    /// Extra `CONNECT` headers (e.g. `Authorization`)
    pub connect_headers: Vec<(String, String)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            host: "localhost".to_string(),
            heartbeat: HeartBeat::symmetric(DEFAULT_HEARTBEAT_INTERVAL),
            reconnect: ReconnectPolicy::default(),
            connect_headers: Vec::new(),
        }
    }
}

/// Diagnostic snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current state
    pub state: ConnectionState,
    /// Whether the session is usable (see [`Session::is_connected`])
    pub connected: bool,
    /// Whether a transport is currently open
    pub transport_live: bool,
    /// Retries scheduled in the current outage
    pub reconnect_attempts: u32,
    /// Whether the notification subscription is active
    pub subscribed: bool,
    /// User the session belongs to
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Idle,
    Opening,
    Open,
}

/// Notification channel session.
///
/// Pure state machine: no I/O and no clock. Generic over the instant type so
/// the simulation harness can drive it with virtual time.
#[derive(Debug, Clone)]
pub struct Session<I>
where
    I: MonotonicInstant,
{
    state: ConnectionState,
    config: SessionConfig,
    user_id: Option<UserId>,
    generation: u64,
    link: Link,
    subscription: Option<Subscription>,
    next_subscription_seq: u64,
    backoff: Backoff,
    pending_retry: Option<RetryToken>,
    next_retry_token: u64,
    heartbeat: NegotiatedHeartBeat,
    last_received: Option<I>,
    last_sent: Option<I>,
    server_session: Option<String>,
}

impl<I> Session<I>
where
    I: MonotonicInstant,
{
    /// Create an idle session in [`ConnectionState::Disconnected`].
    pub fn new(config: SessionConfig) -> Self {
        let backoff = Backoff::new(config.reconnect);
        Self {
            state: ConnectionState::Disconnected,
            config,
            user_id: None,
            generation: 0,
            link: Link::Idle,
            subscription: None,
            next_subscription_seq: 0,
            backoff,
            pending_retry: None,
            next_retry_token: 0,
            heartbeat: NegotiatedHeartBeat::default(),
            last_received: None,
            last_sent: None,
            server_session: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connected with a live transport.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.link == Link::Open
    }

    /// User the session belongs to, if any.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Active subscription. Only present while connected.
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Retries scheduled in the current outage.
    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    /// Retry waiting to fire, if any.
    pub fn pending_retry(&self) -> Option<RetryToken> {
        self.pending_retry
    }

    /// Generation of the current (or most recent) transport.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Session id the server reported in `CONNECTED`.
    pub fn server_session(&self) -> Option<&str> {
        self.server_session.as_deref()
    }

    /// Heart-beat intervals agreed with the server.
    pub fn negotiated_heartbeat(&self) -> NegotiatedHeartBeat {
        self.heartbeat
    }

    /// Configuration in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            connected: self.is_connected(),
            transport_live: self.link == Link::Open,
            reconnect_attempts: self.backoff.attempts(),
            subscribed: self.subscription.is_some(),
            user_id: self.user_id.clone(),
        }
    }

    /// Start a session for `user_id`.
    ///
    /// No-op if already connecting or connected for the same user. Any other
    /// session (different user, failed, or waiting on a retry) is torn down
    /// first. Resets the retry counter.
    pub fn connect(&mut self, user_id: UserId, now: I) -> Vec<SessionAction> {
        if self.state.is_active() && self.user_id.as_ref() == Some(&user_id) {
            tracing::debug!(user = %user_id, state = %self.state, "connect ignored, session already active");
            return Vec::new();
        }

        let mut actions = self.disconnect(now);
        self.backoff.reset();
        self.user_id = Some(user_id);
        actions.extend(self.open(now));
        actions
    }

    /// The transport for `generation` is open; start the STOMP handshake.
    ///
    /// # Errors
    ///
    /// - `SessionError::Protocol` if a configured connect header cannot be
    ///   encoded
    pub fn transport_opened(
        &mut self,
        generation: u64,
        now: I,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if generation != self.generation || self.link != Link::Opening {
            tracing::debug!(generation, current = self.generation, "stale transport open ignored");
            return Ok(Vec::new());
        }

        self.link = Link::Open;
        self.last_received = Some(now);

        let frame = Frame::connect(
            &self.config.host,
            &self.config.heartbeat.to_header_value(),
            &self.config.connect_headers,
        );
        frame.to_bytes()?;

        Ok(vec![self.send(frame, now)])
    }

    /// Process one inbound packet from the transport for `generation`.
    ///
    /// # Errors
    ///
    /// - `SessionError::UnexpectedFrame` if the frame is not valid in the
    ///   current state. The session is unchanged; callers log and continue.
    pub fn handle_packet(
        &mut self,
        generation: u64,
        packet: Packet,
        now: I,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if generation != self.generation || self.link != Link::Open {
            tracing::debug!(generation, current = self.generation, "stale packet ignored");
            return Ok(Vec::new());
        }

        self.last_received = Some(now);

        let frame = match packet {
            Packet::Heartbeat => return Ok(Vec::new()),
            Packet::Frame(frame) => frame,
        };

        match (self.state, frame.command) {
            (ConnectionState::Connecting, Command::Connected) => self.complete_handshake(&frame, now),

            (ConnectionState::Connected, Command::Message) => Ok(self.route(&frame)),

            (ConnectionState::Connected, Command::Receipt) => Ok(Vec::new()),

            (ConnectionState::Connecting | ConnectionState::Connected, Command::Error) => {
                let reason = frame.header(headers::MESSAGE).unwrap_or("server error").to_string();
                tracing::warn!(%reason, "server sent ERROR frame");
                Ok(self.lost(&reason))
            },

            (state, command) => Err(SessionError::UnexpectedFrame { state, command }),
        }
    }

    /// The transport for `generation` closed or failed.
    pub fn connection_lost(&mut self, generation: u64, reason: &str, _now: I) -> Vec<SessionAction> {
        if generation != self.generation || self.link == Link::Idle {
            tracing::debug!(generation, current = self.generation, "stale transport close ignored");
            return Vec::new();
        }

        self.lost(reason)
    }

    /// A scheduled retry's delay has elapsed.
    ///
    /// Does nothing if `token` was cancelled or superseded, or if the session
    /// is already active.
    pub fn retry_due(&mut self, token: RetryToken, now: I) -> Vec<SessionAction> {
        if self.pending_retry != Some(token) {
            tracing::debug!(%token, "cancelled retry ignored");
            return Vec::new();
        }
        self.pending_retry = None;

        if self.state.is_active() || self.user_id.is_none() {
            return Vec::new();
        }

        tracing::info!(attempt = self.backoff.attempts(), "reconnecting");
        self.open(now)
    }

    /// Tear the session down.
    ///
    /// Idempotent. Cancels a pending retry, unsubscribes and says goodbye if
    /// connected, closes the transport and forgets the user.
    pub fn disconnect(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if let Some(token) = self.pending_retry.take() {
            actions.push(SessionAction::CancelRetry { token });
        }

        if self.is_connected() {
            if let Some(subscription) = self.subscription.take() {
                actions.push(self.send(subscription.unsubscribe_frame(), now));
            }
            actions.push(self.send(Frame::disconnect(), now));
        }

        if self.link != Link::Idle {
            actions.push(SessionAction::CloseTransport);
            self.generation += 1;
        }

        self.link = Link::Idle;
        self.subscription = None;
        self.user_id = None;
        self.reset_liveness();

        if self.state != ConnectionState::Disconnected {
            actions.push(self.transition(ConnectionState::Disconnected));
        }

        actions
    }

    /// Periodic maintenance: heart-beats and server silence.
    ///
    /// A connect attempt that hangs is not timed out here. It stays
    /// `Connecting` until the transport reports a close.
    pub fn tick(&mut self, now: I) -> Vec<SessionAction> {
        match self.state {
            ConnectionState::Connected if self.link == Link::Open => {
                if let Some(expect) = self.heartbeat.expect_every
                    && let Some(last) = self.last_received
                    && now - last > expect * HEARTBEAT_TOLERANCE
                {
                    let reason = format!("no server heart-beat for {:?}", now - last);
                    return self.lost(&reason);
                }

                if let Some(every) = self.heartbeat.send_every
                    && self.last_sent.is_none_or(|last| now - last >= every)
                {
                    self.last_sent = Some(now);
                    return vec![SessionAction::SendHeartbeat];
                }
                Vec::new()
            },
            _ => Vec::new(),
        }
    }

    fn open(&mut self, _now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        self.generation += 1;
        self.link = Link::Opening;
        self.reset_liveness();

        if self.state != ConnectionState::Connecting {
            actions.push(self.transition(ConnectionState::Connecting));
        }

        actions.push(SessionAction::OpenTransport {
            endpoint: self.config.endpoint.clone(),
            generation: self.generation,
        });
        actions
    }

    fn complete_handshake(
        &mut self,
        frame: &Frame,
        now: I,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Some(user_id) = self.user_id.clone() else {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "complete handshake without a user".to_string(),
            });
        };

        let server_beat = match frame.header(headers::HEART_BEAT).map(HeartBeat::parse) {
            Some(Ok(beat)) => beat,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "ignoring server heart-beat header");
                HeartBeat::DISABLED
            },
            None => HeartBeat::DISABLED,
        };

        self.heartbeat = HeartBeat::negotiate(self.config.heartbeat, server_beat);
        self.server_session = frame.header(headers::SESSION).map(str::to_string);
        self.backoff.reset();

        let subscription = Subscription::new(self.next_subscription_seq, user_id);
        self.next_subscription_seq += 1;

        tracing::info!(
            user = %subscription.user_id(),
            destination = subscription.destination(),
            version = frame.header(headers::VERSION).unwrap_or("1.0"),
            "notification channel connected"
        );

        let subscribe = subscription.subscribe_frame();
        self.subscription = Some(subscription);

        Ok(vec![self.transition(ConnectionState::Connected), self.send(subscribe, now)])
    }

    fn route(&self, frame: &Frame) -> Vec<SessionAction> {
        let Some(subscription) = &self.subscription else {
            return Vec::new();
        };

        match subscription.route(frame) {
            RouteOutcome::Delivered(event) => vec![SessionAction::Deliver(event)],
            RouteOutcome::Ignored(reason) => {
                tracing::debug!(%reason, "message ignored");
                Vec::new()
            },
            RouteOutcome::Malformed(err) => {
                tracing::warn!(
                    error = %err,
                    message_id = frame.header(headers::MESSAGE_ID).unwrap_or("-"),
                    "dropping malformed notification"
                );
                Vec::new()
            },
        }
    }

    fn lost(&mut self, reason: &str) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if self.link != Link::Idle {
            actions.push(SessionAction::CloseTransport);
        }
        self.link = Link::Idle;
        self.subscription = None;
        self.reset_liveness();

        let next = match self.state {
            ConnectionState::Connecting => ConnectionState::Failed,
            ConnectionState::Connected => ConnectionState::Disconnected,
            ConnectionState::Disconnected | ConnectionState::Failed => return actions,
        };

        tracing::info!(%reason, state = %self.state, "notification channel lost");
        actions.push(self.transition(next));
        actions.extend(self.schedule_retry());
        actions
    }

    fn schedule_retry(&mut self) -> Vec<SessionAction> {
        match self.backoff.next_delay() {
            Some(delay) => {
                let token = RetryToken(self.next_retry_token);
                self.next_retry_token += 1;
                self.pending_retry = Some(token);

                let attempt = self.backoff.attempts();
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");

                vec![SessionAction::ScheduleRetry { token, delay, attempt }]
            },
            None => {
                tracing::warn!(
                    attempts = self.backoff.attempts(),
                    "reconnect attempts exhausted, giving up"
                );
                if self.state == ConnectionState::Disconnected {
                    Vec::new()
                } else {
                    vec![self.transition(ConnectionState::Disconnected)]
                }
            },
        }
    }

    fn send(&mut self, frame: Frame, now: I) -> SessionAction {
        tracing::debug!(command = %frame.command, "sending frame");
        self.last_sent = Some(now);
        SessionAction::SendFrame(frame)
    }

    fn transition(&mut self, to: ConnectionState) -> SessionAction {
        let from = self.state;
        self.state = to;
        tracing::debug!(%from, %to, "state transition");
        SessionAction::Transition { from, to }
    }

    fn reset_liveness(&mut self) {
        self.heartbeat = NegotiatedHeartBeat::default();
        self.last_received = None;
        self.last_sent = None;
        self.server_session = None;
    }
}
