//! Fuzz target for the session state machine
//!
//! Drives a `Session` with arbitrary inputs, including stale generations,
//! garbage frames and clock jumps.
//!
//! # Invariants
//!
//! - Never panics
//! - A subscription exists only while `Connected`
//! - Reconnect attempts never exceed the configured maximum
//! - No retry is pending while a connection is up or being attempted
//! - `Deliver` is only emitted while `Connected`

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shelfwire_core::{ConnectionState, Session, SessionAction, SessionConfig, UserId};
use shelfwire_harness::SimInstant;
use shelfwire_proto::{Command, Frame, Packet, headers};

#[derive(Debug, Arbitrary)]
enum Input {
    Connect(u8),
    Disconnect,
    Opened { stale: bool },
    Connected,
    Message(Vec<u8>),
    Raw(Vec<u8>),
    Lost { stale: bool },
    RetryDue(u64),
    Advance(u16),
}

fuzz_target!(|inputs: Vec<Input>| {
    let mut session: Session<SimInstant> = Session::new(SessionConfig::default());
    let mut now = SimInstant::START;

    for input in inputs {
        let generation = session.generation();
        let actions = match input {
            Input::Connect(user) => session.connect(UserId::from(u64::from(user)), now),
            Input::Disconnect => session.disconnect(now),
            Input::Opened { stale } => {
                let generation = if stale { generation.wrapping_sub(1) } else { generation };
                session.transport_opened(generation, now).unwrap_or_default()
            },
            Input::Connected => {
                let frame = Frame::new(Command::Connected).with_header(headers::VERSION, "1.2");
                session.handle_packet(generation, Packet::Frame(frame), now).unwrap_or_default()
            },
            Input::Message(body) => {
                let mut frame = Frame::new(Command::Message).with_body(body);
                if let Some(subscription) = session.subscription() {
                    frame = frame
                        .with_header(headers::SUBSCRIPTION, subscription.id())
                        .with_header(headers::DESTINATION, subscription.destination());
                }
                session.handle_packet(generation, Packet::Frame(frame), now).unwrap_or_default()
            },
            Input::Raw(data) => match Packet::decode_all(&data) {
                Ok(packets) => packets
                    .into_iter()
                    .flat_map(|p| session.handle_packet(generation, p, now).unwrap_or_default())
                    .collect(),
                Err(_) => Vec::new(),
            },
            Input::Lost { stale } => {
                let generation = if stale { generation.wrapping_sub(1) } else { generation };
                session.connection_lost(generation, "fuzz", now)
            },
            Input::RetryDue(token) => match session.pending_retry() {
                Some(pending) if token % 2 == 0 => session.retry_due(pending, now),
                _ => Vec::new(),
            },
            Input::Advance(secs) => {
                now = now + Duration::from_secs(u64::from(secs));
                session.tick(now)
            },
        };

        for action in &actions {
            if matches!(action, SessionAction::Deliver(_)) {
                assert_eq!(session.state(), ConnectionState::Connected);
            }
        }

        if session.subscription().is_some() {
            assert_eq!(session.state(), ConnectionState::Connected);
        }
        assert!(session.reconnect_attempts() <= session.config().reconnect.max_attempts);
        if session.pending_retry().is_some() {
            assert!(!session.state().is_active());
        }
    }
});
