//! Property-based tests for the session state machine.
//!
//! Drives a session with arbitrary interleavings of user calls and transport
//! events and checks the invariants that must hold after every step:
//! - A subscription exists only while connected
//! - Retries scheduled per outage never exceed the policy bound
//! - After `disconnect`, nothing brings the session back without a new
//!   `connect`

use std::time::{Duration, Instant};

use proptest::prelude::*;
use shelfwire_core::{
    ConnectionState, ReconnectPolicy, Session, SessionAction, SessionConfig, UserId,
};
use shelfwire_proto::{Command, Frame, Packet, headers};

#[derive(Debug, Clone)]
enum Op {
    Connect(u8),
    Disconnect,
    Opened { stale: bool },
    Connected { stale: bool },
    Message { valid: bool },
    Lost { stale: bool },
    RetryDue,
    Advance(u16),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3).prop_map(Op::Connect),
        Just(Op::Disconnect),
        any::<bool>().prop_map(|stale| Op::Opened { stale }),
        any::<bool>().prop_map(|stale| Op::Connected { stale }),
        any::<bool>().prop_map(|valid| Op::Message { valid }),
        any::<bool>().prop_map(|stale| Op::Lost { stale }),
        Just(Op::RetryDue),
        (0u16..20_000).prop_map(Op::Advance),
    ]
}

fn connected_packet() -> Packet {
    Packet::Frame(Frame::new(Command::Connected).with_header(headers::HEART_BEAT, "4000,4000"))
}

fn message_packet(valid: bool) -> Packet {
    let body: &[u8] = if valid { br#"{"status":"APPROVED","message":"ok"}"# } else { b"{" };
    Packet::Frame(
        Frame::new(Command::Message)
            .with_header(headers::SUBSCRIPTION, "sub-0")
            .with_body(body.to_vec()),
    )
}

#[allow(clippy::disallowed_methods)]
fn start() -> Instant {
    Instant::now()
}

#[test]
fn prop_session_invariants_hold() {
    proptest!(|(ops in prop::collection::vec(arbitrary_op(), 1..80), max_attempts in 0u32..6)| {
        let policy = ReconnectPolicy { base_delay: Duration::from_secs(5), max_attempts };
        let config = SessionConfig { reconnect: policy, ..SessionConfig::default() };
        let mut session: Session<Instant> = Session::new(config);
        let mut now = start();

        for op in ops {
            let generation = session.generation();
            let stale_generation = generation.saturating_sub(1);
            let before = session.state();

            let actions = match op {
                Op::Connect(user) => session.connect(UserId::from(u64::from(user)), now),
                Op::Disconnect => session.disconnect(now),
                Op::Opened { stale } => {
                    let g = if stale { stale_generation } else { generation };
                    session.transport_opened(g, now).unwrap_or_default()
                },
                Op::Connected { stale } => {
                    let g = if stale { stale_generation } else { generation };
                    session.handle_packet(g, connected_packet(), now).unwrap_or_default()
                },
                Op::Message { valid } => {
                    session.handle_packet(generation, message_packet(valid), now).unwrap_or_default()
                },
                Op::Lost { stale } => {
                    let g = if stale { stale_generation } else { generation };
                    session.connection_lost(g, "lost", now)
                },
                Op::RetryDue => match session.pending_retry() {
                    Some(token) => session.retry_due(token, now),
                    None => Vec::new(),
                },
                Op::Advance(ms) => {
                    now += Duration::from_millis(u64::from(ms));
                    session.tick(now)
                },
            };

            // PROPERTY: subscription implies connected
            if session.subscription().is_some() {
                prop_assert_eq!(session.state(), ConnectionState::Connected);
            }

            // PROPERTY: attempts bounded
            prop_assert!(session.reconnect_attempts() <= max_attempts);

            // PROPERTY: pending retry only while waiting on one
            if session.pending_retry().is_some() {
                prop_assert!(!session.state().is_active());
            }

            // PROPERTY: transitions are reported and consistent
            let mut state = before;
            for action in &actions {
                if let SessionAction::Transition { from, to } = action {
                    prop_assert_eq!(*from, state);
                    prop_assert_ne!(from, to);
                    state = *to;
                }
            }
            prop_assert_eq!(state, session.state());

            // PROPERTY: delivered events only while connected
            if actions.iter().any(|a| matches!(a, SessionAction::Deliver(_))) {
                prop_assert!(session.is_connected());
            }
        }
    });
}

#[test]
fn prop_disconnect_is_final_until_connect() {
    proptest!(|(ops in prop::collection::vec(arbitrary_op(), 0..40))| {
        let mut session: Session<Instant> = Session::new(SessionConfig::default());
        let mut now = start();
        session.connect(UserId::from(42), now);
        let old_generation = session.generation();
        let old_retry = {
            session.connection_lost(old_generation, "refused", now);
            session.pending_retry()
        };
        session.disconnect(now);

        for op in ops {
            match op {
                Op::Connect(_) => return Ok(()),
                Op::Opened { .. } => {
                    session.transport_opened(old_generation, now).unwrap_or_default();
                },
                Op::Connected { .. } => {
                    session.handle_packet(old_generation, connected_packet(), now).unwrap_or_default();
                },
                Op::Lost { .. } => {
                    session.connection_lost(old_generation, "late", now);
                },
                Op::RetryDue => {
                    if let Some(token) = old_retry {
                        session.retry_due(token, now);
                    }
                },
                Op::Advance(ms) => {
                    now += Duration::from_millis(u64::from(ms));
                    session.tick(now);
                },
                Op::Disconnect | Op::Message { .. } => {
                    session.disconnect(now);
                },
            }

            prop_assert_eq!(session.state(), ConnectionState::Disconnected);
            prop_assert!(session.pending_retry().is_none());
            prop_assert!(session.subscription().is_none());
        }
    });
}
