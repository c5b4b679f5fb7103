//! Core state machines for the Shelfwire notification channel.
//!
//! Everything here is sans-IO. Methods take the current time and return
//! actions for a driver to execute, which keeps the logic deterministic and
//! testable without sockets or real clocks.
//!
//! - [`Session`]: connection lifecycle, STOMP handshake, subscription,
//!   heart-beats and disconnect
//! - [`Backoff`]: bounded exponential reconnection schedule
//! - [`Subscription`]: per-user destination and inbound message routing
//! - [`Environment`]: clock abstraction shared by production and simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod identity;
pub mod reconnect;
pub mod router;
pub mod session;

pub use env::{Environment, MonotonicInstant};
pub use error::{RouteError, SessionError};
pub use identity::{IdentityProvider, StaticIdentity, UserId};
pub use reconnect::{
    Backoff, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_BASE_DELAY, ReconnectPolicy,
};
pub use router::{RouteOutcome, Subscription};
pub use session::{
    ConnectionState, ConnectionStatus, DEFAULT_ENDPOINT, DEFAULT_HEARTBEAT_INTERVAL,
    RetryToken, Session, SessionAction, SessionConfig,
};
