//! Deterministic simulation harness for the Shelfwire notification channel.
//!
//! Virtual-clock implementations of the Environment and Driver traits, so
//! the production [`shelfwire_app::Runtime`] runs unchanged against a
//! scripted broker with reproducible timing.
//!
//! # Scenarios
//!
//! [`SimWorld`] wires a runtime, a [`SimDriver`] and a [`SimServer`]
//! together and exposes the steps scenario tests are written in: establish
//! the channel, deliver a notification, fail a connection attempt, advance
//! time.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the store and
//! session invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;
pub mod world;

pub use invariants::{
    AttemptsWithinBound, Invariant, InvariantRegistry, InvariantResult, NewestFirst,
    RetryOnlyWhileIdle, SessionSnapshot, StoreSnapshot, SubscriptionRequiresConnection,
    SystemSnapshot, UnreadCountMatches, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError, SimHandle};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_server::SimServer;
pub use world::SimWorld;
