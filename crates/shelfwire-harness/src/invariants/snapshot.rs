//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use shelfwire_app::{App, Driver, Runtime};
use shelfwire_core::{ConnectionState, Session};

/// Snapshot of the whole client.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Notification store.
    pub store: StoreSnapshot,
    /// Session, when the snapshot was taken from a runtime.
    pub session: Option<SessionSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot of the app alone.
    pub fn from_app(app: &App) -> Self {
        Self { store: StoreSnapshot::from_app(app), session: None }
    }

    /// Snapshot of app and session.
    pub fn from_runtime<D: Driver>(runtime: &Runtime<D>) -> Self {
        Self {
            store: StoreSnapshot::from_app(runtime.app()),
            session: Some(SessionSnapshot::from_session(runtime.session())),
        }
    }
}

/// Snapshot of the notification store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Ids in display order (newest first).
    pub ids: Vec<u64>,
    /// Read flags, parallel to `ids`.
    pub read: Vec<bool>,
    /// Count the store reports.
    pub unread_count: usize,
}

impl StoreSnapshot {
    /// Capture the app's store.
    pub fn from_app(app: &App) -> Self {
        let (ids, read) = app.notifications().map(|n| (n.id().value(), n.is_read())).unzip();
        Self { ids, read, unread_count: app.unread_count() }
    }
}

/// Snapshot of the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Connection state.
    pub state: ConnectionState,
    /// Whether a subscription is active.
    pub subscribed: bool,
    /// Retries scheduled in the current outage.
    pub reconnect_attempts: u32,
    /// Configured retry bound.
    pub max_attempts: u32,
    /// Whether a retry is pending.
    pub retry_pending: bool,
}

impl SessionSnapshot {
    /// Capture `session`.
    pub fn from_session<I>(session: &Session<I>) -> Self
    where
        I: shelfwire_core::MonotonicInstant,
    {
        Self {
            state: session.state(),
            subscribed: session.subscription().is_some(),
            reconnect_attempts: session.reconnect_attempts(),
            max_attempts: session.config().reconnect.max_attempts,
            retry_pending: session.pending_retry().is_some(),
        }
    }
}
