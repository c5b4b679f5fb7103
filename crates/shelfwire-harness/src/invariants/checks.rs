//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use shelfwire_core::ConnectionState;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// The unread count equals the number of unread entries.
pub struct UnreadCountMatches;

impl Invariant for UnreadCountMatches {
    fn name(&self) -> &'static str {
        "unread_count_matches"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let store = &state.store;
        let unread = store.read.iter().filter(|read| !**read).count();

        if store.unread_count != unread || store.unread_count > store.ids.len() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "store reports {} unread, entries say {unread} of {}",
                    store.unread_count,
                    store.ids.len()
                ),
            });
        }
        Ok(())
    }
}

/// Notifications are listed newest first.
///
/// Ids come from a monotonic counter, so display order means strictly
/// decreasing ids.
pub struct NewestFirst;

impl Invariant for NewestFirst {
    fn name(&self) -> &'static str {
        "newest_first"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        match state.store.ids.windows(2).find(|w| w[0] <= w[1]) {
            Some(w) => Err(Violation {
                invariant: self.name(),
                message: format!("#{} listed before #{}", w[0], w[1]),
            }),
            None => Ok(()),
        }
    }
}

/// A subscription exists only while connected.
pub struct SubscriptionRequiresConnection;

impl Invariant for SubscriptionRequiresConnection {
    fn name(&self) -> &'static str {
        "subscription_requires_connection"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if let Some(session) = &state.session
            && session.subscribed
            && session.state != ConnectionState::Connected
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("subscribed while {}", session.state),
            });
        }
        Ok(())
    }
}

/// Reconnect attempts never exceed the configured bound.
pub struct AttemptsWithinBound;

impl Invariant for AttemptsWithinBound {
    fn name(&self) -> &'static str {
        "attempts_within_bound"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if let Some(session) = &state.session
            && session.reconnect_attempts > session.max_attempts
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} attempts, bound {}",
                    session.reconnect_attempts, session.max_attempts
                ),
            });
        }
        Ok(())
    }
}

/// A retry is only pending while no connection is up or in progress.
pub struct RetryOnlyWhileIdle;

impl Invariant for RetryOnlyWhileIdle {
    fn name(&self) -> &'static str {
        "retry_only_while_idle"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if let Some(session) = &state.session
            && session.retry_pending
            && session.state.is_active()
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("retry pending while {}", session.state),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{SessionSnapshot, StoreSnapshot};

    fn store(ids: &[u64], read: &[bool], unread_count: usize) -> SystemSnapshot {
        SystemSnapshot {
            store: StoreSnapshot { ids: ids.to_vec(), read: read.to_vec(), unread_count },
            session: None,
        }
    }

    fn session(state: ConnectionState, subscribed: bool, attempts: u32, retry: bool) -> SystemSnapshot {
        SystemSnapshot {
            store: StoreSnapshot::default(),
            session: Some(SessionSnapshot {
                state,
                subscribed,
                reconnect_attempts: attempts,
                max_attempts: 5,
                retry_pending: retry,
            }),
        }
    }

    #[test]
    fn unread_count_mismatch_detected() {
        assert!(UnreadCountMatches.check(&store(&[2, 1], &[false, true], 1)).is_ok());
        assert!(UnreadCountMatches.check(&store(&[2, 1], &[false, true], 2)).is_err());
    }

    #[test]
    fn out_of_order_detected() {
        assert!(NewestFirst.check(&store(&[3, 2, 1], &[false; 3], 3)).is_ok());
        assert!(NewestFirst.check(&store(&[1, 2], &[false; 2], 2)).is_err());
        assert!(NewestFirst.check(&store(&[2, 2], &[false; 2], 2)).is_err());
    }

    #[test]
    fn subscription_without_connection_detected() {
        let ok = session(ConnectionState::Connected, true, 0, false);
        let bad = session(ConnectionState::Disconnected, true, 0, false);

        assert!(SubscriptionRequiresConnection.check(&ok).is_ok());
        assert!(SubscriptionRequiresConnection.check(&bad).is_err());
    }

    #[test]
    fn attempts_over_bound_detected() {
        assert!(AttemptsWithinBound.check(&session(ConnectionState::Failed, false, 5, true)).is_ok());
        assert!(AttemptsWithinBound.check(&session(ConnectionState::Failed, false, 6, true)).is_err());
    }

    #[test]
    fn retry_while_connecting_detected() {
        assert!(RetryOnlyWhileIdle.check(&session(ConnectionState::Failed, false, 1, true)).is_ok());
        assert!(RetryOnlyWhileIdle.check(&session(ConnectionState::Connecting, false, 1, true)).is_err());
    }
}
