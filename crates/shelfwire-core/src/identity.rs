//! Logged-in user identity.

use std::fmt;

/// Identifier of the logged-in user, as used in the notification destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier. Returns `None` for blank input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current user identity.
///
/// Consulted when the runtime starts and whenever the host reports that the
/// login state may have changed. `None` means nobody is logged in, in which
/// case no connection is attempted.
pub trait IdentityProvider {
    /// The logged-in user, if any.
    fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, e.g. from a command-line flag.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    /// Always report `user`.
    pub fn new(user: Option<UserId>) -> Self {
        Self(user)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}
