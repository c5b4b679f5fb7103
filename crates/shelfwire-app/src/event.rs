//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the [`crate::App`]
//! state machine.
//!
//! Events originate from two sources:
//! - The session, via the runtime (connection changes, notifications).
//! - The host UI (login changes, toast buttons, list commands).

use shelfwire_core::{ConnectionState, UserId};
use shelfwire_proto::NotificationEvent;

use crate::NotificationId;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Session changed state.
    ConnectionChanged(ConnectionState),

    /// A notification arrived.
    NotificationReceived {
        /// Decoded payload.
        event: NotificationEvent,
        /// Receipt time, Unix milliseconds.
        received_at_ms: i64,
    },

    /// The logged-in user changed (`None` on logout).
    UserChanged(Option<UserId>),

    /// Ask for a fresh connection for the current user.
    Reconnect,

    /// Mark one notification read.
    MarkAsRead(NotificationId),

    /// Mark every notification read.
    MarkAllAsRead,

    /// Drop every notification.
    ClearNotifications,
}
