//! Application state machine.
//!
//! This module defines the [`App`] state machine, the view model the UI
//! renders from. It is completely decoupled from I/O and protocol mechanics:
//! it consumes [`crate::AppEvent`] inputs and produces [`crate::AppAction`]
//! instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the notification store for the logged-in user.
//! - Tracks high-level connection state for the status dot.
//! - Turns login changes into connect/disconnect requests.

use shelfwire_core::{ConnectionState, UserId};

use crate::{
    AppAction, AppEvent, Notification, NotificationId, NotificationStore, presentation,
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies, fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Connection state as last reported by the session.
    connection: ConnectionState,
    /// Logged-in user. `None` when logged out.
    user: Option<UserId>,
    /// Notifications for `user`.
    store: NotificationStore,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Logged-out app with an empty store.
    pub fn new() -> Self {
        Self { connection: ConnectionState::Disconnected, user: None, store: NotificationStore::new() }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::ConnectionChanged(state) => {
                if self.connection == state {
                    return vec![];
                }
                self.connection = state;
                vec![AppAction::Render]
            },
            AppEvent::NotificationReceived { event, received_at_ms } => {
                let notification = self.store.add(event, received_at_ms);
                tracing::info!(
                    id = %notification.id(),
                    status = %notification.status(),
                    "notification received"
                );
                let toast = presentation::toast_for(notification);
                vec![AppAction::ShowToast(toast), AppAction::Render]
            },
            AppEvent::UserChanged(user) => {
                if self.user == user {
                    return vec![];
                }

                self.store.clear();
                self.user.clone_from(&user);

                match user {
                    Some(user_id) => vec![AppAction::Connect { user_id }, AppAction::Render],
                    None => vec![AppAction::Disconnect, AppAction::Render],
                }
            },
            AppEvent::Reconnect => match &self.user {
                Some(user_id) => vec![AppAction::Connect { user_id: user_id.clone() }],
                None => vec![],
            },
            AppEvent::MarkAsRead(id) => {
                if self.store.mark_as_read(id) {
                    vec![AppAction::Render]
                } else {
                    vec![]
                }
            },
            AppEvent::MarkAllAsRead => {
                self.store.mark_all_as_read();
                vec![AppAction::Render]
            },
            AppEvent::ClearNotifications => {
                self.store.clear();
                vec![AppAction::Render]
            },
        }
    }

    /// Mark one notification read.
    pub fn mark_as_read(&mut self, id: NotificationId) -> Vec<AppAction> {
        self.handle(AppEvent::MarkAsRead(id))
    }

    /// Mark every notification read.
    pub fn mark_all_as_read(&mut self) -> Vec<AppAction> {
        self.handle(AppEvent::MarkAllAsRead)
    }

    /// Drop every notification.
    pub fn clear_notifications(&mut self) -> Vec<AppAction> {
        self.handle(AppEvent::ClearNotifications)
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> impl ExactSizeIterator<Item = &Notification> + '_ {
        self.store.notifications()
    }

    /// Number of unread notifications.
    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    /// Underlying store.
    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// Whether the channel is connected.
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Connection state as last reported.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Logged-in user.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use shelfwire_proto::NotificationEvent;

    use super::*;

    fn received(status: &str, message: &str) -> AppEvent {
        AppEvent::NotificationReceived {
            event: NotificationEvent::new(status, message),
            received_at_ms: 0,
        }
    }

    #[test]
    fn login_connects_and_logout_disconnects() {
        let mut app = App::new();

        let actions = app.handle(AppEvent::UserChanged(UserId::new("42")));
        assert_eq!(actions, vec![
            AppAction::Connect { user_id: UserId::from(42) },
            AppAction::Render
        ]);

        assert!(app.handle(AppEvent::UserChanged(UserId::new("42"))).is_empty());

        let actions = app.handle(AppEvent::UserChanged(None));
        assert_eq!(actions, vec![AppAction::Disconnect, AppAction::Render]);
        assert_eq!(app.user(), None);
    }

    #[test]
    fn user_switch_clears_store() {
        let mut app = App::new();
        app.handle(AppEvent::UserChanged(UserId::new("42")));
        app.handle(received("BORROWED", "a"));
        assert_eq!(app.unread_count(), 1);

        let actions = app.handle(AppEvent::UserChanged(UserId::new("7")));

        assert_eq!(app.notifications().len(), 0);
        assert_eq!(app.unread_count(), 0);
        assert!(matches!(actions.first(), Some(AppAction::Connect { user_id }) if user_id.as_str() == "7"));
    }

    #[test]
    fn notification_shows_toast_and_renders() {
        let mut app = App::new();
        let actions = app.handle(received("RETURNED", "back"));

        let [AppAction::ShowToast(toast), AppAction::Render] = actions.as_slice() else {
            panic!("unexpected actions {actions:?}");
        };
        assert_eq!(toast.title, "↩️ Sách đã được trả");

        let actions = app.handle(toast.action.event());
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.unread_count(), 0);
    }

    #[test]
    fn repeated_mark_as_read_does_not_render() {
        let mut app = App::new();
        app.handle(received("BORROWED", "a"));
        let id = app.notifications().next().map(Notification::id).unwrap();

        assert_eq!(app.mark_as_read(id), vec![AppAction::Render]);
        assert!(app.mark_as_read(id).is_empty());
    }

    #[test]
    fn connection_changes_render_once() {
        let mut app = App::new();
        assert_eq!(app.handle(AppEvent::ConnectionChanged(ConnectionState::Connected)), vec![
            AppAction::Render
        ]);
        assert!(app.is_connected());
        assert!(app.handle(AppEvent::ConnectionChanged(ConnectionState::Connected)).is_empty());
    }

    #[test]
    fn reconnect_requires_user() {
        let mut app = App::new();
        assert!(app.handle(AppEvent::Reconnect).is_empty());

        app.handle(AppEvent::UserChanged(UserId::new("42")));
        assert_eq!(app.handle(AppEvent::Reconnect), vec![AppAction::Connect {
            user_id: UserId::from(42)
        }]);
    }
}
