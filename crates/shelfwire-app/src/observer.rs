//! Connection listeners.
//!
//! Each registration is independent: registering twice runs the callback
//! twice. Listeners run once per matching transition, in registration order,
//! and never see transitions that happened before they were registered.

use shelfwire_core::{ConnectionState, ConnectionStatus};

/// Handle returned by a registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ConnectionStatus) + Send>;

/// `on_connect` / `on_disconnect` registry.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    on_connect: Vec<(ListenerId, Listener)>,
    on_disconnect: Vec<(ListenerId, Listener)>,
}

impl Observers {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `listener` every time the session becomes connected.
    pub fn on_connect(&mut self, listener: impl FnMut(&ConnectionStatus) + Send + 'static) -> ListenerId {
        let id = self.allocate();
        self.on_connect.push((id, Box::new(listener)));
        id
    }

    /// Run `listener` every time a connecting or connected session drops.
    pub fn on_disconnect(
        &mut self,
        listener: impl FnMut(&ConnectionStatus) + Send + 'static,
    ) -> ListenerId {
        let id = self.allocate();
        self.on_disconnect.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.on_connect.len() + self.on_disconnect.len();
        self.on_connect.retain(|(listener, _)| *listener != id);
        self.on_disconnect.retain(|(listener, _)| *listener != id);
        before != self.on_connect.len() + self.on_disconnect.len()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.on_connect.len() + self.on_disconnect.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the listeners matching a `from → to` transition.
    pub fn notify(&mut self, from: ConnectionState, to: ConnectionState, status: &ConnectionStatus) {
        let listeners = if to == ConnectionState::Connected {
            &mut self.on_connect
        } else if from.is_active() && !to.is_active() {
            &mut self.on_disconnect
        } else {
            return;
        };

        for (_, listener) in listeners.iter_mut() {
            listener(status);
        }
    }

    fn allocate(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("on_connect", &self.on_connect.len())
            .field("on_disconnect", &self.on_disconnect.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn status(state: ConnectionState) -> ConnectionStatus {
        ConnectionStatus {
            state,
            connected: state == ConnectionState::Connected,
            transport_live: state == ConnectionState::Connected,
            reconnect_attempts: 0,
            subscribed: state == ConnectionState::Connected,
            user_id: None,
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnMut(&ConnectionStatus) + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move |_: &ConnectionStatus| {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn connect_listeners_fire_once_per_transition() {
        let mut observers = Observers::new();
        let (first, listener) = counter();
        observers.on_connect(listener);
        let (second, listener) = counter();
        observers.on_connect(listener);

        let connected = status(ConnectionState::Connected);
        observers.notify(ConnectionState::Connecting, ConnectionState::Connected, &connected);

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnect_listeners_fire_on_drop_only() {
        let mut observers = Observers::new();
        let (count, listener) = counter();
        observers.on_disconnect(listener);

        let failed = status(ConnectionState::Failed);
        let disconnected = status(ConnectionState::Disconnected);
        observers.notify(ConnectionState::Connecting, ConnectionState::Failed, &failed);
        observers.notify(ConnectionState::Connected, ConnectionState::Disconnected, &disconnected);
        observers.notify(ConnectionState::Failed, ConnectionState::Disconnected, &disconnected);
        observers.notify(ConnectionState::Disconnected, ConnectionState::Connecting, &disconnected);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregister_removes_listener() {
        let mut observers = Observers::new();
        let (count, listener) = counter();
        let id = observers.on_connect(listener);

        assert!(observers.unregister(id));
        assert!(!observers.unregister(id));
        assert!(observers.is_empty());

        let connected = status(ConnectionState::Connected);
        observers.notify(ConnectionState::Connecting, ConnectionState::Connected, &connected);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
