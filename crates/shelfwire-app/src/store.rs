//! In-memory notification store.
//!
//! Holds every notification received since the last clear, newest first,
//! plus a running unread count.
//!
//! # Invariants
//!
//! - `unread_count()` equals the number of entries with `read == false`
//! - Ids are strictly increasing in arrival order and never reused, even
//!   across `clear()`
//! - Only the `read` flag of an entry ever changes after it is added

use std::fmt;

use shelfwire_proto::{NotificationEvent, NotificationStatus};

/// Locally assigned notification id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for NotificationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A received notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    id: NotificationId,
    event: NotificationEvent,
    received_at_ms: i64,
    read: bool,
}

impl Notification {
    /// Local id.
    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// Payload as received.
    pub fn event(&self) -> &NotificationEvent {
        &self.event
    }

    /// Status code.
    pub fn status(&self) -> &NotificationStatus {
        &self.event.status
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.event.message
    }

    /// Book title, if the server sent one.
    pub fn book_title(&self) -> Option<&str> {
        self.event.book_title.as_deref()
    }

    /// Receipt time, Unix milliseconds.
    pub fn received_at_ms(&self) -> i64 {
        self.received_at_ms
    }

    /// Whether the user has seen it.
    pub fn is_read(&self) -> bool {
        self.read
    }
}

/// Newest-first notification list.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    // Oldest first so ids stay sorted for binary search.
    entries: Vec<Notification>,
    unread: usize,
    next_id: u64,
}

impl NotificationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new, unread notification.
    pub fn add(&mut self, event: NotificationEvent, received_at_ms: i64) -> &Notification {
        let id = NotificationId(self.next_id);
        self.next_id += 1;
        self.unread += 1;

        let index = self.entries.len();
        self.entries.push(Notification { id, event, received_at_ms, read: false });
        &self.entries[index]
    }

    /// Mark one notification read.
    ///
    /// Returns `true` if it was unread. Unknown ids and already-read entries
    /// are left alone.
    pub fn mark_as_read(&mut self, id: NotificationId) -> bool {
        let Ok(index) = self.entries.binary_search_by_key(&id, |n| n.id) else {
            return false;
        };

        let entry = &mut self.entries[index];
        if entry.read {
            return false;
        }

        entry.read = true;
        self.unread -= 1;
        true
    }

    /// Mark everything read.
    pub fn mark_all_as_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
        self.unread = 0;
    }

    /// Drop every notification.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.unread = 0;
    }

    /// Look up by id.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.binary_search_by_key(&id, |n| n.id).ok().map(|index| &self.entries[index])
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> impl ExactSizeIterator<Item = &Notification> + '_ {
        self.entries.iter().rev()
    }

    /// Number of unread notifications.
    pub fn unread_count(&self) -> usize {
        self.unread
    }

    /// Number of notifications.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
