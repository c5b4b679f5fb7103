//! Presentation mapping for notifications.
//!
//! Pure functions from store contents to the strings and colors the UI shows.
//! Nothing here can fail: unknown status codes fall back to a generic label.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use shelfwire_proto::NotificationStatus;

use crate::{
    event::AppEvent,
    store::{Notification, NotificationId},
};

/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

/// Label of the toast button that marks the notification read.
pub const TOAST_ACTION_LABEL: &str = "Xem";

/// Badge text shown instead of counts above this value.
pub const BADGE_OVERFLOW: usize = 99;

/// Text shown when the list is empty.
pub const EMPTY_LIST_TEXT: &str = "Chưa có thông báo nào";

/// Indicator colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorColor {
    /// Borrowed
    Blue,
    /// Returned, connected
    Green,
    /// Approved
    Emerald,
    /// Rejected, disconnected
    Red,
    /// Anything else
    Gray,
}

impl IndicatorColor {
    /// Color name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Emerald => "emerald",
            Self::Red => "red",
            Self::Gray => "gray",
        }
    }
}

/// Label and color for a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    /// Short label
    pub label: &'static str,
    /// Indicator color
    pub color: IndicatorColor,
}

/// Badge for `status`.
pub fn status_badge(status: &NotificationStatus) -> StatusBadge {
    let (label, color) = match status {
        NotificationStatus::Borrowed => ("Đã mượn", IndicatorColor::Blue),
        NotificationStatus::Returned => ("Đã trả", IndicatorColor::Green),
        NotificationStatus::Approved => ("Đã duyệt", IndicatorColor::Emerald),
        NotificationStatus::Rejected => ("Từ chối", IndicatorColor::Red),
        NotificationStatus::Other(_) => ("Thông báo", IndicatorColor::Gray),
    };
    StatusBadge { label, color }
}

/// Toast headline for `status`.
pub fn toast_title(status: &NotificationStatus) -> &'static str {
    match status {
        NotificationStatus::Borrowed => "📚 Sách đã được mượn",
        NotificationStatus::Returned => "↩️ Sách đã được trả",
        NotificationStatus::Approved => "✅ Đã phê duyệt",
        NotificationStatus::Rejected => "❌ Bị từ chối",
        NotificationStatus::Other(_) => "📢 Thông báo mới",
    }
}

/// Button attached to a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastAction {
    /// Button label
    pub label: &'static str,
    /// Notification the button marks read
    pub notification: NotificationId,
}

impl ToastAction {
    /// Event to feed back into the app when the button is pressed.
    pub fn event(&self) -> AppEvent {
        AppEvent::MarkAsRead(self.notification)
    }
}

/// Transient alert for a new notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Headline
    pub title: &'static str,
    /// Message and book title
    pub description: String,
    /// Time on screen
    pub duration: Duration,
    /// "Mark as read" button
    pub action: ToastAction,
}

/// Toast announcing `notification`.
pub fn toast_for(notification: &Notification) -> Toast {
    let description = match notification.book_title() {
        Some(title) => format!("{} - \"{title}\"", notification.message()),
        None => notification.message().to_string(),
    };

    Toast {
        title: toast_title(notification.status()),
        description,
        duration: TOAST_DURATION,
        action: ToastAction { label: TOAST_ACTION_LABEL, notification: notification.id() },
    }
}

/// Text of the unread badge on the bell. `None` hides the badge.
pub fn unread_badge_text(count: usize) -> Option<String> {
    match count {
        0 => None,
        n if n > BADGE_OVERFLOW => Some(format!("{BADGE_OVERFLOW}+")),
        n => Some(n.to_string()),
    }
}

/// Tooltip of the bell button.
pub fn bell_title(unread: usize) -> String {
    format!("{unread} thông báo chưa đọc")
}

/// Color and tooltip of the connection dot.
pub fn connection_indicator(connected: bool) -> (IndicatorColor, &'static str) {
    if connected { (IndicatorColor::Green, "Đã kết nối") } else { (IndicatorColor::Red, "Mất kết nối") }
}

/// Receipt time relative to now, in the local time zone.
pub fn relative_time(received_at_ms: i64, now_ms: i64) -> String {
    relative_time_in(received_at_ms, now_ms, &Local)
}

/// Receipt time relative to now, with dates rendered in `tz`.
///
/// Under a minute reads "Vừa xong", under an hour "N phút trước", under a
/// day "N giờ trước", and anything older falls back to `d/m/yyyy`.
pub fn relative_time_in<Tz: TimeZone>(received_at_ms: i64, now_ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let minutes = now_ms.saturating_sub(received_at_ms).max(0) / 60_000;

    match minutes {
        0 => "Vừa xong".to_string(),
        1..60 => format!("{minutes} phút trước"),
        60..1440 => format!("{} giờ trước", minutes / 60),
        _ => match DateTime::from_timestamp_millis(received_at_ms) {
            Some(utc) => utc.with_timezone(tz).format("%-d/%-m/%Y").to_string(),
            None => String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shelfwire_proto::NotificationEvent;

    use super::*;
    use crate::NotificationStore;

    #[test]
    fn known_statuses_have_labels() {
        assert_eq!(status_badge(&NotificationStatus::Borrowed), StatusBadge {
            label: "Đã mượn",
            color: IndicatorColor::Blue
        });
        assert_eq!(status_badge(&NotificationStatus::Returned).color, IndicatorColor::Green);
        assert_eq!(status_badge(&NotificationStatus::Approved).label, "Đã duyệt");
        assert_eq!(status_badge(&NotificationStatus::Rejected).color, IndicatorColor::Red);
    }

    #[test]
    fn unknown_status_falls_back() {
        let status = NotificationStatus::Other("OVERDUE".to_string());
        assert_eq!(status_badge(&status).color, IndicatorColor::Gray);
        assert_eq!(toast_title(&status), "📢 Thông báo mới");
    }

    #[test]
    fn toast_describes_notification() {
        let mut store = NotificationStore::new();
        let notification =
            store.add(NotificationEvent::new("BORROWED", "msg1").with_book_title("Dune"), 0);
        let toast = toast_for(notification);

        assert_eq!(toast.title, "📚 Sách đã được mượn");
        assert_eq!(toast.description, "msg1 - \"Dune\"");
        assert_eq!(toast.duration, Duration::from_secs(5));
        assert_eq!(toast.action.label, "Xem");
        assert_eq!(toast.action.event(), AppEvent::MarkAsRead(notification.id()));
    }

    #[test]
    fn toast_without_book_title() {
        let mut store = NotificationStore::new();
        let toast = toast_for(store.add(NotificationEvent::new("REJECTED", "no copies"), 0));
        assert_eq!(toast.description, "no copies");
    }

    #[test]
    fn badge_text_caps_at_99() {
        assert_eq!(unread_badge_text(0), None);
        assert_eq!(unread_badge_text(7).as_deref(), Some("7"));
        assert_eq!(unread_badge_text(99).as_deref(), Some("99"));
        assert_eq!(unread_badge_text(100).as_deref(), Some("99+"));
        assert_eq!(bell_title(3), "3 thông báo chưa đọc");
    }

    #[test]
    fn connection_dot() {
        assert_eq!(connection_indicator(true).0, IndicatorColor::Green);
        assert_eq!(connection_indicator(false), (IndicatorColor::Red, "Mất kết nối"));
    }

    #[test]
    fn relative_times() {
        let now = 1_760_000_000_000;
        assert_eq!(relative_time_in(now - 30_000, now, &Utc), "Vừa xong");
        assert_eq!(relative_time_in(now + 5_000, now, &Utc), "Vừa xong");
        assert_eq!(relative_time_in(now - 5 * 60_000, now, &Utc), "5 phút trước");
        assert_eq!(relative_time_in(now - 3 * 3_600_000, now, &Utc), "3 giờ trước");

        // 2025-10-09T08:53:20Z, read two days later
        let received = now;
        assert_eq!(relative_time_in(received, received + 2 * 86_400_000, &Utc), "9/10/2025");
    }
}
