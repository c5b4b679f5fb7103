//! Line commands for the CLI.
//!
//! The CLI reads commands from stdin, one per line, and turns them into
//! driver events. Parsing is pure so it can be tested without a terminal.

use shelfwire_app::{AppEvent, DriverEvent, NotificationId};

/// Help text listing the commands.
pub const HELP: &str = "commands: read <id> | read-all | clear | login | reconnect | quit";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mark one notification read
    Read(NotificationId),
    /// Mark every notification read
    ReadAll,
    /// Drop every notification
    Clear,
    /// Re-read the identity file
    Login,
    /// Ask for a fresh connection
    Reconnect,
    /// Stop the client
    Quit,
}

impl Command {
    /// Parse one line. Blank lines and unknown commands yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match words.next()? {
            "read" | "r" => {
                let id = words.next()?.trim_start_matches('#').parse::<u64>().ok()?;
                Self::Read(NotificationId::from(id))
            },
            "read-all" | "all" => Self::ReadAll,
            "clear" => Self::Clear,
            "login" => Self::Login,
            "reconnect" => Self::Reconnect,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return None,
        };

        if words.next().is_some() {
            return None;
        }
        Some(command)
    }

    /// Driver event this command produces.
    pub fn into_event(self) -> DriverEvent {
        match self {
            Self::Read(id) => DriverEvent::App(AppEvent::MarkAsRead(id)),
            Self::ReadAll => DriverEvent::App(AppEvent::MarkAllAsRead),
            Self::Clear => DriverEvent::App(AppEvent::ClearNotifications),
            Self::Login => DriverEvent::IdentityChanged,
            Self::Reconnect => DriverEvent::App(AppEvent::Reconnect),
            Self::Quit => DriverEvent::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_with_or_without_hash() {
        assert_eq!(Command::parse("read 3"), Some(Command::Read(NotificationId::from(3))));
        assert_eq!(Command::parse("  r #12 "), Some(Command::Read(NotificationId::from(12))));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("read"), None);
        assert_eq!(Command::parse("read x"), None);
        assert_eq!(Command::parse("clear now"), None);
        assert_eq!(Command::parse("borrow 3"), None);
    }

    #[test]
    fn maps_to_driver_events() {
        assert_eq!(
            Command::parse("read-all").map(Command::into_event),
            Some(DriverEvent::App(AppEvent::MarkAllAsRead))
        );
        assert_eq!(Command::parse("quit").map(Command::into_event), Some(DriverEvent::Shutdown));
        assert_eq!(Command::parse("login").map(Command::into_event), Some(DriverEvent::IdentityChanged));
    }
}
