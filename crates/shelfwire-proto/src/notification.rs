//! Notification payload carried in `MESSAGE` bodies.
//!
//! ```json
//! { "status": "BORROWED", "message": "...", "bookTitle": "Dune", "bookId": 7 }
//! ```
//!
//! `status` and `message` are required. Unknown status codes are preserved
//! as [`NotificationStatus::Other`] rather than rejected.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Loan-status code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationStatus {
    /// A copy was borrowed
    Borrowed,
    /// A copy was returned
    Returned,
    /// A borrow request was approved
    Approved,
    /// A borrow request was rejected
    Rejected,
    /// Any code this client does not know
    Other(String),
}

impl NotificationStatus {
    /// Wire code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Borrowed => "BORROWED",
            Self::Returned => "RETURNED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for NotificationStatus {
    fn from(code: String) -> Self {
        match code.as_str() {
            "BORROWED" => Self::Borrowed,
            "RETURNED" => Self::Returned,
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            _ => Self::Other(code),
        }
    }
}

impl From<&str> for NotificationStatus {
    fn from(code: &str) -> Self {
        Self::from(code.to_string())
    }
}

impl From<NotificationStatus> for String {
    fn from(status: NotificationStatus) -> Self {
        match status {
            NotificationStatus::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loan-status change pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Status code
    pub status: NotificationStatus,
    /// Human-readable message
    pub message: String,
    /// Title of the book concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    /// Identifier of the book concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
}

impl NotificationEvent {
    /// Event with no book attached.
    pub fn new(status: impl Into<NotificationStatus>, message: impl Into<String>) -> Self {
        Self { status: status.into(), message: message.into(), book_title: None, book_id: None }
    }

    /// Attach a book title.
    #[must_use]
    pub fn with_book_title(mut self, title: impl Into<String>) -> Self {
        self.book_title = Some(title.into());
        self
    }

    /// Attach a book id.
    #[must_use]
    pub fn with_book_id(mut self, id: i64) -> Self {
        self.book_id = Some(id);
        self
    }

    /// Decode a `MESSAGE` body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Encode as a `MESSAGE` body.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
