//! Error types for the notification channel core.
//!
//! Session errors never tear the channel down on their own. The runtime logs
//! them and keeps going; only transport loss and `ERROR` frames change state.

use shelfwire_proto::{Command, ProtocolError};
use thiserror::Error;

use crate::session::ConnectionState;

/// Errors from session state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation not valid in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: String,
    },

    /// Received a frame that makes no sense in the current state
    #[error("unexpected {command} frame in state {state:?}")]
    UnexpectedFrame {
        /// Current state when frame was received
        state: ConnectionState,
        /// Command of the unexpected frame
        command: Command,
    },

    /// Frame could not be parsed or encoded
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Why an inbound `MESSAGE` could not be turned into a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Body declared a non-JSON content type
    #[error("unsupported content-type: {0}")]
    ContentType(String),

    /// Body is not a valid notification payload
    #[error(transparent)]
    Payload(#[from] ProtocolError),
}
