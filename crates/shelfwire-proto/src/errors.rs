//! Protocol error types.
//!
//! Every decode failure is structured. Malformed input from the server must
//! never panic the client; the session logs the error and drops the packet.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding STOMP frames and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input ended before the frame was complete
    #[error("frame truncated")]
    Truncated,

    /// Command line is not a STOMP command
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Header line without a `:` separator
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Header contains an undefined escape sequence
    #[error("invalid header escape in {0:?}")]
    InvalidEscape(String),

    /// Header cannot be represented in a frame that disables escaping
    #[error("header cannot be encoded: {0:?}")]
    UnencodableHeader(String),

    /// Command or header bytes are not valid UTF-8
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// `content-length` header is not a byte count
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// Body is not followed by the NUL octet
    #[error("missing NUL terminator after body")]
    MissingNullTerminator,

    /// Body exceeds [`crate::MAX_BODY_SIZE`]
    #[error("frame body too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual body size
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// `heart-beat` header is not `<ms>,<ms>`
    #[error("invalid heart-beat header: {0:?}")]
    InvalidHeartBeat(String),

    /// Frame body does not decode into the expected payload
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
