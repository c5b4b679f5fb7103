//! Wire protocol for the Shelfwire notification channel.
//!
//! The server pushes loan-status events over STOMP 1.2 carried in WebSocket
//! text messages. This crate owns everything that touches bytes:
//!
//! - [`Frame`] and [`Packet`]: STOMP text framing (command line, escaped
//!   headers, NUL-terminated body) and bare-EOL heart-beats
//! - [`HeartBeat`]: the `heart-beat` header and its negotiation rules
//! - [`NotificationEvent`]: the JSON body of a notification `MESSAGE`
//!
//! Nothing here performs I/O or keeps connection state. The session state
//! machine in `shelfwire-core` decides which frames to send and when.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frame;
pub mod headers;
pub mod heartbeat;
pub mod notification;

pub use errors::{ProtocolError, Result};
pub use frame::{Command, Frame, MAX_BODY_SIZE, Packet};
pub use heartbeat::{HeartBeat, NegotiatedHeartBeat};
pub use notification::{NotificationEvent, NotificationStatus};
