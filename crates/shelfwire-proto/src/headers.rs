//! Header names used by the channel.

/// Protocol versions the client accepts (`CONNECT`).
pub const ACCEPT_VERSION: &str = "accept-version";

/// Virtual host (`CONNECT`).
pub const HOST: &str = "host";

/// Heart-beat offer or agreement (`CONNECT`, `CONNECTED`).
pub const HEART_BEAT: &str = "heart-beat";

/// Negotiated protocol version (`CONNECTED`).
pub const VERSION: &str = "version";

/// Server-assigned session id (`CONNECTED`).
pub const SESSION: &str = "session";

/// Server product name (`CONNECTED`).
pub const SERVER: &str = "server";

/// Subscription destination (`SUBSCRIBE`, `MESSAGE`).
pub const DESTINATION: &str = "destination";

/// Subscription id (`SUBSCRIBE`, `UNSUBSCRIBE`).
pub const ID: &str = "id";

/// Acknowledgement mode (`SUBSCRIBE`).
pub const ACK: &str = "ack";

/// Subscription a message belongs to (`MESSAGE`).
pub const SUBSCRIPTION: &str = "subscription";

/// Server-assigned message id (`MESSAGE`).
pub const MESSAGE_ID: &str = "message-id";

/// Receipt request (`DISCONNECT`) or receipt id (`RECEIPT`).
pub const RECEIPT: &str = "receipt";

/// Receipt id acknowledged by the server (`RECEIPT`).
pub const RECEIPT_ID: &str = "receipt-id";

/// Short error description (`ERROR`).
pub const MESSAGE: &str = "message";

/// Body MIME type.
pub const CONTENT_TYPE: &str = "content-type";

/// Body length in octets.
pub const CONTENT_LENGTH: &str = "content-length";
