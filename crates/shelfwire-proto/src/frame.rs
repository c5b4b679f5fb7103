//! STOMP frame type and text codec.
//!
//! Wire layout (STOMP 1.2):
//!
//! ```text
//! COMMAND EOL
//! name:value EOL      (zero or more)
//! EOL
//! body NUL
//! ```
//!
//! `EOL` is `\n` or `\r\n`. A lone `EOL` outside a frame is a heart-beat.
//!
//! # Invariants
//!
//! - Header names and values are escaped (`\r`, `\n`, `:`, `\`) for every
//!   command except `CONNECT`, `STOMP` and `CONNECTED`, which forbid escapes.
//! - When a header is repeated, the first occurrence wins.
//! - Bodies never exceed [`MAX_BODY_SIZE`]. Oversized frames are rejected on
//!   both encode and decode.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    headers,
};

/// Largest accepted body (64 KiB, the default broker message size limit).
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// STOMP command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake
    Connect,
    /// Client handshake (1.2 alias of `CONNECT`)
    Stomp,
    /// Server handshake reply
    Connected,
    /// Client publish
    Send,
    /// Client subscribe
    Subscribe,
    /// Client unsubscribe
    Unsubscribe,
    /// Client acknowledge
    Ack,
    /// Client negative acknowledge
    Nack,
    /// Client transaction start
    Begin,
    /// Client transaction commit
    Commit,
    /// Client transaction abort
    Abort,
    /// Client graceful shutdown
    Disconnect,
    /// Server message delivery
    Message,
    /// Server receipt
    Receipt,
    /// Server error
    Error,
}

impl Command {
    /// Command name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line. `None` if not a STOMP command.
    pub fn parse(line: &str) -> Option<Self> {
        let command = match line {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => return None,
        };
        Some(command)
    }

    /// True for commands only a server sends.
    pub fn is_server_command(self) -> bool {
        matches!(self, Self::Connected | Self::Message | Self::Receipt | Self::Error)
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete STOMP frame.
///
/// Headers keep wire order (unescaped). The body is raw bytes; payload
/// decoding happens in the layer that knows what the destination carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command
    pub command: Command,
    /// Headers in wire order, unescaped
    pub headers: Vec<(String, String)>,
    /// Body bytes
    pub body: Bytes,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: Bytes::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text.
    pub fn body_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// `CONNECT` frame offering protocol versions 1.0 to 1.2.
    ///
    /// `extra` carries authentication headers (e.g. `Authorization`).
    #[must_use]
    pub fn connect(host: &str, heart_beat: &str, extra: &[(String, String)]) -> Self {
        let mut frame = Self::new(Command::Connect)
            .with_header(headers::ACCEPT_VERSION, "1.2,1.1,1.0")
            .with_header(headers::HOST, host)
            .with_header(headers::HEART_BEAT, heart_beat);
        frame.headers.extend(extra.iter().cloned());
        frame
    }

    /// `SUBSCRIBE` frame with automatic acknowledgement.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header(headers::ID, id)
            .with_header(headers::DESTINATION, destination)
            .with_header(headers::ACK, "auto")
    }

    /// `UNSUBSCRIBE` frame.
    #[must_use]
    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header(headers::ID, id)
    }

    /// `DISCONNECT` frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Encode into `dst`.
    ///
    /// A `content-length` header is added for non-empty bodies unless one is
    /// already present.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooLarge` if the body exceeds [`MAX_BODY_SIZE`]
    /// - `ProtocolError::UnencodableHeader` if a handshake frame carries a
    ///   header containing an EOL (or a `:` in the name), which cannot be
    ///   escaped there
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.body.len() > MAX_BODY_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: self.body.len(), max: MAX_BODY_SIZE });
        }

        let escape = self.command.escapes_headers();

        dst.put_slice(self.command.as_str().as_bytes());
        dst.put_u8(b'\n');

        for (name, value) in &self.headers {
            if !escape && (name.contains(':') || has_eol(name) || has_eol(value)) {
                return Err(ProtocolError::UnencodableHeader(format!("{name}:{value}")));
            }
            put_header_part(dst, name, escape);
            dst.put_u8(b':');
            put_header_part(dst, value, escape);
            dst.put_u8(b'\n');
        }

        if !self.body.is_empty() && self.header(headers::CONTENT_LENGTH).is_none() {
            dst.put_slice(headers::CONTENT_LENGTH.as_bytes());
            dst.put_u8(b':');
            dst.put_slice(self.body.len().to_string().as_bytes());
            dst.put_u8(b'\n');
        }

        dst.put_u8(b'\n');
        dst.put_slice(&self.body);
        dst.put_u8(0);

        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(64 + self.body.len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one frame from the start of `src`.
    ///
    /// Returns the frame and the number of bytes consumed (including the NUL
    /// terminator). Trailing EOLs after the NUL are left for the caller.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Truncated` if `src` ends mid-frame
    /// - `ProtocolError::UnknownCommand` for an unrecognized command line
    /// - `ProtocolError::MalformedHeader` / `InvalidEscape` for bad headers
    /// - `ProtocolError::InvalidContentLength`, `MissingNullTerminator` or
    ///   `FrameTooLarge` for bad bodies
    pub fn decode(src: &[u8]) -> Result<(Self, usize)> {
        let (line_end, mut pos) = find_eol(src, 0).ok_or(ProtocolError::Truncated)?;
        let command_line = utf8(&src[..line_end])?;
        let command = Command::parse(command_line)
            .ok_or_else(|| ProtocolError::UnknownCommand(command_line.to_string()))?;
        let escape = command.escapes_headers();

        let mut headers = Vec::new();
        loop {
            let (line_end, next) = find_eol(src, pos).ok_or(ProtocolError::Truncated)?;
            if line_end == pos {
                pos = next;
                break;
            }

            let line = utf8(&src[pos..line_end])?;
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;

            let header = if escape {
                (unescape(name)?, unescape(value)?)
            } else {
                (name.to_string(), value.to_string())
            };
            headers.push(header);
            pos = next;
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name == headers::CONTENT_LENGTH)
            .map(|(_, value)| value.as_str());

        let body_end = match content_length {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| ProtocolError::InvalidContentLength(raw.to_string()))?;
                if len > MAX_BODY_SIZE {
                    return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_BODY_SIZE });
                }
                let end = pos + len;
                match src.get(end) {
                    Some(0) => end,
                    Some(_) => return Err(ProtocolError::MissingNullTerminator),
                    None => return Err(ProtocolError::Truncated),
                }
            },
            None => {
                let offset = src[pos..]
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(ProtocolError::Truncated)?;
                if offset > MAX_BODY_SIZE {
                    return Err(ProtocolError::FrameTooLarge { size: offset, max: MAX_BODY_SIZE });
                }
                pos + offset
            },
        };

        let body = Bytes::copy_from_slice(&src[pos..body_end]);
        Ok((Self { command, headers, body }, body_end + 1))
    }
}

/// One unit read off the wire: a frame or a heart-beat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Bare EOL keep-alive
    Heartbeat,
    /// Complete frame
    Frame(Frame),
}

impl Packet {
    /// Decode every packet in a transport message.
    ///
    /// A WebSocket message normally carries a single frame or a single
    /// heart-beat, but brokers may batch several frames and pad with EOLs.
    /// Fails if any part of the message does not decode.
    pub fn decode_all(src: &[u8]) -> Result<Vec<Self>> {
        match Self::decode_prefix(src) {
            (packets, None) => Ok(packets),
            (_, Some(err)) => Err(err),
        }
    }

    /// Decode packets up to the first undecodable byte.
    ///
    /// Returns the packets that precede the failure together with the error,
    /// so one corrupt frame in a batch does not discard the frames before it.
    /// Everything after the failure is skipped.
    pub fn decode_prefix(src: &[u8]) -> (Vec<Self>, Option<ProtocolError>) {
        let mut packets = Vec::new();
        let mut pos = 0;

        while pos < src.len() {
            match src[pos] {
                b'\n' => {
                    packets.push(Self::Heartbeat);
                    pos += 1;
                },
                b'\r' if src.get(pos + 1) == Some(&b'\n') => {
                    packets.push(Self::Heartbeat);
                    pos += 2;
                },
                _ => match Frame::decode(&src[pos..]) {
                    Ok((frame, used)) => {
                        packets.push(Self::Frame(frame));
                        pos += used;
                    },
                    Err(err) => return (packets, Some(err)),
                },
            }
        }

        (packets, None)
    }
}

/// Heart-beat bytes as sent by the client.
pub const HEARTBEAT_BYTES: &[u8] = b"\n";

/// Locate the next EOL at or after `from`.
///
/// Returns `(line_end, next_line_start)`; `line_end` excludes a trailing `\r`.
fn find_eol(src: &[u8], from: usize) -> Option<(usize, usize)> {
    let offset = src.get(from..)?.iter().position(|&b| b == b'\n')?;
    let newline = from + offset;
    let line_end = if newline > from && src[newline - 1] == b'\r' { newline - 1 } else { newline };
    Some((line_end, newline + 1))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

fn has_eol(s: &str) -> bool {
    s.contains('\n') || s.contains('\r')
}

fn put_header_part(dst: &mut impl BufMut, part: &str, escape: bool) {
    if !escape {
        dst.put_slice(part.as_bytes());
        return;
    }

    for ch in part.chars() {
        match ch {
            '\\' => dst.put_slice(b"\\\\"),
            '\r' => dst.put_slice(b"\\r"),
            '\n' => dst.put_slice(b"\\n"),
            ':' => dst.put_slice(b"\\c"),
            other => {
                let mut buf = [0u8; 4];
                dst.put_slice(other.encode_utf8(&mut buf).as_bytes());
            },
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::InvalidEscape(raw.to_string())),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(src: &[u8]) -> Frame {
        let (frame, used) = Frame::decode(src).unwrap();
        assert_eq!(used, src.len());
        frame
    }

    #[test]
    fn encode_subscribe_frame() {
        let frame = Frame::subscribe("sub-0", "/user/42/queue/notification");
        let bytes = frame.to_bytes().unwrap();

        assert_eq!(
            &bytes[..],
            b"SUBSCRIBE\nid:sub-0\ndestination:/user/42/queue/notification\nack:auto\n\n\0"
        );
    }

    #[test]
    fn encode_adds_content_length_for_body() {
        let frame = Frame::new(Command::Send)
            .with_header(headers::DESTINATION, "/app/x")
            .with_body(&b"hello"[..]);
        let bytes = frame.to_bytes().unwrap();

        assert_eq!(&bytes[..], b"SEND\ndestination:/app/x\ncontent-length:5\n\nhello\0");
    }

    #[test]
    fn connect_headers_are_not_escaped() {
        let frame = Frame::connect("library.example", "4000,4000", &[(
            "Authorization".to_string(),
            "Bearer a:b".to_string(),
        )]);
        let bytes = frame.to_bytes().unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();

        assert!(text.starts_with("CONNECT\naccept-version:1.2,1.1,1.0\n"));
        assert!(text.contains("heart-beat:4000,4000\n"));
        assert!(text.contains("Authorization:Bearer a:b\n"));
    }

    #[test]
    fn connect_rejects_header_with_newline() {
        let frame = Frame::connect("host", "0,0", &[("x".to_string(), "a\nb".to_string())]);
        assert!(matches!(frame.to_bytes(), Err(ProtocolError::UnencodableHeader(_))));
    }

    #[test]
    fn message_headers_escape_special_characters() {
        let frame = Frame::new(Command::Message).with_header("k", "a:b\\c\nd");
        let bytes = frame.to_bytes().unwrap();
        assert_eq!(&bytes[..], b"MESSAGE\nk:a\\cb\\\\c\\nd\n\n\0");

        let decoded = decode_one(&bytes);
        assert_eq!(decoded.header("k"), Some("a:b\\c\nd"));
    }

    #[test]
    fn decode_message_without_content_length() {
        let raw = b"MESSAGE\ndestination:/user/42/queue/notification\nsubscription:sub-0\nmessage-id:m-1\n\n{\"status\":\"BORROWED\"}\0";
        let frame = decode_one(raw);

        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.header(headers::SUBSCRIPTION), Some("sub-0"));
        assert_eq!(frame.body_str().unwrap(), "{\"status\":\"BORROWED\"}");
    }

    #[test]
    fn decode_body_with_content_length_may_contain_nul() {
        let raw = b"MESSAGE\ncontent-length:3\n\na\0b\0";
        let frame = decode_one(raw);
        assert_eq!(&frame.body[..], b"a\0b");
    }

    #[test]
    fn decode_accepts_crlf_line_endings() {
        let raw = b"CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0";
        let frame = decode_one(raw);

        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header(headers::VERSION), Some("1.2"));
        assert_eq!(frame.header(headers::HEART_BEAT), Some("0,0"));
    }

    #[test]
    fn repeated_header_first_wins() {
        let frame = decode_one(b"MESSAGE\nfoo:first\nfoo:second\n\n\0");
        assert_eq!(frame.header("foo"), Some("first"));
        assert_eq!(frame.headers.len(), 2);
    }

    #[test]
    fn decode_rejects_unknown_command() {
        let result = Frame::decode(b"HELLO\n\n\0");
        assert_eq!(result, Err(ProtocolError::UnknownCommand("HELLO".to_string())));
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        assert_eq!(Frame::decode(b"MESSAGE\nfoo:bar\n"), Err(ProtocolError::Truncated));
        assert_eq!(Frame::decode(b"MESSAGE\n\nbody"), Err(ProtocolError::Truncated));
        assert_eq!(Frame::decode(b"MESSAGE"), Err(ProtocolError::Truncated));
    }

    #[test]
    fn decode_rejects_header_without_colon() {
        let result = Frame::decode(b"MESSAGE\nnocolon\n\n\0");
        assert!(matches!(result, Err(ProtocolError::MalformedHeader(_))));
    }

    #[test]
    fn decode_rejects_bad_escape() {
        let result = Frame::decode(b"MESSAGE\nk:bad\\t\n\n\0");
        assert!(matches!(result, Err(ProtocolError::InvalidEscape(_))));
    }

    #[test]
    fn decode_rejects_content_length_mismatch() {
        let result = Frame::decode(b"MESSAGE\ncontent-length:2\n\nabc\0");
        assert_eq!(result, Err(ProtocolError::MissingNullTerminator));

        let result = Frame::decode(b"MESSAGE\ncontent-length:x\n\nabc\0");
        assert!(matches!(result, Err(ProtocolError::InvalidContentLength(_))));
    }

    #[test]
    fn decode_rejects_oversized_body() {
        let raw = format!("MESSAGE\ncontent-length:{}\n\n", MAX_BODY_SIZE + 1);
        let result = Frame::decode(raw.as_bytes());
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn encode_rejects_oversized_body() {
        let frame = Frame::new(Command::Send).with_body(vec![b'a'; MAX_BODY_SIZE + 1]);
        assert!(matches!(frame.to_bytes(), Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn decode_all_splits_heartbeats_and_frames() {
        let raw = b"\nMESSAGE\n\na\0\r\nRECEIPT\nreceipt-id:r-1\n\n\0\n";
        let packets = Packet::decode_all(raw).unwrap();

        assert_eq!(packets.len(), 5);
        assert_eq!(packets[0], Packet::Heartbeat);
        assert!(matches!(&packets[1], Packet::Frame(f) if f.command == Command::Message));
        assert_eq!(packets[2], Packet::Heartbeat);
        assert!(matches!(&packets[3], Packet::Frame(f) if f.command == Command::Receipt));
        assert_eq!(packets[4], Packet::Heartbeat);
    }

    #[test]
    fn decode_prefix_keeps_frames_before_corruption() {
        let raw = b"MESSAGE\n\na\0\nBOGUS\n\nb\0MESSAGE\n\nc\0";

        let (packets, err) = Packet::decode_prefix(raw);

        assert_eq!(packets.len(), 2);
        assert!(matches!(&packets[0], Packet::Frame(f) if f.body.as_ref() == b"a"));
        assert_eq!(packets[1], Packet::Heartbeat);
        assert!(err.is_some());
        assert!(Packet::decode_all(raw).is_err());
    }

    #[test]
    fn decode_prefix_without_corruption_has_no_error() {
        let (packets, err) = Packet::decode_prefix(b"\nRECEIPT\nreceipt-id:r-1\n\n\0");
        assert_eq!(packets.len(), 2);
        assert!(err.is_none());
    }

    #[test]
    fn server_commands_are_classified() {
        assert!(Command::Message.is_server_command());
        assert!(Command::Connected.is_server_command());
        assert!(!Command::Subscribe.is_server_command());
        assert!(!Command::Disconnect.is_server_command());
    }
}
