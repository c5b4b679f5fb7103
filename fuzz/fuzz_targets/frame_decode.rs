//! Fuzz target for STOMP frame decoding
//!
//! This fuzzer tests frame decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in content-length handling
//! - Header escapes that do not survive re-encoding
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use shelfwire_proto::{Frame, NotificationEvent, Packet};

fuzz_target!(|data: &[u8]| {
    let _ = Frame::decode(data);
    let _ = NotificationEvent::from_json(data);

    let Ok(packets) = Packet::decode_all(data) else {
        return;
    };

    for packet in packets {
        if let Packet::Frame(frame) = packet {
            // Anything we accept must survive re-encoding. The encoder may
            // append a content-length header.
            let Ok(bytes) = frame.to_bytes() else {
                continue;
            };
            let (decoded, _) = Frame::decode(&bytes).expect("re-encoded frame must decode");
            assert_eq!(decoded.command, frame.command);
            assert_eq!(decoded.body, frame.body);
            assert!(decoded.headers.starts_with(&frame.headers));
        }
    }
});
