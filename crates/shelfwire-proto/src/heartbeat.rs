//! `heart-beat` header and negotiation.
//!
//! Each side advertises `cx,cy`: it can send a beat every `cx` ms and wants
//! to receive one every `cy` ms. Zero disables that direction.

use std::time::Duration;

use crate::errors::{ProtocolError, Result};

/// One side's heart-beat offer, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HeartBeat {
    /// Smallest interval at which this side can send beats (0 = never)
    pub outgoing: u32,
    /// Desired interval for receiving beats (0 = never)
    pub incoming: u32,
}

impl HeartBeat {
    /// No heart-beating in either direction.
    pub const DISABLED: Self = Self { outgoing: 0, incoming: 0 };

    /// Offer the same interval in both directions.
    pub fn symmetric(interval: Duration) -> Self {
        let ms = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        Self { outgoing: ms, incoming: ms }
    }

    /// Parse a `heart-beat` header value.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ProtocolError::InvalidHeartBeat(value.to_string());
        let (cx, cy) = value.split_once(',').ok_or_else(invalid)?;
        let outgoing = cx.trim().parse().map_err(|_| invalid())?;
        let incoming = cy.trim().parse().map_err(|_| invalid())?;
        Ok(Self { outgoing, incoming })
    }

    /// Render as a header value.
    pub fn to_header_value(self) -> String {
        format!("{},{}", self.outgoing, self.incoming)
    }

    /// Combine the client's offer with the server's `CONNECTED` reply.
    pub fn negotiate(client: Self, server: Self) -> NegotiatedHeartBeat {
        NegotiatedHeartBeat {
            send_every: agreed(client.outgoing, server.incoming),
            expect_every: agreed(client.incoming, server.outgoing),
        }
    }
}

/// Heart-beat intervals agreed for one session, from the client's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiatedHeartBeat {
    /// How often the client must send something
    pub send_every: Option<Duration>,
    /// How often the server promised to send something
    pub expect_every: Option<Duration>,
}

fn agreed(ours: u32, theirs: u32) -> Option<Duration> {
    if ours == 0 || theirs == 0 {
        return None;
    }
    Some(Duration::from_millis(u64::from(ours.max(theirs))))
}
