//! Per-user subscription and inbound message routing.
//!
//! A connected session holds exactly one [`Subscription`]. Every inbound
//! `MESSAGE` goes through [`Subscription::route`], which decides whether the
//! frame belongs to it and decodes the body into a [`NotificationEvent`].
//! Routing never fails the session: bad bodies come back as
//! [`RouteOutcome::Malformed`] for the caller to log and drop.

use shelfwire_proto::{Command, Frame, NotificationEvent, headers};

use crate::{error::RouteError, identity::UserId};

/// Outcome of routing one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Decoded notification for this subscription
    Delivered(NotificationEvent),
    /// Frame is not addressed to this subscription
    Ignored(String),
    /// Frame is addressed here but the body is unusable
    Malformed(RouteError),
}

/// The live mapping from a user to their notification queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: String,
    destination: String,
    user_id: UserId,
}

impl Subscription {
    /// Subscription number `seq` for `user_id`.
    pub fn new(seq: u64, user_id: UserId) -> Self {
        Self { id: format!("sub-{seq}"), destination: Self::destination_for(&user_id), user_id }
    }

    /// Queue a user's notifications are published to.
    pub fn destination_for(user_id: &UserId) -> String {
        format!("/user/{user_id}/queue/notification")
    }

    /// STOMP subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribed destination.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Owner of this subscription.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// `SUBSCRIBE` frame that creates this subscription on the server.
    pub fn subscribe_frame(&self) -> Frame {
        Frame::subscribe(&self.id, &self.destination)
    }

    /// `UNSUBSCRIBE` frame that removes it.
    pub fn unsubscribe_frame(&self) -> Frame {
        Frame::unsubscribe(&self.id)
    }

    /// Route one inbound frame.
    ///
    /// The `subscription` header decides ownership. Servers that omit it are
    /// matched on `destination` instead.
    pub fn route(&self, frame: &Frame) -> RouteOutcome {
        if frame.command != Command::Message {
            return RouteOutcome::Ignored(format!("{} is not a message", frame.command));
        }

        match (frame.header(headers::SUBSCRIPTION), frame.header(headers::DESTINATION)) {
            (Some(id), _) if id != self.id => {
                return RouteOutcome::Ignored(format!("unknown subscription {id}"));
            },
            (None, Some(destination)) if destination != self.destination => {
                return RouteOutcome::Ignored(format!("unknown destination {destination}"));
            },
            (None, None) => {
                return RouteOutcome::Ignored("message without subscription".to_string());
            },
            _ => {},
        }

        if let Some(content_type) = frame.header(headers::CONTENT_TYPE)
            && !is_json(content_type)
        {
            return RouteOutcome::Malformed(RouteError::ContentType(content_type.to_string()));
        }

        match NotificationEvent::from_json(&frame.body) {
            Ok(event) => RouteOutcome::Delivered(event),
            Err(err) => RouteOutcome::Malformed(err.into()),
        }
    }
}

fn is_json(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.eq_ignore_ascii_case("text/plain")
}
