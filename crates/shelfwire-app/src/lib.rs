//! Application layer for the Shelfwire notification channel.
//!
//! Pure state machines and a generic runtime, so the same orchestration code
//! runs in production and in deterministic simulation.
//!
//! # Components
//!
//! - [`NotificationStore`]: newest-first notification list with unread count
//! - [`presentation`]: status labels, colors, toasts and badge text
//! - [`App`]: view model consumed by the UI (store, connection flag, commands)
//! - [`Observers`]: `on_connect` / `on_disconnect` listener registry
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: generic orchestration loop tying session, app and driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod observer;
pub mod presentation;
mod runtime;
mod store;

pub use action::AppAction;
pub use app::App;
pub use driver::{Driver, DriverEvent};
pub use event::AppEvent;
pub use observer::{ListenerId, Observers};
pub use presentation::{StatusBadge, Toast, ToastAction};
pub use runtime::Runtime;
pub use store::{Notification, NotificationId, NotificationStore};
