//! Production driver for the Shelfwire notification channel.
//!
//! Runs the generic [`shelfwire_app::Runtime`] on tokio with a real
//! WebSocket transport:
//!
//! - [`transport`]: one tokio task per WebSocket connection, bridged to the
//!   runtime through channels
//! - [`LiveDriver`]: [`shelfwire_app::Driver`] implementation
//! - [`SystemEnv`]: real clock
//! - [`identity`]: where the logged-in user comes from
//! - [`input`]: stdin line commands
//! - [`config`]: endpoint and session settings

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod driver;
pub mod identity;
pub mod input;
pub mod system_env;
pub mod transport;

pub use config::{ClientOptions, ConfigError};
pub use driver::{DriverError, LiveDriver};
pub use identity::JsonFileIdentity;
pub use system_env::SystemEnv;
pub use transport::{TransportError, TransportHandle};
