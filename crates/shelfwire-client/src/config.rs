//! Client configuration.
//!
//! [`ClientOptions`] holds what the CLI collects and turns it into a
//! [`SessionConfig`]. The endpoint is validated with `url`; an `http(s)`
//! SockJS base URL is accepted and rewritten to its raw WebSocket leg.

use std::{path::PathBuf, time::Duration};

use shelfwire_core::{ReconnectPolicy, SessionConfig};
use shelfwire_proto::HeartBeat;
use thiserror::Error;
use url::Url;

/// Path suffix of the raw WebSocket transport of a SockJS endpoint.
const SOCKJS_WEBSOCKET_SUFFIX: &str = "/websocket";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Endpoint could not be parsed.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as given
        endpoint: String,
        /// Parser message
        reason: String,
    },

    /// Endpoint scheme is not ws, wss, http or https.
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// Endpoint has no host to put in the STOMP `host` header.
    #[error("endpoint has no host: {0}")]
    MissingHost(String),

    /// Reconnect settings out of range.
    #[error("invalid reconnect policy: {0}")]
    InvalidReconnect(String),

    /// Identity file could not be read or parsed.
    #[error("identity file {path}: {reason}")]
    Identity {
        /// File path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

/// Options collected by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// WebSocket endpoint (or SockJS base URL)
    pub endpoint: String,
    /// Bearer token for the `CONNECT` frame
    pub auth_token: Option<String>,
    /// Heart-beat interval, both directions. Zero disables heart-beats.
    pub heartbeat: Duration,
    /// Delay before the first reconnect attempt
    pub reconnect_base: Duration,
    /// Reconnect attempts per outage
    pub max_reconnect_attempts: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            endpoint: defaults.endpoint,
            auth_token: None,
            heartbeat: Duration::from_millis(u64::from(defaults.heartbeat.outgoing)),
            reconnect_base: defaults.reconnect.base_delay,
            max_reconnect_attempts: defaults.reconnect.max_attempts,
        }
    }
}

impl ClientOptions {
    /// Build the session configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the endpoint is unusable or the reconnect
    /// base delay is zero.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let url = websocket_url(&self.endpoint)?;
        let host = url
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingHost(self.endpoint.clone()))?;

        if self.reconnect_base.is_zero() {
            return Err(ConfigError::InvalidReconnect("base delay must be positive".to_string()));
        }

        let connect_headers = self
            .auth_token
            .iter()
            .map(|token| ("Authorization".to_string(), format!("Bearer {token}")))
            .collect();

        Ok(SessionConfig {
            endpoint: url.to_string(),
            host,
            heartbeat: HeartBeat::symmetric(self.heartbeat),
            reconnect: ReconnectPolicy {
                base_delay: self.reconnect_base,
                max_attempts: self.max_reconnect_attempts,
            },
            connect_headers,
            ..SessionConfig::default()
        })
    }
}

/// Normalize `endpoint` to a `ws://` or `wss://` URL.
///
/// # Errors
///
/// Returns [`ConfigError`] if the endpoint does not parse or uses another
/// scheme.
pub fn websocket_url(endpoint: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    let ws_scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url),
        "http" => "ws",
        "https" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };

    url.set_scheme(ws_scheme)
        .map_err(|()| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;

    if !url.path().ends_with(SOCKJS_WEBSOCKET_SUFFIX) {
        let path = format!("{}{SOCKJS_WEBSOCKET_SUFFIX}", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }

    Ok(url)
}
