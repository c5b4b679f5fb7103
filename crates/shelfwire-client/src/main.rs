//! Shelfwire notification client.
//!
//! Connects to the loan notification channel for the logged-in user and
//! logs every notification as it arrives. Line commands on stdin mark
//! notifications read (`read 3`, `read-all`), clear the list or re-read the
//! identity file after a login (`login`).
//!
//! # Usage
//!
//! ```bash
//! # Fixed user against a local backend
//! shelfwire-notify --user-id 42
//!
//! # User record written by the login flow, SockJS base URL
//! shelfwire-notify --user-file ~/.shelfwire/user.json --endpoint https://library.example/ws
//! ```

use std::time::Duration;

use clap::Parser;
use shelfwire_app::Runtime;
use shelfwire_client::{ClientOptions, JsonFileIdentity, LiveDriver};
use shelfwire_core::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_BASE_DELAY,
    StaticIdentity, UserId,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Shelfwire loan notification client
#[derive(Parser, Debug)]
#[command(name = "shelfwire-notify")]
#[command(about = "Real-time loan notifications for the Shelfwire library")]
#[command(version)]
struct Args {
    /// WebSocket endpoint, or the SockJS base URL of the backend
    #[arg(short, long, default_value = shelfwire_core::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Logged-in user id
    #[arg(short, long, conflicts_with = "user_file")]
    user_id: Option<String>,

    /// JSON user record (`{"id": 42, ...}`); re-read on `login`
    #[arg(long)]
    user_file: Option<String>,

    /// Bearer token sent with CONNECT
    #[arg(long)]
    auth_token: Option<String>,

    /// Heart-beat interval in milliseconds (0 disables)
    #[arg(long, default_value_t = millis(DEFAULT_HEARTBEAT_INTERVAL))]
    heartbeat_ms: u64,

    /// Delay before the first reconnect attempt, in milliseconds
    #[arg(long, default_value_t = millis(DEFAULT_RECONNECT_BASE_DELAY))]
    reconnect_base_ms: u64,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    max_reconnect_attempts: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let options = ClientOptions {
        endpoint: args.endpoint,
        auth_token: args.auth_token,
        heartbeat: Duration::from_millis(args.heartbeat_ms),
        reconnect_base: Duration::from_millis(args.reconnect_base_ms),
        max_reconnect_attempts: args.max_reconnect_attempts,
    };
    let config = options.session_config()?;

    tracing::info!("Shelfwire notification client starting");
    tracing::info!("Endpoint {}", config.endpoint);

    let mut driver = LiveDriver::new();
    driver.spawn_stdin_commands();

    let mut runtime = match args.user_file {
        Some(path) => {
            let identity = JsonFileIdentity::new(path);
            // Fail fast on a corrupt file; a missing one just means logged out.
            identity.load()?;
            Runtime::new(driver, config, identity)
        },
        None => {
            let user = args.user_id.and_then(UserId::new);
            Runtime::new(driver, config, StaticIdentity::new(user))
        },
    };

    runtime.on_connect(|status| {
        tracing::info!(user = ?status.user_id, "notification channel connected");
    });
    runtime.on_disconnect(|status| {
        tracing::warn!(attempts = status.reconnect_attempts, "notification channel lost");
    });

    runtime.run().await?;

    tracing::info!("Shelfwire notification client stopped");
    Ok(())
}
