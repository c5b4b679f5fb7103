//! Scenario world.
//!
//! [`SimWorld`] owns a production [`Runtime`] over a [`SimDriver`], plus the
//! scripted broker. Each step injects what the network would do and runs the
//! runtime until the event queue drains, checking the standard invariants
//! after every event.

use std::time::Duration;

use shelfwire_app::Runtime;
use shelfwire_core::{ConnectionState, SessionConfig, StaticIdentity, Subscription, UserId};
use shelfwire_proto::{Frame, NotificationEvent};

use crate::{InvariantRegistry, SimDriver, SimDriverError, SimHandle, SimServer, SystemSnapshot};

/// Runtime, driver handle, broker and invariants in one place.
pub struct SimWorld {
    runtime: Runtime<SimDriver>,
    handle: SimHandle,
    server: SimServer,
    invariants: InvariantRegistry,
}

impl SimWorld {
    /// World whose identity provider reports `user` (`None` = logged out).
    pub fn new(user: Option<&str>) -> Self {
        Self::with_config(user, SessionConfig::default())
    }

    /// World with a custom session configuration.
    pub fn with_config(user: Option<&str>, config: SessionConfig) -> Self {
        let driver = SimDriver::new().with_invariants(InvariantRegistry::standard());
        let handle = driver.handle();
        let identity = StaticIdentity::new(user.and_then(UserId::new));

        Self {
            runtime: Runtime::new(driver, config, identity),
            handle,
            server: SimServer::new(),
            invariants: InvariantRegistry::standard(),
        }
    }

    /// The runtime.
    pub fn runtime(&self) -> &Runtime<SimDriver> {
        &self.runtime
    }

    /// The runtime, mutably.
    pub fn runtime_mut(&mut self) -> &mut Runtime<SimDriver> {
        &mut self.runtime
    }

    /// The driver handle.
    pub fn handle(&self) -> &SimHandle {
        &self.handle
    }

    /// The broker.
    pub fn server(&mut self) -> &mut SimServer {
        &mut self.server
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.runtime.session().state()
    }

    /// Active subscription.
    pub fn subscription(&self) -> Option<Subscription> {
        self.runtime.session().subscription().cloned()
    }

    /// Start the runtime (render, read identity, connect).
    pub async fn start(&mut self) -> Result<(), SimDriverError> {
        self.runtime.start().await?;
        self.check("after start");
        Ok(())
    }

    /// Run until no events are pending. Returns `false` if the runtime was
    /// asked to shut down.
    pub async fn settle(&mut self) -> Result<bool, SimDriverError> {
        while self.handle.has_pending() {
            let keep_running = self.runtime.step().await?;
            self.check("after step");
            if !keep_running {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Advance the virtual clock and run due timers.
    pub async fn advance(&mut self, by: Duration) -> Result<(), SimDriverError> {
        self.handle.env().advance(by);
        self.runtime.step().await?;
        self.check("after advance");
        self.settle().await.map(|_| ())
    }

    /// Open the pending transport and complete the STOMP handshake.
    pub async fn establish(&mut self) -> Result<(), SimDriverError> {
        self.handle.transport_opened();
        self.settle().await?;
        let connected = self.server.connected();
        self.deliver(&connected).await
    }

    /// Start and establish.
    pub async fn start_connected(&mut self) -> Result<(), SimDriverError> {
        self.start().await?;
        self.establish().await
    }

    /// Deliver a broker frame.
    pub async fn deliver(&mut self, frame: &Frame) -> Result<(), SimDriverError> {
        self.handle.deliver(frame);
        self.settle().await.map(|_| ())
    }

    /// Push a notification through the active subscription.
    ///
    /// Does nothing without a subscription, like a broker with no
    /// subscriber.
    pub async fn notify(&mut self, event: &NotificationEvent) -> Result<(), SimDriverError> {
        let Some(subscription) = self.subscription() else {
            return Ok(());
        };
        let frame = self.server.notification(&subscription, event);
        self.deliver(&frame).await
    }

    /// Fail the current connection attempt (or drop the live connection).
    pub async fn drop_transport(&mut self, reason: &str) -> Result<(), SimDriverError> {
        self.handle.transport_closed(reason);
        self.settle().await.map(|_| ())
    }

    /// Snapshot of runtime state.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::from_runtime(&self.runtime)
    }

    fn check(&self, context: &str) {
        self.invariants.assert_all(&self.snapshot(), context);
    }
}
