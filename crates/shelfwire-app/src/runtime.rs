//! Generic runtime for application orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`Session`]: connection state machine
//! - [`App`]: view model and notification store
//! - [`Driver`]: platform-specific I/O
//!
//! Everything runs on one logical loop. Driver events are handled one at a
//! time and the actions they produce are executed in order before the next
//! event is polled, so the store never sees concurrent mutation.

use std::collections::VecDeque;

use bytes::Bytes;
use shelfwire_core::{
    ConnectionState, ConnectionStatus, IdentityProvider, RetryToken, Session, SessionAction,
    SessionConfig, SessionError, UserId,
};
use shelfwire_proto::{Packet, frame::HEARTBEAT_BYTES};
use tokio::sync::watch;

use crate::{App, AppAction, AppEvent, Driver, DriverEvent, ListenerId, Observers};

enum Work {
    Session(SessionAction),
    App(AppAction),
}

/// Generic runtime that orchestrates Session, App and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
pub struct Runtime<D>
where
    D: Driver,
{
    driver: D,
    session: Session<D::Instant>,
    app: App,
    identity: Box<dyn IdentityProvider + Send>,
    retry: Option<(RetryToken, D::Instant)>,
    observers: Observers,
    state_tx: watch::Sender<ConnectionState>,
}

impl<D> Runtime<D>
where
    D: Driver,
{
    /// Create a runtime. Nothing happens until [`Runtime::start`].
    pub fn new(
        driver: D,
        config: SessionConfig,
        identity: impl IdentityProvider + Send + 'static,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            driver,
            session: Session::new(config),
            app: App::new(),
            identity: Box::new(identity),
            retry: None,
            observers: Observers::new(),
            state_tx,
        }
    }

    /// Render, read the identity provider and connect if someone is logged
    /// in.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to render.
    pub async fn start(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        self.refresh_identity().await
    }

    /// Run until the driver reports [`DriverEvent::Shutdown`], then
    /// disconnect and stop the driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.start().await?;

        while self.step().await? {}

        self.disconnect().await?;
        self.driver.stop().await;
        Ok(())
    }

    /// Process one driver event (if any) and run due timers.
    ///
    /// Returns `false` once the driver asked to shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        let keep_running = match self.driver.poll_event().await? {
            Some(event) => self.handle_driver_event(event).await?,
            None => true,
        };

        self.run_timers().await?;
        Ok(keep_running)
    }

    /// Re-read the identity provider.
    ///
    /// Login connects, logout disconnects, and a different user clears the
    /// store and restarts the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn refresh_identity(&mut self) -> Result<(), D::Error> {
        let user = self.identity.current_user();
        if user.is_none() {
            tracing::info!("no logged-in user, notification channel idle");
        }
        self.handle_app_event(AppEvent::UserChanged(user)).await
    }

    /// Connect as `user_id`.
    ///
    /// Same user: asks the session for a fresh connection (a no-op if one is
    /// already up). Different user: behaves like a login switch.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn connect(&mut self, user_id: UserId) -> Result<(), D::Error> {
        let event = if self.app.user() == Some(&user_id) {
            AppEvent::Reconnect
        } else {
            AppEvent::UserChanged(Some(user_id))
        };
        self.handle_app_event(event).await
    }

    /// Tear down the session and cancel any pending retry. The store and the
    /// logged-in user are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn disconnect(&mut self) -> Result<(), D::Error> {
        let actions = self.session.disconnect(self.driver.now());
        self.execute(actions.into_iter().map(Work::Session)).await
    }

    /// Feed a UI event into the app.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn handle_app_event(&mut self, event: AppEvent) -> Result<(), D::Error> {
        let actions = self.app.handle(event);
        self.execute(actions.into_iter().map(Work::App)).await
    }

    /// Run `listener` every time the channel connects.
    pub fn on_connect(
        &mut self,
        listener: impl FnMut(&ConnectionStatus) + Send + 'static,
    ) -> ListenerId {
        self.observers.on_connect(listener)
    }

    /// Run `listener` every time the channel drops.
    pub fn on_disconnect(
        &mut self,
        listener: impl FnMut(&ConnectionStatus) + Send + 'static,
    ) -> ListenerId {
        self.observers.on_disconnect(listener)
    }

    /// Remove a listener.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.observers.unregister(id)
    }

    /// Watch channel of connection state, for pull-style consumers.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Whether the channel is connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Diagnostic snapshot of the session.
    pub fn status(&self) -> ConnectionStatus {
        self.session.status()
    }

    /// The view model.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// The session state machine.
    pub fn session(&self) -> &Session<D::Instant> {
        &self.session
    }

    /// Deadline of the pending retry, if any.
    pub fn retry_deadline(&self) -> Option<D::Instant> {
        self.retry.map(|(_, deadline)| deadline)
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    async fn handle_driver_event(&mut self, event: DriverEvent) -> Result<bool, D::Error> {
        let now = self.driver.now();

        match event {
            DriverEvent::TransportOpened { generation } => {
                let result = self.session.transport_opened(generation, now);
                self.execute_session_result(result).await?;
            },
            DriverEvent::Received { generation, data } => {
                let (packets, err) = Packet::decode_prefix(&data);
                if let Some(err) = err {
                    tracing::warn!(
                        error = %err,
                        len = data.len(),
                        decoded = packets.len(),
                        "skipping undecodable rest of transport message"
                    );
                }
                for packet in packets {
                    let result = self.session.handle_packet(generation, packet, now);
                    self.execute_session_result(result).await?;
                }
            },
            DriverEvent::TransportClosed { generation, reason } => {
                let actions = self.session.connection_lost(generation, &reason, now);
                self.execute(actions.into_iter().map(Work::Session)).await?;
            },
            DriverEvent::App(event) => self.handle_app_event(event).await?,
            DriverEvent::IdentityChanged => self.refresh_identity().await?,
            DriverEvent::Shutdown => return Ok(false),
        }

        Ok(true)
    }

    async fn run_timers(&mut self) -> Result<(), D::Error> {
        let now = self.driver.now();

        if let Some((token, deadline)) = self.retry
            && now >= deadline
        {
            self.retry = None;
            let actions = self.session.retry_due(token, now);
            self.execute(actions.into_iter().map(Work::Session)).await?;
        }

        let actions = self.session.tick(now);
        self.execute(actions.into_iter().map(Work::Session)).await
    }

    async fn execute_session_result(
        &mut self,
        result: Result<Vec<SessionAction>, SessionError>,
    ) -> Result<(), D::Error> {
        match result {
            Ok(actions) => self.execute(actions.into_iter().map(Work::Session)).await,
            Err(err) => {
                tracing::warn!(error = %err, "session rejected input");
                Ok(())
            },
        }
    }

    async fn execute(&mut self, initial: impl IntoIterator<Item = Work>) -> Result<(), D::Error> {
        let mut queue: VecDeque<Work> = initial.into_iter().collect();

        while let Some(work) = queue.pop_front() {
            match work {
                Work::Session(action) => self.execute_session_action(action, &mut queue).await?,
                Work::App(action) => self.execute_app_action(action, &mut queue)?,
            }
        }

        Ok(())
    }

    async fn execute_session_action(
        &mut self,
        action: SessionAction,
        queue: &mut VecDeque<Work>,
    ) -> Result<(), D::Error> {
        let now = self.driver.now();

        match action {
            SessionAction::OpenTransport { endpoint, generation } => {
                tracing::debug!(%endpoint, generation, "opening transport");
                if let Err(err) = self.driver.open_transport(&endpoint, generation) {
                    let reason = err.to_string();
                    let actions = self.session.connection_lost(generation, &reason, now);
                    queue.extend(actions.into_iter().map(Work::Session));
                }
            },
            SessionAction::SendFrame(frame) => match frame.to_bytes() {
                Ok(bytes) => self.send(bytes).await,
                Err(err) => tracing::error!(error = %err, command = %frame.command, "cannot encode frame"),
            },
            SessionAction::SendHeartbeat => self.send(Bytes::from_static(HEARTBEAT_BYTES)).await,
            SessionAction::CloseTransport => self.driver.close_transport(),
            SessionAction::ScheduleRetry { token, delay, attempt } => {
                tracing::debug!(%token, attempt, ?delay, "retry scheduled");
                self.retry = Some((token, now + delay));
            },
            SessionAction::CancelRetry { token } => {
                if self.retry.is_some_and(|(pending, _)| pending == token) {
                    self.retry = None;
                }
            },
            SessionAction::Deliver(event) => {
                let received_at_ms = self.driver.wall_clock_millis();
                let actions = self.app.handle(AppEvent::NotificationReceived { event, received_at_ms });
                queue.extend(actions.into_iter().map(Work::App));
            },
            SessionAction::Transition { from, to } => {
                self.state_tx.send_replace(to);

                let status = self.session.status();
                tracing::debug!(?status, "connection status");
                self.observers.notify(from, to, &status);

                let actions = self.app.handle(AppEvent::ConnectionChanged(to));
                queue.extend(actions.into_iter().map(Work::App));
            },
        }

        Ok(())
    }

    fn execute_app_action(
        &mut self,
        action: AppAction,
        queue: &mut VecDeque<Work>,
    ) -> Result<(), D::Error> {
        let now = self.driver.now();

        match action {
            AppAction::Render => self.driver.render(&self.app)?,
            AppAction::ShowToast(toast) => {
                if let Err(err) = self.driver.show_toast(&toast) {
                    tracing::warn!(error = %err, title = toast.title, "failed to show toast");
                }
            },
            AppAction::Connect { user_id } => {
                let actions = self.session.connect(user_id, now);
                queue.extend(actions.into_iter().map(Work::Session));
            },
            AppAction::Disconnect => {
                let actions = self.session.disconnect(now);
                queue.extend(actions.into_iter().map(Work::Session));
            },
        }

        Ok(())
    }

    async fn send(&mut self, data: Bytes) {
        if let Err(err) = self.driver.send(data).await {
            tracing::warn!(error = %err, "transport send failed");
        }
    }
}
