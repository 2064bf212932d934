//! Chat session.
//!
//! [`Session`] composes the core state machines into one client: identity,
//! connection lifecycle, heartbeat, outbound queue, typing debounce and the
//! presence projection. It owns the live transport and executes every effect
//! the components ask for.
//!
//! # Event flow
//!
//! ```text
//! driver ──SessionEvent──> Session ──ClientMessage──> Transport
//!    ^                        │
//!    └─────SessionAction──────┘
//! ```
//!
//! Transport failures never escape: they become connection state, queued
//! messages, or notices. Rejected user input is logged at `debug` and
//! otherwise ignored.

use std::time::Duration;

use chatline_core::{
    ClientIdentity, Connection, ConnectionAction, ConnectionState, DrainOutcome, Environment,
    Heartbeat, HeartbeatAction, Notice, Outbox, Presence, SessionError, Transport,
    Timer, TransportError, TypingNotifier, TypingSignal, is_own,
};
use chatline_proto::{ClientMessage, Message, ServerEvent, User};

use crate::{SessionAction, SessionConfig, SessionEvent};

/// Wait before re-draining the outbox after a send failed on a live transport.
pub const DRAIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Client session state machine.
///
/// Pure apart from the transport it is handed: time arrives with each event
/// and randomness comes from the environment.
pub struct Session<T, E: Environment> {
    env: E,
    config: SessionConfig,
    identity: ClientIdentity,
    connection: Connection<E::Instant>,
    heartbeat: Heartbeat<E::Instant>,
    outbox: Outbox<E::Instant>,
    typing: TypingNotifier<E::Instant>,
    /// A typing stop the server never received
    typing_stop_owed: bool,
    drain_retry: Timer<E::Instant>,
    presence: Presence,
    transport: Option<T>,
    composer: String,
    /// Most recent connection failure, cleared on connect
    last_error: Option<SessionError>,
}

impl<T, E> Session<T, E>
where
    T: Transport,
    E: Environment,
{
    /// Create a session with a freshly generated identity.
    pub fn new(env: E, config: SessionConfig) -> Self {
        let identity = ClientIdentity::generate(&env);
        Self::with_identity(env, config, identity)
    }

    /// Create a session for an existing identity.
    pub fn with_identity(env: E, config: SessionConfig, identity: ClientIdentity) -> Self {
        Self {
            connection: Connection::new(config.policy.clone()),
            heartbeat: Heartbeat::new(config.heartbeat_interval),
            outbox: Outbox::new(config.notice_threshold),
            typing: TypingNotifier::new(config.typing_debounce),
            typing_stop_owed: false,
            drain_retry: Timer::new(),
            presence: Presence::new(config.message_cap),
            env,
            config,
            identity,
            transport: None,
            composer: String::new(),
            last_error: None,
        }
    }

    /// Process one event.
    pub fn handle(&mut self, event: SessionEvent<T, E::Instant>) -> Vec<SessionAction> {
        match event {
            SessionEvent::Start { now } => self.start(now),
            SessionEvent::TransportOpened { attempt, transport, now } => {
                self.transport_opened(attempt, transport, now)
            },
            SessionEvent::TransportFailed { attempt, reason, now } => {
                self.transport_failed(attempt, &reason, now)
            },
            SessionEvent::TransportClosed { reason, now } => self.transport_closed(&reason, now),
            SessionEvent::Received(event) => self.receive(event),
            SessionEvent::Tick { now } => self.tick(now),
            SessionEvent::SetUsername { name, now } => {
                self.set_username(&name, now).unwrap_or_else(|error| {
                    tracing::debug!(%error, "username rejected");
                    Vec::new()
                })
            },
            SessionEvent::InputChanged { text, now } => self.input_changed(text, now),
            SessionEvent::SendMessage { text, now } => {
                self.send_message(&text, now).unwrap_or_else(|error| {
                    tracing::debug!(%error, "message rejected");
                    Vec::new()
                })
            },
            SessionEvent::SetFollowing(following) => {
                self.presence.set_following(following);
                vec![SessionAction::Render]
            },
            SessionEvent::Shutdown { now } => self.shutdown(now),
        }
    }

    /// Begin the first connection attempt. No-op once started.
    pub fn start(&mut self, now: E::Instant) -> Vec<SessionAction> {
        match self.connection.start(now) {
            Ok(actions) => {
                tracing::info!(user_id = self.identity.user_id(), "session started");
                rendered(self.apply(actions, now))
            },
            Err(error) => {
                tracing::debug!(%error, "session already started");
                Vec::new()
            },
        }
    }

    /// A requested transport is up.
    ///
    /// Transports for stale attempts are closed and dropped.
    pub fn transport_opened(
        &mut self,
        attempt: u64,
        mut transport: T,
        now: E::Instant,
    ) -> Vec<SessionAction> {
        match self.connection.handle_connected(attempt, now) {
            Ok(actions) => {
                if let Some(mut previous) = self.transport.replace(transport) {
                    previous.close();
                }
                rendered(self.apply(actions, now))
            },
            Err(error) => {
                tracing::debug!(%error, "discarding transport");
                transport.close();
                Vec::new()
            },
        }
    }

    /// A requested transport failed to open.
    pub fn transport_failed(
        &mut self,
        attempt: u64,
        reason: &str,
        now: E::Instant,
    ) -> Vec<SessionAction> {
        match self.connection.handle_connect_error(attempt, reason, &self.env, now) {
            Ok(actions) => {
                self.last_error = Some(TransportError::Handshake(reason.to_string()).into());
                rendered(self.apply(actions, now))
            },
            Err(error) => {
                tracing::debug!(%error, "ignoring connect failure");
                Vec::new()
            },
        }
    }

    /// The live transport closed.
    pub fn transport_closed(&mut self, reason: &str, now: E::Instant) -> Vec<SessionAction> {
        if self.transport.is_none() {
            tracing::debug!(reason, "close without a live transport");
            return Vec::new();
        }

        let actions = self.connection.handle_disconnected(reason, &self.env, now);
        rendered(self.apply(actions, now))
    }

    /// Fold a server event into the view.
    pub fn receive(&mut self, event: ServerEvent) -> Vec<SessionAction> {
        tracing::trace!(event = event.name(), "received");
        self.presence.apply(event);
        vec![SessionAction::Render]
    }

    /// Drive timers: reconnects, restarts, heartbeat, typing debounce.
    pub fn tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.tick(&self.env, now);
        let mut changed = !actions.is_empty();
        let mut out = self.apply(actions, now);

        if self.connection.is_connected() {
            let alive = self.transport_alive();
            match self.heartbeat.tick(now, alive) {
                Some(HeartbeatAction::Ping) => {
                    let ping = ClientMessage::ping(self.identity.user_id());
                    if let Err(error) = emit(&mut self.transport, &ping) {
                        tracing::warn!(%error, "heartbeat failed");
                        out.extend(self.check_liveness(now));
                    }
                },
                Some(HeartbeatAction::Stale) => {
                    let actions = self.connection.handle_disconnected(
                        "heartbeat: transport not connected",
                        &self.env,
                        now,
                    );
                    changed = true;
                    out.extend(self.apply(actions, now));
                },
                None => {},
            }
        }

        if self.drain_retry.fire(now) {
            out.extend(self.flush_outbox(now));
        }

        if let Some(signal) = self.typing.tick(now) {
            out.extend(self.emit_typing(signal, now));
        }

        if changed || !out.is_empty() { rendered(out) } else { out }
    }

    /// Set the display name and announce it if connected.
    ///
    /// While disconnected the name is announced on the next connection.
    ///
    /// # Errors
    ///
    /// - `SessionError::Validation` if the trimmed name is empty
    pub fn set_username(
        &mut self,
        name: &str,
        now: E::Instant,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.identity.set_username(name)?;

        let mut out = Vec::new();
        if self.connection.is_connected()
            && let Some(username) = self.identity.username()
        {
            let join = ClientMessage::join(self.identity.user_id(), username);
            if let Err(error) = emit(&mut self.transport, &join) {
                tracing::warn!(%error, "join failed");
                out.extend(self.check_liveness(now));
            }
        }

        tracing::info!(username = self.identity.username(), "username set");
        Ok(rendered(out))
    }

    /// Composer contents changed.
    ///
    /// Drives the typing notifier once a username is set.
    pub fn input_changed(&mut self, text: String, now: E::Instant) -> Vec<SessionAction> {
        self.composer = text;

        let mut out = Vec::new();
        if self.identity.username().is_some()
            && let Some(signal) = self.typing.keystroke(now, self.connection.is_connected())
        {
            out.extend(self.emit_typing(signal, now));
        }
        rendered(out)
    }

    /// Send a message, or queue it if it cannot go out now.
    ///
    /// Clears the composer whenever the message is accepted (sent or queued).
    ///
    /// # Errors
    ///
    /// - `SessionError::Validation` if the trimmed text is empty or no
    ///   username is set; nothing changes
    pub fn send_message(
        &mut self,
        text: &str,
        now: E::Instant,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::Validation("message is empty"));
        }
        let Some(username) = self.identity.username().map(str::to_string) else {
            return Err(SessionError::Validation("username not set"));
        };

        self.composer.clear();
        let mut out = Vec::new();

        // Earlier messages still queued on a live connection go first
        if self.connection.is_connected() && !self.outbox.is_empty() {
            out.extend(self.flush_outbox(now));
        }

        if self.connection.is_connected() && self.outbox.is_empty() {
            let message = ClientMessage::send(text, username.as_str(), self.identity.user_id());
            match emit(&mut self.transport, &message) {
                Ok(()) => {
                    self.outbox.record_delivery();
                    if let Some(signal) = self.typing.clear() {
                        out.extend(self.emit_typing(signal, now));
                    }
                    return Ok(rendered(out));
                },
                Err(error) => {
                    let transient = error.is_transient();
                    tracing::warn!(%error, transient, "send failed, queueing");
                },
            }
        }

        if let Some(notice) = self.outbox.defer(text.to_string(), now) {
            out.push(SessionAction::Notify(notice));
        }
        out.extend(self.check_liveness(now));
        if self.connection.is_connected() && !self.drain_retry.is_armed() {
            self.drain_retry.arm(now, DRAIN_RETRY_INTERVAL);
        }
        Ok(rendered(out))
    }

    /// Tear everything down: timers, transport, typing.
    ///
    /// Queued messages stay queued.
    pub fn shutdown(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let actions = self.connection.shutdown();
        let mut out = self.apply(actions, now);

        self.drop_transport("shutdown");
        self.heartbeat.disarm();
        self.drain_retry.disarm();
        self.typing.teardown();

        tracing::info!(queued = self.outbox.len(), "session shut down");
        rendered(out)
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// True iff connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Status string: `connecting`, `connected`, `disconnected` or `error`.
    pub fn status(&self) -> &'static str {
        self.connection.state().status()
    }

    /// Stable client identifier.
    pub fn user_id(&self) -> &str {
        self.identity.user_id()
    }

    /// Display name, once set.
    pub fn username(&self) -> Option<&str> {
        self.identity.username()
    }

    /// Current composer contents.
    pub fn composer(&self) -> &str {
        &self.composer
    }

    /// Messages waiting for connectivity.
    pub fn queued_count(&self) -> usize {
        self.outbox.len()
    }

    /// Texts of the queued messages, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &str> {
        self.outbox.iter().map(|queued| queued.text.as_str())
    }

    /// Messages in the local view, oldest first.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = &Message> {
        self.presence.messages()
    }

    /// Online users.
    pub fn users(&self) -> &[User] {
        self.presence.users()
    }

    /// Other online users currently typing.
    pub fn typing_users(&self) -> Vec<&User> {
        self.presence.typing_users(self.identity.user_id())
    }

    /// Whether the viewer is following the newest messages.
    pub fn is_following(&self) -> bool {
        self.presence.is_following()
    }

    /// Messages received while not following the newest ones.
    pub fn unread(&self) -> usize {
        self.presence.unread()
    }

    /// Whether `message` was written by this client's user.
    pub fn is_own(&self, message: &Message) -> bool {
        is_own(message, self.identity.username())
    }

    /// Most recent connection failure since the last successful connect.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Session restarts so far.
    pub fn restarts(&self) -> u32 {
        self.connection.restarts()
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn apply(&mut self, actions: Vec<ConnectionAction>, now: E::Instant) -> Vec<SessionAction> {
        let mut out = Vec::new();
        for action in actions {
            match action {
                ConnectionAction::OpenTransport { attempt } => {
                    out.push(SessionAction::Connect { attempt });
                },
                ConnectionAction::CloseTransport { reason } => self.drop_transport(&reason),
                ConnectionAction::Rejoin => {
                    self.last_error = None;
                    out.extend(self.rejoin(now));
                },
                ConnectionAction::Lost { reason } => {
                    self.heartbeat.disarm();
                    self.drain_retry.disarm();
                    self.drop_transport(&reason);
                },
                ConnectionAction::Exhausted { attempts, errors } => {
                    let error = SessionError::Exhaustion { attempts, errors };
                    tracing::warn!(%error, "giving up on reconnection");
                    self.last_error = Some(error);
                    out.push(SessionAction::Notify(Notice::ConnectionExhausted {
                        attempts,
                        errors,
                    }));
                },
                ConnectionAction::RestartScheduled { after } => {
                    out.push(SessionAction::Notify(Notice::Restarting { after }));
                },
                ConnectionAction::Restart => self.reset_for_restart(),
            }
        }
        out
    }

    /// Entered `Connected`: announce, drain, start the heartbeat.
    fn rejoin(&mut self, now: E::Instant) -> Vec<SessionAction> {
        self.heartbeat.arm(now);

        let Some(username) = self.identity.username() else {
            tracing::debug!("connected before join, nothing to announce");
            return Vec::new();
        };

        let join = ClientMessage::join(self.identity.user_id(), username);
        if let Err(error) = emit(&mut self.transport, &join) {
            tracing::warn!(%error, "rejoin failed");
            return self.check_liveness(now);
        }
        tracing::info!(username, "rejoined");

        if self.typing_stop_owed && !self.settle_typing_stop() {
            return self.check_liveness(now);
        }
        self.flush_outbox(now)
    }

    /// Emit queued messages in order while connected.
    ///
    /// A failure on a transport that still reports itself up re-arms the
    /// drain retry.
    fn flush_outbox(&mut self, now: E::Instant) -> Vec<SessionAction> {
        self.drain_retry.disarm();
        if !self.connection.is_connected() {
            return Vec::new();
        }
        let Some(username) = self.identity.username() else {
            return Vec::new();
        };
        let user_id = self.identity.user_id();

        let transport = &mut self.transport;
        let outcome = self.outbox.drain(|queued| {
            emit(transport, &ClientMessage::send(queued.text.as_str(), username, user_id))
        });

        match outcome {
            DrainOutcome::Aborted { .. } => {
                let out = self.check_liveness(now);
                if self.connection.is_connected() {
                    self.drain_retry.arm(now, DRAIN_RETRY_INTERVAL);
                }
                out
            },
            DrainOutcome::Empty | DrainOutcome::Delivered(_) => Vec::new(),
        }
    }

    /// Send a typing stop the server is still waiting for. Returns whether it
    /// went out.
    fn settle_typing_stop(&mut self) -> bool {
        let stop = ClientMessage::typing(self.identity.user_id(), false);
        match emit(&mut self.transport, &stop) {
            Ok(()) => {
                self.typing_stop_owed = false;
                true
            },
            Err(error) => {
                tracing::warn!(%error, "owed typing stop failed");
                false
            },
        }
    }

    /// Signals reach the server strictly alternating, starting with a start.
    fn emit_typing(&mut self, signal: TypingSignal, now: E::Instant) -> Vec<SessionAction> {
        if !self.connection.is_connected() {
            if signal == TypingSignal::Stop {
                self.typing_stop_owed = true;
            }
            tracing::debug!(?signal, "typing signal held while offline");
            return Vec::new();
        }

        if signal == TypingSignal::Start && self.typing_stop_owed && !self.settle_typing_stop() {
            self.typing.teardown();
            return self.check_liveness(now);
        }

        let message = ClientMessage::typing(self.identity.user_id(), signal.is_typing());
        match emit(&mut self.transport, &message) {
            Ok(()) => {
                if signal == TypingSignal::Stop {
                    self.typing_stop_owed = false;
                }
                Vec::new()
            },
            Err(error) => {
                tracing::warn!(%error, ?signal, "typing signal failed");
                match signal {
                    // The server never saw the start, so no stop may follow it
                    TypingSignal::Start => self.typing.teardown(),
                    TypingSignal::Stop => self.typing_stop_owed = true,
                }
                self.check_liveness(now)
            },
        }
    }

    /// Emit failed: if the transport itself says it is gone, stop treating the
    /// connection as up.
    fn check_liveness(&mut self, now: E::Instant) -> Vec<SessionAction> {
        if self.transport_alive() || !self.connection.is_connected() {
            return Vec::new();
        }

        let actions =
            self.connection.handle_disconnected("transport not connected", &self.env, now);
        self.apply(actions, now)
    }

    fn transport_alive(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_connected)
    }

    fn drop_transport(&mut self, reason: &str) {
        if let Some(mut transport) = self.transport.take() {
            tracing::debug!(reason, "closing transport");
            transport.close();
        }
    }

    fn reset_for_restart(&mut self) {
        self.drop_transport("restart");
        self.heartbeat.disarm();
        self.drain_retry.disarm();
        if self.typing.is_typing() {
            self.typing_stop_owed = true;
        }
        self.typing.teardown();
        self.presence.reset();

        tracing::warn!(
            user_id = self.identity.user_id(),
            queued = self.outbox.len(),
            "session restarted"
        );
    }
}

fn emit<T: Transport>(
    transport: &mut Option<T>,
    message: &ClientMessage,
) -> Result<(), TransportError> {
    transport.as_mut().ok_or(TransportError::NotConnected)?.emit(message)
}

/// Collapse render requests into one trailing `Render`.
fn rendered(mut actions: Vec<SessionAction>) -> Vec<SessionAction> {
    actions.retain(|action| *action != SessionAction::Render);
    actions.push(SessionAction::Render);
    actions
}
