//! Async runtime driving a [`Session`] over WebSockets.
//!
//! The runtime owns the event loop and coordinates:
//! - [`Session`]: the Sans-IO client state machine
//! - [`Frontend`]: user input and rendering
//! - [`crate::transport`]: WebSocket connections requested by the session
//!
//! Connection attempts run as spawned tasks and report back through a
//! channel, tagged with the attempt ID the session issued. The runtime keeps
//! exactly one inbound receiver: the one belonging to the transport the
//! session accepted last.

use std::{future::Future, time::Duration};

use chatline_core::{Environment, Notice, TransportError};
use thiserror::Error;
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::{
    Session, SessionAction, SessionEvent,
    transport::{self, Incoming, WsTransport},
};

/// Interval at which the session's timers are polled.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

type ConnectResult = (u64, Result<(WsTransport, mpsc::Receiver<Incoming>), TransportError>);

/// Errors that stop the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The frontend failed to read input or render
    #[error("frontend error: {0}")]
    Frontend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Choose a display name
    SetUsername(String),
    /// Composer contents changed
    Typed(String),
    /// Submit a message
    Send(String),
    /// Viewer started or stopped following the newest messages
    Follow(bool),
    /// Leave
    Quit,
}

/// User-facing side of the runtime.
pub trait Frontend<E: Environment>: Send {
    /// Frontend error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait for the next user input. `None` means input is closed.
    ///
    /// Must be cancel-safe: the runtime polls it alongside timers and network
    /// events and drops it whenever another branch wins.
    fn next_input(
        &mut self,
    ) -> impl Future<Output = Result<Option<UserInput>, Self::Error>> + Send;

    /// Draw the session.
    fn render(&mut self, session: &Session<WsTransport, E>) -> Result<(), Self::Error>;

    /// Show a one-off notice.
    fn notify(&mut self, notice: &Notice) -> Result<(), Self::Error>;
}

/// Event loop for one chat session.
pub struct Runtime<E, F>
where
    E: Environment,
    F: Frontend<E>,
{
    env: E,
    session: Session<WsTransport, E>,
    frontend: F,
    /// Attempt ID of the most recent connect request
    pending: Option<u64>,
}

impl<E, F> Runtime<E, F>
where
    E: Environment,
    F: Frontend<E>,
{
    /// Create a runtime around an existing session.
    pub fn new(env: E, session: Session<WsTransport, E>, frontend: F) -> Self {
        Self { env, session, frontend, pending: None }
    }

    /// Run until the user quits or input closes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Frontend`] if the frontend fails. Network
    /// failures never end the loop.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let (connect_tx, mut connect_rx) = mpsc::channel::<ConnectResult>(8);
        let mut inbound: Option<mpsc::Receiver<Incoming>> = None;
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let actions = self.session.start(self.env.now());
        self.execute(actions, &connect_tx)?;

        loop {
            tokio::select! {
                input = self.frontend.next_input() => {
                    let input = input.map_err(frontend_error)?;
                    let now = self.env.now();
                    let event = match input {
                        None | Some(UserInput::Quit) => break,
                        Some(UserInput::SetUsername(name)) => {
                            SessionEvent::SetUsername { name, now }
                        },
                        Some(UserInput::Typed(text)) => SessionEvent::InputChanged { text, now },
                        Some(UserInput::Send(text)) => SessionEvent::SendMessage { text, now },
                        Some(UserInput::Follow(following)) => SessionEvent::SetFollowing(following),
                    };
                    let actions = self.session.handle(event);
                    self.execute(actions, &connect_tx)?;
                },
                Some((attempt, result)) = connect_rx.recv() => {
                    let now = self.env.now();
                    let actions = match result {
                        Ok((transport, receiver)) => {
                            let actions = self.session.transport_opened(attempt, transport, now);
                            if self.pending == Some(attempt) && self.session.is_connected() {
                                inbound = Some(receiver);
                            }
                            actions
                        },
                        Err(error) => {
                            self.session.transport_failed(attempt, &error.to_string(), now)
                        },
                    };
                    self.execute(actions, &connect_tx)?;
                },
                incoming = recv_inbound(&mut inbound) => {
                    let actions = match incoming {
                        Some(Incoming::Event(event)) => self.session.receive(event),
                        Some(Incoming::Closed(reason)) => {
                            inbound = None;
                            self.session.transport_closed(&reason, self.env.now())
                        },
                        None => {
                            inbound = None;
                            Vec::new()
                        },
                    };
                    self.execute(actions, &connect_tx)?;
                },
                _ = ticker.tick() => {
                    let actions = self.session.tick(self.env.now());
                    self.execute(actions, &connect_tx)?;
                },
            }
        }

        let actions = self.session.shutdown(self.env.now());
        self.execute(actions, &connect_tx)?;
        Ok(())
    }

    fn execute(
        &mut self,
        actions: Vec<SessionAction>,
        connect_tx: &mpsc::Sender<ConnectResult>,
    ) -> Result<(), RuntimeError> {
        for action in actions {
            match action {
                SessionAction::Connect { attempt } => {
                    self.pending = Some(attempt);
                    let url = self.session.config().server_url.clone();
                    let timeout = self.session.config().policy.handshake_timeout;
                    let tx = connect_tx.clone();

                    tracing::debug!(attempt, %url, "connecting");
                    tokio::spawn(async move {
                        let result = transport::connect(&url, timeout).await;
                        let _ = tx.send((attempt, result)).await;
                    });
                },
                SessionAction::Notify(notice) => {
                    self.frontend.notify(&notice).map_err(frontend_error)?;
                },
                SessionAction::Render => {
                    self.frontend.render(&self.session).map_err(frontend_error)?;
                },
            }
        }
        Ok(())
    }
}

async fn recv_inbound(inbound: &mut Option<mpsc::Receiver<Incoming>>) -> Option<Incoming> {
    match inbound {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn frontend_error<E: std::error::Error + Send + Sync + 'static>(error: E) -> RuntimeError {
    RuntimeError::Frontend(Box::new(error))
}
