//! Connection lifecycle state machine.
//!
//! Owns the transport lifecycle: first connect, reconnection with backoff,
//! handshake timeouts, exhaustion, and the last-resort session restart. Uses
//! the action pattern: methods take time as input and return actions for the
//! session to execute. The machine never touches a transport itself.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ start ┌────────────┐ connected ┌───────────┐
//! │ Idle │──────>│ Connecting │──────────>│ Connected │
//! └──────┘       └────────────┘           └───────────┘
//!    ^             ^    │ error/timeout        │ disconnect
//!    │      retry  │    v                      v
//!    │   ┌─────────┴─┐<──────────────┌──────────────┐
//!    │   │  Errored  │               │ Disconnected │
//!    │   └───────────┘<──────────────└──────────────┘
//!    │         │ exhausted + errors > threshold
//!    └─────────┘ restart (after grace, rate limited)
//! ```
//!
//! # Invariants
//!
//! - Every entry into `Connected` yields exactly one `Rejoin` action.
//! - Only the current attempt may complete or fail a handshake; results for
//!   older attempts are rejected with [`ConnectionError::StaleAttempt`].
//! - Two restarts are never closer together than the policy cooldown.

use std::{ops::Sub, time::Duration};

use crate::{
    env::Environment,
    error::ConnectionError,
    reconnect::{Backoff, ReconnectPolicy},
    timer::Timer,
};

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new transport connection, tagged with this attempt ID
    OpenTransport {
        /// Attempt ID to report back with the handshake result
        attempt: u64,
    },

    /// Tear down the transport of the current attempt
    CloseTransport {
        /// Why the transport is being closed
        reason: String,
    },

    /// Entered `Connected`: re-announce identity, drain queued messages,
    /// start the heartbeat
    Rejoin,

    /// Left `Connected`: stop the heartbeat
    Lost {
        /// Why the connection was lost
        reason: String,
    },

    /// Reconnection attempts ran out
    Exhausted {
        /// Attempts made since the last successful connection
        attempts: u32,
        /// Errors accumulated since the last successful connection
        errors: u32,
    },

    /// A session restart has been armed
    RestartScheduled {
        /// Delay until the restart
        after: Duration,
    },

    /// Restart the session from scratch (an `OpenTransport` follows)
    Restart,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started
    Idle,
    /// Handshake in progress
    Connecting,
    /// Transport established
    Connected,
    /// Connection lost, reconnect pending
    Disconnected,
    /// Last attempt failed
    Errored,
}

impl ConnectionState {
    /// Status string shown to the user.
    ///
    /// `Idle` reads as `connecting`: the first attempt starts immediately.
    pub const fn status(self) -> &'static str {
        match self {
            Self::Idle | Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Errored => "error",
        }
    }
}

/// Connection state machine.
///
/// Pure state machine: no I/O, time passed as parameters. Generic over
/// `Instant` so tests can drive it with virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    policy: ReconnectPolicy,
    backoff: Backoff,
    /// ID of the most recent `OpenTransport`
    attempt: u64,
    /// Reconnection attempts since the last successful connection
    retries: u32,
    /// Connection errors since the last successful connection
    error_count: u32,
    /// Session restarts performed
    restarts: u32,
    handshake: Timer<I>,
    retry: Timer<I>,
    restart: Timer<I>,
    last_restart: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new connection in [`ConnectionState::Idle`].
    pub fn new(policy: ReconnectPolicy) -> Self {
        let backoff = policy.backoff();
        Self {
            state: ConnectionState::Idle,
            policy,
            backoff,
            attempt: 0,
            retries: 0,
            error_count: 0,
            restarts: 0,
            handshake: Timer::new(),
            retry: Timer::new(),
            restart: Timer::new(),
            last_restart: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True iff the state is [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// ID of the most recent connection attempt.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Reconnection attempts since the last successful connection.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Connection errors since the last successful connection.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Session restarts performed so far.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Active reconnection policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Time until the next reconnection attempt. `None` if none is pending.
    pub fn next_retry_in(&self, now: I) -> Option<Duration> {
        self.retry.remaining(now)
    }

    /// Whether a session restart is pending.
    pub fn restart_pending(&self) -> bool {
        self.restart.is_armed()
    }

    /// Begin the first connection attempt.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not in `Idle`
    pub fn start(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Idle {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "start" });
        }

        Ok(self.open(now))
    }

    /// Handshake for `attempt` completed.
    ///
    /// Resets retries, errors and backoff, and returns `Rejoin`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::StaleAttempt` if `attempt` is not the current one
    /// - `ConnectionError::InvalidState` if the current attempt already failed
    pub fn handle_connected(
        &mut self,
        attempt: u64,
        _now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        self.check_attempt(attempt, "handle_connected")?;

        self.state = ConnectionState::Connected;
        self.handshake.disarm();
        self.retry.disarm();
        self.retries = 0;
        self.error_count = 0;
        self.backoff.reset();

        tracing::info!(attempt, "connection established");

        Ok(vec![ConnectionAction::Rejoin])
    }

    /// Handshake for `attempt` failed.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::StaleAttempt` if `attempt` is not the current one
    /// - `ConnectionError::InvalidState` if the current attempt already ended
    pub fn handle_connect_error<E: Environment>(
        &mut self,
        attempt: u64,
        reason: &str,
        env: &E,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        self.check_attempt(attempt, "handle_connect_error")?;
        self.handshake.disarm();

        Ok(self.fail(reason, env, now))
    }

    /// Transport reported that the connection went away.
    ///
    /// While connected this moves to `Disconnected` and schedules a retry.
    /// While connecting it counts as a failed handshake. Otherwise ignored.
    pub fn handle_disconnected<E: Environment>(
        &mut self,
        reason: &str,
        env: &E,
        now: I,
    ) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connected => {
                tracing::info!(reason, "connection lost");
                self.state = ConnectionState::Disconnected;

                let mut actions = vec![ConnectionAction::Lost { reason: reason.to_string() }];
                actions.extend(self.schedule_retry(now, env));
                actions
            },
            ConnectionState::Connecting => {
                self.handshake.disarm();
                self.fail(reason, env, now)
            },
            ConnectionState::Idle | ConnectionState::Disconnected | ConnectionState::Errored => {
                vec![]
            },
        }
    }

    /// Process periodic maintenance: handshake timeouts, due reconnects and
    /// due restarts.
    pub fn tick<E: Environment>(&mut self, env: &E, now: I) -> Vec<ConnectionAction> {
        if self.restart.fire(now) {
            return self.restart(now);
        }

        match self.state {
            ConnectionState::Connecting => {
                let elapsed = self.handshake.elapsed(now);
                if self.handshake.fire(now) {
                    let reason =
                        format!("handshake timeout after {:?}", elapsed.unwrap_or_default());
                    let mut actions =
                        vec![ConnectionAction::CloseTransport { reason: reason.clone() }];
                    actions.extend(self.fail(&reason, env, now));
                    return actions;
                }
                vec![]
            },
            ConnectionState::Disconnected | ConnectionState::Errored => {
                if self.retry.fire(now) {
                    self.retries += 1;
                    tracing::info!(
                        retry = self.retries,
                        max = self.policy.reconnection_attempts,
                        "reconnecting"
                    );
                    return self.open(now);
                }
                vec![]
            },
            ConnectionState::Idle | ConnectionState::Connected => vec![],
        }
    }

    /// Tear down: cancel every timer and close any live transport.
    pub fn shutdown(&mut self) -> Vec<ConnectionAction> {
        self.handshake.disarm();
        self.retry.disarm();
        self.restart.disarm();

        let previous = self.state;
        self.state = ConnectionState::Disconnected;

        match previous {
            ConnectionState::Connected => vec![
                ConnectionAction::Lost { reason: "shutdown".to_string() },
                ConnectionAction::CloseTransport { reason: "shutdown".to_string() },
            ],
            ConnectionState::Connecting => {
                vec![ConnectionAction::CloseTransport { reason: "shutdown".to_string() }]
            },
            ConnectionState::Idle | ConnectionState::Disconnected | ConnectionState::Errored => {
                vec![]
            },
        }
    }

    fn check_attempt(&self, attempt: u64, operation: &'static str) -> Result<(), ConnectionError> {
        if attempt != self.attempt {
            return Err(ConnectionError::StaleAttempt { attempt, current: self.attempt });
        }
        if self.state != ConnectionState::Connecting {
            return Err(ConnectionError::InvalidState { state: self.state, operation });
        }
        Ok(())
    }

    fn open(&mut self, now: I) -> Vec<ConnectionAction> {
        self.attempt += 1;
        self.state = ConnectionState::Connecting;
        self.handshake.arm(now, self.policy.handshake_timeout);
        self.retry.disarm();

        vec![ConnectionAction::OpenTransport { attempt: self.attempt }]
    }

    fn fail<E: Environment>(&mut self, reason: &str, env: &E, now: I) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Errored;
        self.error_count += 1;

        tracing::warn!(
            attempt = self.attempt,
            errors = self.error_count,
            reason,
            "connection attempt failed"
        );

        self.schedule_retry(now, env)
    }

    fn schedule_retry<E: Environment>(&mut self, now: I, env: &E) -> Vec<ConnectionAction> {
        if self.retries >= self.policy.reconnection_attempts {
            return self.exhaust(now);
        }

        let delay = self.backoff.next_delay(env.random_unit());
        tracing::debug!(?delay, retry = self.retries + 1, "reconnect scheduled");
        self.retry.arm(now, delay);

        vec![]
    }

    fn exhaust(&mut self, now: I) -> Vec<ConnectionAction> {
        tracing::error!(
            attempts = self.retries,
            errors = self.error_count,
            "reconnection attempts exhausted"
        );

        let mut actions = vec![ConnectionAction::Exhausted {
            attempts: self.retries,
            errors: self.error_count,
        }];

        if self.error_count > self.policy.restart_threshold && !self.restart.is_armed() {
            let cooldown_left = self
                .last_restart
                .map(|at| {
                    let since = if now < at { Duration::ZERO } else { now - at };
                    self.policy.restart_cooldown.saturating_sub(since)
                })
                .unwrap_or_default();
            let after = self.policy.restart_grace.max(cooldown_left);

            tracing::warn!(?after, "session restart scheduled");
            self.restart.arm(now, after);
            actions.push(ConnectionAction::RestartScheduled { after });
        }

        actions
    }

    fn restart(&mut self, now: I) -> Vec<ConnectionAction> {
        self.restarts += 1;
        self.last_restart = Some(now);
        self.retries = 0;
        self.error_count = 0;
        self.backoff.reset();
        self.handshake.disarm();
        self.retry.disarm();
        self.state = ConnectionState::Idle;

        tracing::warn!(restarts = self.restarts, "restarting session");

        let mut actions = vec![ConnectionAction::Restart];
        actions.extend(self.open(now));
        actions
    }
}
