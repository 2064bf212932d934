//! Reconnection policy and backoff.
//!
//! The policy bounds how hard the connection state machine retries: a fixed
//! number of attempts with randomized exponential backoff, a per-attempt
//! handshake timeout, and a last-resort session restart when attempts run out
//! after repeated errors. All values are tunable; the defaults reproduce the
//! behaviour users of the chat client are used to.

use std::time::Duration;

/// Reconnection attempts before giving up.
pub const DEFAULT_RECONNECTION_ATTEMPTS: u32 = 10;

/// Smallest delay between reconnection attempts.
pub const DEFAULT_DELAY_MIN: Duration = Duration::from_millis(1000);

/// Largest delay between reconnection attempts.
pub const DEFAULT_DELAY_MAX: Duration = Duration::from_millis(5000);

/// Time allowed for a single connection attempt to complete its handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Relative jitter applied to each backoff delay.
pub const DEFAULT_RANDOMIZATION: f64 = 0.5;

/// Errors that must accumulate before exhaustion triggers a session restart.
pub const DEFAULT_RESTART_THRESHOLD: u32 = 5;

/// Delay between exhaustion and the session restart.
pub const DEFAULT_RESTART_GRACE: Duration = Duration::from_millis(5000);

/// Minimum spacing between two session restarts.
pub const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(60);

/// Reconnection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts after a lost connection before reporting exhaustion
    pub reconnection_attempts: u32,
    /// Backoff floor
    pub delay_min: Duration,
    /// Backoff ceiling
    pub delay_max: Duration,
    /// Jitter factor in `[0, 1]`; 0 disables jitter
    pub randomization: f64,
    /// Per-attempt handshake timeout
    pub handshake_timeout: Duration,
    /// Restart only when the error count exceeds this
    pub restart_threshold: u32,
    /// Delay before a restart takes effect
    pub restart_grace: Duration,
    /// Minimum time between restarts
    pub restart_cooldown: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnection_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            delay_min: DEFAULT_DELAY_MIN,
            delay_max: DEFAULT_DELAY_MAX,
            randomization: DEFAULT_RANDOMIZATION,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            restart_threshold: DEFAULT_RESTART_THRESHOLD,
            restart_grace: DEFAULT_RESTART_GRACE,
            restart_cooldown: DEFAULT_RESTART_COOLDOWN,
        }
    }
}

impl ReconnectPolicy {
    /// Policy without jitter, for reproducible schedules.
    #[must_use]
    pub fn deterministic(mut self) -> Self {
        self.randomization = 0.0;
        self
    }

    /// Backoff generator for this policy.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.delay_min, self.delay_max, self.randomization)
    }
}

/// Randomized exponential backoff.
///
/// The n-th delay is `min * 2^n`, moved up or down by up to
/// `randomization * delay`, then capped at `max`. Delays therefore stay within
/// `[min * (1 - randomization), max]`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    randomization: f64,
    attempts: u32,
}

impl Backoff {
    /// Create a backoff starting at `min`.
    pub fn new(min: Duration, max: Duration, randomization: f64) -> Self {
        let randomization =
            if randomization.is_finite() { randomization.clamp(0.0, 1.0) } else { 0.0 };
        Self { min, max: max.max(min), randomization, attempts: 0 }
    }

    /// Delays handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Next delay.
    ///
    /// `unit` is a uniform sample in `[0, 1)` mapped onto a signed deviation
    /// in `[-randomization, +randomization)` of the base delay. A sample of
    /// `0.5` yields the base delay exactly.
    pub fn next_delay(&mut self, unit: f64) -> Duration {
        let exponent = self.attempts.min(31);
        self.attempts = self.attempts.saturating_add(1);

        let base = self.min.as_secs_f64() * f64::from(1u32 << exponent);
        let unit = unit.clamp(0.0, 1.0);
        let delay = base + (2.0 * unit - 1.0) * self.randomization * base;

        Duration::from_secs_f64(delay.max(0.0)).min(self.max)
    }

    /// Start over from `min`.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
