//! Heartbeat monitor.
//!
//! While connected the client pings the server every interval. Before each
//! ping the monitor consults the transport's own liveness flag: a transport
//! that already knows it is dead produces [`HeartbeatAction::Stale`] instead
//! of a ping, and the session forces the connection down.

use std::{ops::Sub, time::Duration};

use crate::timer::Timer;

/// Default ping interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// What a due heartbeat asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Emit `user:ping`
    Ping,
    /// Transport reports itself disconnected; treat the connection as lost
    Stale,
}

/// Periodic liveness signal.
#[derive(Debug, Clone)]
pub struct Heartbeat<I> {
    interval: Duration,
    timer: Timer<I>,
    last_sent: Option<I>,
}

impl<I> Heartbeat<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a disarmed heartbeat.
    pub fn new(interval: Duration) -> Self {
        Self { interval, timer: Timer::new(), last_sent: None }
    }

    /// Ping interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the last ping was sent.
    pub fn last_sent(&self) -> Option<I> {
        self.last_sent
    }

    /// Whether the heartbeat is running.
    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Start pinging; the first ping is due one interval from `now`.
    pub fn arm(&mut self, now: I) {
        self.timer.arm(now, self.interval);
    }

    /// Stop pinging.
    pub fn disarm(&mut self) {
        self.timer.disarm();
    }

    /// Poll the heartbeat.
    ///
    /// Returns `None` unless a ping is due. A due heartbeat re-arms itself for
    /// the next window when the transport is alive and stays disarmed when it
    /// is not.
    pub fn tick(&mut self, now: I, transport_alive: bool) -> Option<HeartbeatAction> {
        if !self.timer.fire(now) {
            return None;
        }

        if !transport_alive {
            tracing::warn!("heartbeat found transport disconnected");
            return Some(HeartbeatAction::Stale);
        }

        self.last_sent = Some(now);
        self.timer.arm(now, self.interval);
        tracing::trace!("heartbeat");
        Some(HeartbeatAction::Ping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn first_ping_one_interval_after_arming() {
        let mut heartbeat = Heartbeat::new(DEFAULT_HEARTBEAT_INTERVAL);
        heartbeat.arm(Duration::ZERO);

        assert_eq!(heartbeat.tick(29 * SEC, true), None);
        assert_eq!(heartbeat.tick(30 * SEC, true), Some(HeartbeatAction::Ping));
        assert_eq!(heartbeat.last_sent(), Some(30 * SEC));

        assert_eq!(heartbeat.tick(59 * SEC, true), None);
        assert_eq!(heartbeat.tick(60 * SEC, true), Some(HeartbeatAction::Ping));
    }

    #[test]
    fn disarmed_heartbeat_is_silent() {
        let mut heartbeat = Heartbeat::new(DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(heartbeat.tick(100 * SEC, true), None);

        heartbeat.arm(Duration::ZERO);
        heartbeat.disarm();
        assert_eq!(heartbeat.tick(100 * SEC, true), None);
    }

    #[test]
    fn dead_transport_is_reported_once() {
        let mut heartbeat = Heartbeat::new(DEFAULT_HEARTBEAT_INTERVAL);
        heartbeat.arm(Duration::ZERO);

        assert_eq!(heartbeat.tick(30 * SEC, false), Some(HeartbeatAction::Stale));
        assert_eq!(heartbeat.last_sent(), None);
        assert!(!heartbeat.is_armed());
        assert_eq!(heartbeat.tick(60 * SEC, false), None);
    }
}
