//! Deadline timers.
//!
//! A [`Timer`] is an explicit, cancellable deadline. State machines never
//! schedule callbacks; they arm a timer with the current time and poll it with
//! [`Timer::fire`] on every tick. Disarming is just clearing the deadline, so
//! every exit path (state change, teardown) can cancel without a handle
//! registry.

use std::{ops::Sub, time::Duration};

/// One-shot deadline measured from the instant it was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer<I> {
    armed: Option<(I, Duration)>,
}

impl<I> Default for Timer<I> {
    fn default() -> Self {
        Self { armed: None }
    }
}

impl<I> Timer<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Arm (or re-arm) the timer to fire `after` from `now`.
    pub fn arm(&mut self, now: I, after: Duration) {
        self.armed = Some((now, after));
    }

    /// Cancel the timer. No-op if disarmed.
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Time elapsed since arming. `None` if disarmed.
    pub fn elapsed(&self, now: I) -> Option<Duration> {
        let (since, _) = self.armed?;
        if now < since { Some(Duration::ZERO) } else { Some(now - since) }
    }

    /// Time left until the deadline. `None` if disarmed, zero if overdue.
    pub fn remaining(&self, now: I) -> Option<Duration> {
        let (_, after) = self.armed?;
        let elapsed = self.elapsed(now)?;
        Some(after.saturating_sub(elapsed))
    }

    /// Whether the deadline has passed, without consuming it.
    pub fn is_due(&self, now: I) -> bool {
        matches!(self.remaining(now), Some(left) if left.is_zero())
    }

    /// Consume the deadline if it has passed.
    ///
    /// Returns `true` exactly once per arming; the timer is disarmed after.
    pub fn fire(&mut self, now: I) -> bool {
        if self.is_due(now) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn fires_once_after_deadline() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, 2 * SEC);

        assert!(!timer.fire(SEC));
        assert!(timer.fire(2 * SEC));
        assert!(!timer.fire(3 * SEC));
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_pushes_deadline_back() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, 2 * SEC);
        timer.arm(SEC, 2 * SEC);

        assert!(!timer.fire(2 * SEC));
        assert_eq!(timer.remaining(2 * SEC), Some(SEC));
        assert!(timer.fire(3 * SEC));
    }

    #[test]
    fn disarmed_timer_never_fires() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, SEC);
        timer.disarm();

        assert!(!timer.fire(10 * SEC));
        assert_eq!(timer.remaining(10 * SEC), None);
    }
}
