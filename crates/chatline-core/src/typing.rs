//! Typing notifier.
//!
//! Debounces keystrokes into discrete start/stop signals. The first keystroke
//! after idle emits [`TypingSignal::Start`] (when connected); every keystroke
//! pushes the debounce deadline back; the deadline, or a sent message, emits
//! [`TypingSignal::Stop`].
//!
//! # Invariants
//!
//! - Signals strictly alternate, starting with `Start`.
//! - An emitted `Start` is always followed by a `Stop` once the debounce
//!   deadline passes, whether or not the message is ever sent.

use std::{ops::Sub, time::Duration};

use crate::timer::Timer;

/// Default inactivity period before typing is considered stopped.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Typing state change to emit as `user:typing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    /// `isTyping: true`
    Start,
    /// `isTyping: false`
    Stop,
}

impl TypingSignal {
    /// Wire value of the signal.
    pub const fn is_typing(self) -> bool {
        matches!(self, Self::Start)
    }
}

/// Keystroke debouncer.
#[derive(Debug, Clone)]
pub struct TypingNotifier<I> {
    debounce: Duration,
    is_typing: bool,
    deadline: Timer<I>,
}

impl<I> TypingNotifier<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an idle notifier.
    pub fn new(debounce: Duration) -> Self {
        Self { debounce, is_typing: false, deadline: Timer::new() }
    }

    /// Whether a `Start` is outstanding.
    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// Whether the debounce deadline is armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_armed()
    }

    /// Register a keystroke.
    ///
    /// Always (re-)arms the deadline. Emits `Start` only on the first
    /// keystroke after idle and only when `connected`.
    pub fn keystroke(&mut self, now: I, connected: bool) -> Option<TypingSignal> {
        self.deadline.arm(now, self.debounce);

        if self.is_typing || !connected {
            return None;
        }

        self.is_typing = true;
        Some(TypingSignal::Start)
    }

    /// Poll the debounce deadline.
    pub fn tick(&mut self, now: I) -> Option<TypingSignal> {
        if !self.deadline.fire(now) {
            return None;
        }
        self.stop()
    }

    /// Message sent: stop typing immediately.
    pub fn clear(&mut self) -> Option<TypingSignal> {
        self.deadline.disarm();
        self.stop()
    }

    /// Drop all state without emitting. Used when the transport is gone.
    pub fn teardown(&mut self) {
        self.deadline.disarm();
        self.is_typing = false;
    }

    fn stop(&mut self) -> Option<TypingSignal> {
        if self.is_typing {
            self.is_typing = false;
            Some(TypingSignal::Stop)
        } else {
            None
        }
    }
}
