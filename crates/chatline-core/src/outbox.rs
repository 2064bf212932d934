//! Outbound delivery queue.
//!
//! Messages that cannot be emitted right away wait here in FIFO order until
//! the next connection. A message leaves the queue only after the transport
//! has accepted it.
//!
//! # Invariants
//!
//! - Queue order is delivery order.
//! - Draining is all-or-nothing: a pass that fails anywhere leaves the whole
//!   queue in place for the next connection.
//! - The offline notice fires at most once per offline episode. An episode
//!   ends with a successful immediate send or a successful drain.

use std::collections::VecDeque;

use crate::{error::TransportError, notice::Notice};

/// Deferred sends in a row before the user is told about the queue.
pub const DEFAULT_NOTICE_THRESHOLD: u32 = 3;

/// A message waiting for connectivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage<I> {
    /// Trimmed, non-empty message text
    pub text: String,
    /// When the message was queued
    pub enqueued_at: I,
}

/// Result of a drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was queued
    Empty,
    /// Every queued message was accepted; the queue is now empty
    Delivered(usize),
    /// Emitting failed; the queue is unchanged
    Aborted {
        /// Queue position of the message that failed
        failed_at: usize,
        /// Error raised by the transport
        error: TransportError,
    },
}

/// FIFO of messages not yet handed to the transport.
#[derive(Debug, Clone)]
pub struct Outbox<I> {
    queue: VecDeque<QueuedMessage<I>>,
    notice_threshold: u32,
    deferred_streak: u32,
    warned: bool,
}

impl<I> Default for Outbox<I> {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_THRESHOLD)
    }
}

impl<I> Outbox<I> {
    /// Create an empty outbox.
    pub fn new(notice_threshold: u32) -> Self {
        Self { queue: VecDeque::new(), notice_threshold, deferred_streak: 0, warned: false }
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage<I>> {
        self.queue.iter()
    }

    /// Queue a message that could not be sent.
    ///
    /// Returns the offline notice when this deferral completes a streak of
    /// `notice_threshold` and the notice has not fired yet this episode.
    pub fn defer(&mut self, text: String, now: I) -> Option<Notice> {
        self.queue.push_back(QueuedMessage { text, enqueued_at: now });
        self.deferred_streak = self.deferred_streak.saturating_add(1);

        tracing::debug!(queued = self.queue.len(), streak = self.deferred_streak, "message queued");

        if self.deferred_streak >= self.notice_threshold && !self.warned {
            self.warned = true;
            return Some(Notice::QueuedWhileOffline { queued: self.queue.len() });
        }
        None
    }

    /// A message went out immediately: the offline episode is over.
    pub fn record_delivery(&mut self) {
        self.deferred_streak = 0;
        self.warned = false;
    }

    /// Emit every queued message in order.
    ///
    /// Stops at the first failure and keeps the entire queue, including the
    /// messages emitted before the failure.
    pub fn drain<F>(&mut self, mut emit: F) -> DrainOutcome
    where
        F: FnMut(&QueuedMessage<I>) -> Result<(), TransportError>,
    {
        if self.queue.is_empty() {
            return DrainOutcome::Empty;
        }

        for (position, message) in self.queue.iter().enumerate() {
            if let Err(error) = emit(message) {
                tracing::warn!(
                    %error,
                    failed_at = position,
                    queued = self.queue.len(),
                    "drain aborted"
                );
                return DrainOutcome::Aborted { failed_at: position, error };
            }
        }

        let delivered = self.queue.len();
        self.queue.clear();
        self.record_delivery();

        tracing::info!(delivered, "queued messages delivered");
        DrainOutcome::Delivered(delivered)
    }
}
