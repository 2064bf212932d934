//! User-facing notices.

use std::{fmt, time::Duration};

/// One-off notification surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Messages are piling up while offline
    QueuedWhileOffline {
        /// Messages currently queued
        queued: usize,
    },
    /// Reconnection attempts ran out
    ConnectionExhausted {
        /// Attempts made
        attempts: u32,
        /// Errors seen
        errors: u32,
    },
    /// The session will restart from scratch
    Restarting {
        /// Delay before the restart
        after: Duration,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueuedWhileOffline { queued } => write!(
                f,
                "You're offline. {queued} message(s) will be sent when connection is restored."
            ),
            Self::ConnectionExhausted { attempts, errors } => write!(
                f,
                "Could not reconnect after {attempts} attempts ({errors} errors)."
            ),
            Self::Restarting { after } => {
                write!(f, "Connection problems persist. Restarting in {}s.", after.as_secs())
            },
        }
    }
}
