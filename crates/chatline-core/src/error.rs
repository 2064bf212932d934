//! Error types for the Chatline core.
//!
//! Strongly-typed errors for the three failure classes a session can meet:
//! transport failures (recovered by reconnection and queueing), validation
//! failures (silently rejected input), and exhaustion (reconnection gave up).
//! None of these reach the UI as errors; the session turns them into state.

use std::time::Duration;

use thiserror::Error;

use crate::connection::ConnectionState;

/// Failures reported by a [`crate::Transport`] or while establishing one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Emit attempted without a live connection
    #[error("transport not connected")]
    NotConnected,

    /// Connection was closed underneath the caller
    #[error("transport closed: {0}")]
    Closed(String),

    /// Outbound buffer is full
    #[error("outbound buffer full")]
    Backpressure,

    /// Handshake with the server failed
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Handshake did not complete within the configured timeout
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Event could not be serialized
    #[error("encode failed: {0}")]
    Encode(String),
}

impl TransportError {
    /// Returns true if retrying on a fresh connection may succeed.
    ///
    /// Encoding failures are deterministic: the same event will fail again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

impl From<chatline_proto::ProtocolError> for TransportError {
    fn from(err: chatline_proto::ProtocolError) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Errors raised by connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Handshake result for an attempt that is no longer current
    #[error("stale attempt {attempt} (current {current})")]
    StaleAttempt {
        /// Attempt the result belongs to
        attempt: u64,
        /// Attempt the machine is waiting on
        current: u64,
    },
}

/// Session-level failure taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Handshake or emit failure, recovered by reconnection and queueing
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Rejected user input (empty name, empty message)
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// Reconnection attempts ran out
    #[error("reconnection exhausted after {attempts} attempts ({errors} errors)")]
    Exhaustion {
        /// Reconnection attempts made since the last successful connection
        attempts: u32,
        /// Connection errors accumulated since the last successful connection
        errors: u32,
    },
}
