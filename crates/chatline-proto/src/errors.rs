//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding event envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Envelope exceeds [`crate::MAX_ENVELOPE_SIZE`].
    #[error("envelope too large: {size} bytes (max {max})")]
    EnvelopeTooLarge {
        /// Size of the rejected envelope
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Envelope is not a JSON object with `event` and `data` fields.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Event name is not part of the vocabulary for this direction.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Payload does not match the shape expected for its event.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event whose payload failed to decode
        event: &'static str,
        /// Decoder message
        reason: String,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),
}
