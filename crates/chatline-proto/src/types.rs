//! Payload types carried inside event envelopes.
//!
//! Field names are camelCase on the wire to match the server's JSON schema.

use serde::{Deserialize, Serialize};

/// Sender name the server uses for its own notices ("alice joined", ...).
pub const SYSTEM_SENDER: &str = "system";

/// A chat message as stored and broadcast by the server.
///
/// Server-authoritative: clients never mutate a received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned message ID.
    pub id: String,
    /// Message body.
    pub text: String,
    /// Display name of the author, or `"system"` for server notices.
    pub sender: String,
    /// Unix milliseconds at which the server accepted the message.
    pub timestamp: u64,
}

impl Message {
    /// True if the server authored this message itself.
    pub fn is_system(&self) -> bool {
        self.sender == SYSTEM_SENDER
    }
}

/// An online user as reported by the server's presence directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Client-generated stable identifier.
    pub user_id: String,
    /// Display name chosen at join.
    pub username: String,
    /// Server-side connection identifier.
    pub socket_id: String,
}

/// `user:join` payload. Announces identity after every (re)connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    /// Stable client identifier.
    pub user_id: String,
    /// Display name.
    pub username: String,
}

/// `user:ping` payload. Liveness heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingPayload {
    /// Stable client identifier.
    pub user_id: String,
}

/// `user:typing` payload, used in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// User whose typing state changed.
    pub user_id: String,
    /// Whether the user is currently typing.
    pub is_typing: bool,
}

/// `message:send` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPayload {
    /// Message body, already trimmed.
    pub text: String,
    /// Display name of the author.
    pub sender: String,
    /// Stable client identifier of the author.
    pub user_id: String,
}
