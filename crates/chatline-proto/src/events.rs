//! Event envelopes.
//!
//! Encoding goes through serde's adjacently tagged representation, so the
//! variant name lands in `event` and the payload in `data`. Decoding is done
//! by hand: the envelope is parsed first and the event name dispatched
//! explicitly, which lets unknown events surface as
//! [`ProtocolError::UnknownEvent`] instead of a generic serde message.
//!
//! # Invariants
//!
//! - Each variant maps to exactly one event name (see [`names`]).
//! - Encoding then decoding any value yields an equal value.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    types::{JoinPayload, Message, PingPayload, SendPayload, TypingPayload, User},
};

/// Largest envelope accepted by the decoders (1 MiB).
///
/// A full `message:get` history is the largest legitimate frame; anything
/// bigger is rejected before JSON parsing.
pub const MAX_ENVELOPE_SIZE: usize = 1024 * 1024;

/// Event names as they appear on the wire.
pub mod names {
    /// Announce identity (client to server).
    pub const USER_JOIN: &str = "user:join";
    /// Liveness heartbeat (client to server).
    pub const USER_PING: &str = "user:ping";
    /// Typing state change (both directions).
    pub const USER_TYPING: &str = "user:typing";
    /// Online user list (server to client).
    pub const USER_LIST: &str = "user:list";
    /// Submit a chat message (client to server).
    pub const MESSAGE_SEND: &str = "message:send";
    /// Message history snapshot (server to client).
    pub const MESSAGE_GET: &str = "message:get";
    /// Newly broadcast message (server to client).
    pub const MESSAGE_NEW: &str = "message:new";
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// `user:join`
    #[serde(rename = "user:join")]
    Join(JoinPayload),
    /// `user:ping`
    #[serde(rename = "user:ping")]
    Ping(PingPayload),
    /// `user:typing`
    #[serde(rename = "user:typing")]
    Typing(TypingPayload),
    /// `message:send`
    #[serde(rename = "message:send")]
    Send(SendPayload),
}

/// Events the server pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// `message:get`: recent history, oldest first.
    #[serde(rename = "message:get")]
    History(Vec<Message>),
    /// `message:new`: a single new message.
    #[serde(rename = "message:new")]
    NewMessage(Message),
    /// `user:list`: everyone currently online.
    #[serde(rename = "user:list")]
    UserList(Vec<User>),
    /// `user:typing`: another user's typing state.
    #[serde(rename = "user:typing")]
    Typing(TypingPayload),
}

/// Envelope shape shared by both directions.
#[derive(Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientMessage {
    /// `user:join` for the given identity.
    pub fn join(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self::Join(JoinPayload { user_id: user_id.into(), username: username.into() })
    }

    /// `user:ping` for the given user.
    pub fn ping(user_id: impl Into<String>) -> Self {
        Self::Ping(PingPayload { user_id: user_id.into() })
    }

    /// `user:typing` for the given user.
    pub fn typing(user_id: impl Into<String>, is_typing: bool) -> Self {
        Self::Typing(TypingPayload { user_id: user_id.into(), is_typing })
    }

    /// `message:send` tagged with the author's name and ID.
    pub fn send(
        text: impl Into<String>,
        sender: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::Send(SendPayload {
            text: text.into(),
            sender: sender.into(),
            user_id: user_id.into(),
        })
    }

    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => names::USER_JOIN,
            Self::Ping(_) => names::USER_PING,
            Self::Typing(_) => names::USER_TYPING,
            Self::Send(_) => names::MESSAGE_SEND,
        }
    }

    /// Serialize into a JSON envelope.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse a JSON envelope produced by a client.
    ///
    /// Servers and test harnesses use this; the client itself never decodes
    /// its own vocabulary.
    pub fn decode(text: &str) -> Result<Self> {
        let raw = parse_envelope(text)?;
        match raw.event.as_str() {
            names::USER_JOIN => payload(names::USER_JOIN, raw.data).map(Self::Join),
            names::USER_PING => payload(names::USER_PING, raw.data).map(Self::Ping),
            names::USER_TYPING => payload(names::USER_TYPING, raw.data).map(Self::Typing),
            names::MESSAGE_SEND => payload(names::MESSAGE_SEND, raw.data).map(Self::Send),
            _ => Err(ProtocolError::UnknownEvent(raw.event)),
        }
    }
}

impl ServerEvent {
    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::History(_) => names::MESSAGE_GET,
            Self::NewMessage(_) => names::MESSAGE_NEW,
            Self::UserList(_) => names::USER_LIST,
            Self::Typing(_) => names::USER_TYPING,
        }
    }

    /// Serialize into a JSON envelope.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse a JSON envelope pushed by the server.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EnvelopeTooLarge` if `text` exceeds
    ///   [`MAX_ENVELOPE_SIZE`]
    /// - `ProtocolError::MalformedEnvelope` if `text` is not an envelope
    /// - `ProtocolError::UnknownEvent` for names outside the server vocabulary
    /// - `ProtocolError::InvalidPayload` if `data` has the wrong shape
    pub fn decode(text: &str) -> Result<Self> {
        let raw = parse_envelope(text)?;
        match raw.event.as_str() {
            names::MESSAGE_GET => payload(names::MESSAGE_GET, raw.data).map(Self::History),
            names::MESSAGE_NEW => payload(names::MESSAGE_NEW, raw.data).map(Self::NewMessage),
            names::USER_LIST => payload(names::USER_LIST, raw.data).map(Self::UserList),
            names::USER_TYPING => payload(names::USER_TYPING, raw.data).map(Self::Typing),
            _ => Err(ProtocolError::UnknownEvent(raw.event)),
        }
    }
}

fn parse_envelope(text: &str) -> Result<RawEnvelope> {
    if text.len() > MAX_ENVELOPE_SIZE {
        return Err(ProtocolError::EnvelopeTooLarge { size: text.len(), max: MAX_ENVELOPE_SIZE });
    }

    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
}

fn payload<T: DeserializeOwned>(event: &'static str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| ProtocolError::InvalidPayload { event, reason: e.to_string() })
}
