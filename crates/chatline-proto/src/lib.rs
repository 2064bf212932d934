//! Chatline wire protocol.
//!
//! Every exchange between client and server is a named event carrying a JSON
//! payload. On the wire each event is one text frame holding an envelope:
//!
//! ```text
//! {"event": "user:join", "data": {"userId": "...", "username": "..."}}
//! ```
//!
//! [`ClientMessage`] covers the outbound vocabulary (join, ping, typing,
//! message send). [`ServerEvent`] covers what the server pushes (history, new
//! messages, user list, typing flags).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod events;
pub mod types;

pub use errors::{ProtocolError, Result};
pub use events::{ClientMessage, MAX_ENVELOPE_SIZE, ServerEvent, names};
pub use types::{JoinPayload, Message, PingPayload, SendPayload, TypingPayload, User};
