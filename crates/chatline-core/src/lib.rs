//! Chatline core
//!
//! Sans-IO state machines behind the chat client: connection lifecycle with
//! reconnection and restart, heartbeat, outbound queue, typing debounce, and
//! the presence projection.
//!
//! # Architecture
//!
//! Every component is a pure state machine. Time comes in as a parameter,
//! randomness through [`Environment`], and effects go out as returned values
//! ([`ConnectionAction`], [`HeartbeatAction`], [`TypingSignal`], [`Notice`]).
//! Nothing here performs I/O; the session in `chatline-client` composes the
//! components and executes their effects against a [`Transport`].
//!
//! # Components
//!
//! - [`Connection`]: lifecycle state machine and reconnection policy
//! - [`Heartbeat`]: periodic `user:ping` and transport liveness check
//! - [`Outbox`]: FIFO of messages waiting for connectivity
//! - [`TypingNotifier`]: keystroke debounce into typing start/stop
//! - [`Presence`]: messages, online users and typing flags
//! - [`ClientIdentity`]: stable client identifier and display name

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod heartbeat;
pub mod identity;
pub mod notice;
pub mod outbox;
pub mod presence;
pub mod reconnect;
pub mod timer;
pub mod transport;
pub mod typing;

pub use connection::{Connection, ConnectionAction, ConnectionState};
pub use env::Environment;
pub use error::{ConnectionError, SessionError, TransportError};
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, Heartbeat, HeartbeatAction};
pub use identity::ClientIdentity;
pub use notice::Notice;
pub use outbox::{DEFAULT_NOTICE_THRESHOLD, DrainOutcome, Outbox, QueuedMessage};
pub use presence::{DEFAULT_MESSAGE_CAP, Presence, is_own};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use timer::Timer;
pub use transport::Transport;
pub use typing::{DEFAULT_TYPING_DEBOUNCE, TypingNotifier, TypingSignal};
