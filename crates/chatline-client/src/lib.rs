//! Chatline client
//!
//! Session state machine for the Chatline chat client. Keeps a chat session
//! alive over an unreliable connection: reconnects with backoff, re-announces
//! identity after every reconnect, queues messages while offline and replays
//! them, debounces typing indicators, and projects server pushes into a
//! renderable view.
//!
//! # Architecture
//!
//! The client follows the Sans-IO and action-based patterns of
//! [`chatline_core`]. It receives events ([`SessionEvent`]), processes them
//! through pure state machine logic, and returns actions ([`SessionAction`])
//! for the caller to execute. Outbound events go straight to the
//! [`Transport`] the session owns.
//!
//! # Components
//!
//! - [`Session`]: Top-level state machine
//! - [`SessionConfig`]: Server URL and tunables
//! - [`SessionEvent`]: Events fed into the session
//! - [`SessionAction`]: Actions produced by the session
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::WsTransport`] and [`transport::connect`]: WebSocket transport
//! - [`SystemEnv`]: Production environment
//! - [`runtime::Runtime`]: Async event loop driving a session

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod event;
mod session;

#[cfg(feature = "transport")]
pub mod runtime;
#[cfg(feature = "transport")]
mod system_env;
#[cfg(feature = "transport")]
pub mod transport;

pub use chatline_core::{
    ConnectionState, Environment, Notice, ReconnectPolicy, SessionError, Transport,
    TransportError,
};
pub use config::{DEFAULT_SERVER_URL, SessionConfig};
pub use event::{SessionAction, SessionEvent};
pub use session::{DRAIN_RETRY_INTERVAL, Session};
#[cfg(feature = "transport")]
pub use system_env::SystemEnv;
