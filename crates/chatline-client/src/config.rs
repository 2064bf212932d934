//! Session configuration.

use std::time::Duration;

use chatline_core::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MESSAGE_CAP, DEFAULT_NOTICE_THRESHOLD,
    DEFAULT_TYPING_DEBOUNCE, ReconnectPolicy,
};

/// Server the CLI connects to when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:4000";

/// Tunables for a [`crate::Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// WebSocket URL of the chat server
    pub server_url: String,
    /// Reconnection, timeout and restart policy
    pub policy: ReconnectPolicy,
    /// Interval between `user:ping` heartbeats
    pub heartbeat_interval: Duration,
    /// Inactivity before typing stops
    pub typing_debounce: Duration,
    /// Messages kept in the local view
    pub message_cap: usize,
    /// Deferred sends in a row before the offline notice
    pub notice_threshold: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            policy: ReconnectPolicy::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            typing_debounce: DEFAULT_TYPING_DEBOUNCE,
            message_cap: DEFAULT_MESSAGE_CAP,
            notice_threshold: DEFAULT_NOTICE_THRESHOLD,
        }
    }
}

impl SessionConfig {
    /// Default configuration pointed at `server_url`.
    pub fn with_server(server_url: impl Into<String>) -> Self {
        Self { server_url: server_url.into(), ..Self::default() }
    }
}
