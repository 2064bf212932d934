//! Session events and actions.

use chatline_core::Notice;
use chatline_proto::ServerEvent;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Opening transports when asked and reporting the outcome
/// - Delivering decoded server events
/// - Driving time forward via ticks
/// - Forwarding user intents (join, type, send)
///
/// Generic over the transport `T` handed over on connect and the instant type
/// `I` of the environment.
#[derive(Debug)]
pub enum SessionEvent<T, I> {
    /// Begin the first connection attempt.
    Start {
        /// Current time.
        now: I,
    },

    /// A requested transport finished its handshake.
    TransportOpened {
        /// Attempt ID from [`SessionAction::Connect`].
        attempt: u64,
        /// The live transport. The session owns it from here on.
        transport: T,
        /// Current time.
        now: I,
    },

    /// A requested transport failed to open.
    TransportFailed {
        /// Attempt ID from [`SessionAction::Connect`].
        attempt: u64,
        /// Why it failed.
        reason: String,
        /// Current time.
        now: I,
    },

    /// The live transport closed.
    TransportClosed {
        /// Why it closed.
        reason: String,
        /// Current time.
        now: I,
    },

    /// Server pushed an event.
    Received(ServerEvent),

    /// Time tick for timers.
    ///
    /// The caller should tick periodically (the runtime uses 100 ms).
    Tick {
        /// Current time.
        now: I,
    },

    /// User submitted a display name.
    SetUsername {
        /// Name as typed, untrimmed.
        name: String,
        /// Current time.
        now: I,
    },

    /// Composer contents changed (one keystroke).
    InputChanged {
        /// New composer contents.
        text: String,
        /// Current time.
        now: I,
    },

    /// User submitted a message.
    SendMessage {
        /// Message text, untrimmed.
        text: String,
        /// Current time.
        now: I,
    },

    /// Whether the viewer is following the newest messages.
    SetFollowing(bool),

    /// End the session.
    Shutdown {
        /// Current time.
        now: I,
    },
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a transport to the configured server and report back with
    /// [`SessionEvent::TransportOpened`] or [`SessionEvent::TransportFailed`]
    /// carrying the same `attempt`.
    Connect {
        /// Attempt ID.
        attempt: u64,
    },

    /// Show a one-off notice to the user.
    Notify(Notice),

    /// Session state changed; redraw.
    Render,
}
