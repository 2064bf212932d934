//! Transport boundary.
//!
//! The session talks to the network only through this trait. Production code
//! plugs in a WebSocket transport; tests plug in a simulated one.

use chatline_proto::ClientMessage;

use crate::error::TransportError;

/// Event-based duplex connection to the chat server.
///
/// Inbound events do not flow through this trait: the driver delivers them to
/// the session directly.
pub trait Transport {
    /// Hand an event to the transport for delivery.
    ///
    /// Must not block. `Ok` means the transport accepted the event; a
    /// connection that dies afterwards is reported as a disconnect.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`] if the event cannot be accepted.
    fn emit(&mut self, message: &ClientMessage) -> Result<(), TransportError>;

    /// Transport's own view of whether the connection is alive.
    fn is_connected(&self) -> bool;

    /// Close the connection. Idempotent.
    fn close(&mut self);
}
