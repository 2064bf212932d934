//! Simulated transport.
//!
//! Records every accepted event as its encoded frame and lets tests script
//! failures: drop the connection, or fail a specific upcoming emit. Clones
//! share state, so a test keeps one handle while the session owns another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatline_core::{Transport, TransportError};
use chatline_proto::ClientMessage;

#[derive(Debug, Default)]
struct SharedState {
    frames: Vec<String>,
    connected: bool,
    closed: bool,
    /// Successful emits left before the next one fails
    fail_after: Option<usize>,
}

/// In-memory transport with scripted failures.
#[derive(Debug, Clone, Default)]
pub struct SimTransport {
    state: Arc<Mutex<SharedState>>,
}

impl SimTransport {
    /// A transport whose connection is up.
    pub fn connected() -> Self {
        let transport = Self::default();
        transport.lock().connected = true;
        transport
    }

    /// Simulate the connection dying underneath the client.
    ///
    /// Subsequent emits fail with [`TransportError::NotConnected`] and
    /// [`Transport::is_connected`] reports `false`.
    pub fn drop_connection(&self) {
        self.lock().connected = false;
    }

    /// Let `ok` more emits through, then fail exactly one.
    pub fn fail_after(&self, ok: usize) {
        self.lock().fail_after = Some(ok);
    }

    /// Whether the session closed this transport.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Encoded frames accepted so far.
    pub fn frames(&self) -> Vec<String> {
        self.lock().frames.clone()
    }

    /// Events accepted so far.
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.lock().frames.iter().filter_map(|frame| ClientMessage::decode(frame).ok()).collect()
    }

    /// Events accepted so far with the given wire name.
    pub fn sent_named(&self, name: &str) -> Vec<ClientMessage> {
        self.sent().into_iter().filter(|m| m.name() == name).collect()
    }

    /// Forget recorded frames.
    pub fn clear(&self) {
        self.lock().frames.clear();
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimTransport {
    fn emit(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.connected || state.closed {
            return Err(TransportError::NotConnected);
        }

        match state.fail_after {
            Some(0) => {
                state.fail_after = None;
                tracing::debug!(event = message.name(), "injected emit failure");
                return Err(TransportError::Closed("injected failure".to_string()));
            },
            Some(left) => state.fail_after = Some(left - 1),
            None => {},
        }

        let frame = message.encode()?;
        state.frames.push(frame);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let state = self.lock();
        state.connected && !state.closed
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.closed = true;
        state.connected = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn records_frames_in_order() {
        let mut transport = SimTransport::connected();
        let handle = transport.clone();

        transport.emit(&ClientMessage::ping("u-1")).unwrap();
        transport.emit(&ClientMessage::typing("u-1", true)).unwrap();

        let names: Vec<_> = handle.sent().iter().map(ClientMessage::name).collect();
        assert_eq!(names, vec!["user:ping", "user:typing"]);
    }

    #[test]
    fn scripted_failure_hits_once() {
        let mut transport = SimTransport::connected();
        transport.fail_after(1);

        assert!(transport.emit(&ClientMessage::ping("u")).is_ok());
        assert!(transport.emit(&ClientMessage::ping("u")).is_err());
        assert!(transport.emit(&ClientMessage::ping("u")).is_ok());
        assert_eq!(transport.frames().len(), 2);
    }

    #[test]
    fn dropped_connection_rejects_emits() {
        let mut transport = SimTransport::connected();
        transport.drop_connection();

        assert!(!transport.is_connected());
        assert_eq!(transport.emit(&ClientMessage::ping("u")), Err(TransportError::NotConnected));
    }
}
