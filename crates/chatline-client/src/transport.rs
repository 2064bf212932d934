//! WebSocket transport for the client.
//!
//! Provides [`WsTransport`], a thin layer that moves JSON text frames between
//! a WebSocket and channels. Protocol logic stays in the Sans-IO
//! [`crate::Session`].
//!
//! Each connection runs two tasks: a writer draining the outbound channel into
//! the socket and a reader decoding inbound frames into [`Incoming`] values.
//! Both are aborted when the [`WsTransport`] is closed or dropped, so a
//! replaced connection never delivers into the session again.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chatline_core::{Transport, TransportError};
use chatline_proto::{ClientMessage, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::AbortHandle,
};
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Outbound frames buffered before emits report backpressure.
const OUTBOUND_CAPACITY: usize = 64;

/// Inbound events buffered before the reader waits on the session.
const INBOUND_CAPACITY: usize = 256;

/// What the reader task delivers.
#[derive(Debug)]
pub enum Incoming {
    /// A decoded server event
    Event(ServerEvent),
    /// The connection ended; no further items follow
    Closed(String),
}

/// Live WebSocket connection.
pub struct WsTransport {
    outgoing: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
    tasks: [AbortHandle; 2],
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport").field("connected", &self.is_connected()).finish()
    }
}

impl WsTransport {
    fn stop(&self) {
        self.connected.store(false, Ordering::Release);
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Transport for WsTransport {
    fn emit(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let frame = message.encode()?;
        self.outgoing.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::Backpressure,
            TrySendError::Closed(_) => TransportError::Closed("writer stopped".to_string()),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.outgoing.is_closed()
    }

    fn close(&mut self) {
        self.stop();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Connect to a Chatline server.
///
/// Returns the transport and the receiver for everything the server sends on
/// this connection.
///
/// # Errors
///
/// - `TransportError::HandshakeTimeout` if the handshake exceeds `timeout`
/// - `TransportError::Handshake` if the server cannot be reached or refuses
pub async fn connect(
    url: &str,
    timeout: Duration,
) -> Result<(WsTransport, mpsc::Receiver<Incoming>), TransportError> {
    let (stream, _response) =
        tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| TransportError::HandshakeTimeout { elapsed: timeout })?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

    tracing::info!(url, "websocket connected");

    let (mut sink, mut source) = stream.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    let (incoming_tx, incoming_rx) = mpsc::channel::<Incoming>(INBOUND_CAPACITY);
    let connected = Arc::new(AtomicBool::new(true));

    let writer_connected = Arc::clone(&connected);
    let writer = tokio::spawn(async move {
        while let Some(frame) = outgoing_rx.recv().await {
            if let Err(error) = sink.send(WsMessage::Text(frame.into())).await {
                tracing::warn!(%error, "websocket write failed");
                break;
            }
        }
        writer_connected.store(false, Ordering::Release);
        let _ = sink.close().await;
    });

    let reader_connected = Arc::clone(&connected);
    let reader = tokio::spawn(async move {
        let reason = loop {
            match source.next().await {
                Some(Ok(WsMessage::Text(text))) => match ServerEvent::decode(text.as_str()) {
                    Ok(event) => {
                        if incoming_tx.send(Incoming::Event(event)).await.is_err() {
                            break "session gone".to_string();
                        }
                    },
                    Err(error) => tracing::warn!(%error, "dropping undecodable frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    break frame.map_or_else(
                        || "closed by server".to_string(),
                        |f| format!("closed by server: {}", f.reason.as_str()),
                    );
                },
                Some(Ok(_)) => {},
                Some(Err(error)) => break error.to_string(),
                None => break "stream ended".to_string(),
            }
        };

        reader_connected.store(false, Ordering::Release);
        tracing::info!(%reason, "websocket closed");
        let _ = incoming_tx.send(Incoming::Closed(reason)).await;
    });

    let transport = WsTransport {
        outgoing: outgoing_tx,
        connected,
        tasks: [writer.abort_handle(), reader.abort_handle()],
    };
    Ok((transport, incoming_rx))
}
