//! Transport seam between a session and its client connection.
//!
//! The session controller only sees [`Inbound`] events and sends plain
//! text; the WebSocket adapter in [`crate::server`] maps socket messages onto
//! this trait.  A clean close is `Ok(Inbound::Close)`; an abnormal disconnect
//! is `Err(TransportError)`.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Inbound / TransportError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// One binary frame of little-endian `f32` PCM.
    Audio(Vec<u8>),
    /// The client closed the connection normally.
    Close,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The connection failed or ended without a close handshake.
    #[error("connection dropped: {0}")]
    Dropped(String),

    /// The client sent a frame the audio channel does not accept.
    #[error("unexpected {0} frame")]
    UnexpectedFrame(&'static str),

    /// An outbound frame could not be written.
    #[error("send failed: {0}")]
    Send(String),
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Transport: Send {
    /// Wait for the next inbound event.
    ///
    /// Must be cancel-safe: the session polls it inside `select!` next to
    /// the inference gate.
    async fn recv(&mut self) -> Result<Inbound, TransportError>;

    /// Send one transcription as a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection.  Called once during teardown.
    async fn close(&mut self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// ChannelTransport (test-only)
// ---------------------------------------------------------------------------

/// In-memory transport driven by channels.
///
/// Dropping the inbound sender looks like an abnormal disconnect.
#[cfg(test)]
pub struct ChannelTransport {
    inbound: tokio::sync::mpsc::UnboundedReceiver<Result<Inbound, TransportError>>,
    outbound: tokio::sync::mpsc::UnboundedSender<String>,
    closed: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
pub struct ChannelPeer {
    pub inbound: tokio::sync::mpsc::UnboundedSender<Result<Inbound, TransportError>>,
    pub outbound: tokio::sync::mpsc::UnboundedReceiver<String>,
    pub closed: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl ChannelTransport {
    pub fn pair() -> (Self, ChannelPeer) {
        let (in_tx, in_rx) = tokio::sync::mpsc::unbounded_channel();
        let (out_tx, out_rx) = tokio::sync::mpsc::unbounded_channel();
        let closed = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        (
            Self {
                inbound: in_rx,
                outbound: out_tx,
                closed: closed.clone(),
            },
            ChannelPeer {
                inbound: in_tx,
                outbound: out_rx,
                closed,
            },
        )
    }
}

#[cfg(test)]
impl ChannelPeer {
    /// Send `samples` as one little-endian binary frame.
    pub fn send_samples(&self, samples: &[f32]) {
        let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let _ = self.inbound.send(Ok(Inbound::Audio(bytes)));
    }

    pub fn send_raw(&self, bytes: Vec<u8>) {
        let _ = self.inbound.send(Ok(Inbound::Audio(bytes)));
    }

    pub fn close(&self) {
        let _ = self.inbound.send(Ok(Inbound::Close));
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.inbound.send(Err(error));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for ChannelTransport {
    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        match self.inbound.recv().await {
            Some(event) => event,
            None => Err(TransportError::Dropped("peer went away".into())),
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
