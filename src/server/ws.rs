//! WebSocket adapter for the session [`Transport`] seam.
//!
//! Binary frames carry audio, the server answers with text frames.  Pings
//! are answered by axum itself and never reach the session.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::pipeline::{Inbound, Transport, TransportError};

pub struct WsTransport {
    sender: SplitSink<WebSocket, Message>,
    receiver: SplitStream<WebSocket>,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        let (sender, receiver) = socket.split();
        Self { sender, receiver }
    }
}

/// Map one socket read onto a session event.  `None` means "keep reading".
fn classify(
    next: Option<Result<Message, axum::Error>>,
) -> Option<Result<Inbound, TransportError>> {
    match next {
        Some(Ok(Message::Binary(data))) => Some(Ok(Inbound::Audio(data))),
        Some(Ok(Message::Close(_))) => Some(Ok(Inbound::Close)),
        Some(Ok(Message::Text(_))) => Some(Err(TransportError::UnexpectedFrame("text"))),
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => None,
        Some(Err(e)) => Some(Err(TransportError::Dropped(e.to_string()))),
        None => Some(Err(TransportError::Dropped(
            "stream ended without close frame".into(),
        ))),
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Result<Inbound, TransportError> {
        loop {
            if let Some(event) = classify(self.receiver.next().await) {
                return event;
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sender
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sender
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}
