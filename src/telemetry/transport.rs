//! Transport abstraction for the live telemetry link.
//!
//! The ingestor only needs three things from a connection: receive a text
//! payload, send a text payload, close. [`Transport`] opens a [`Link`] that
//! does those. [`WebSocketTransport`] is the production implementation;
//! [`ChannelTransport`](super::ChannelTransport) is an in-memory one.

use std::fmt::Debug;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::TelemetryError;

/// Opens connections to a telemetry endpoint.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Open a link to `endpoint`.
    async fn open(&self, endpoint: &str) -> Result<Box<dyn Link>, TelemetryError>;
}

/// One open connection.
///
/// `recv` must be cancel-safe: the ingestor polls it inside `select!`.
#[async_trait]
pub trait Link: Send {
    /// Wait for the next text payload.
    ///
    /// Returns `None` once the remote side has closed the link.
    async fn recv(&mut self) -> Option<Result<String, TelemetryError>>;

    /// Send a text payload.
    async fn send(&mut self, payload: String) -> Result<(), TelemetryError>;

    /// Close the link gracefully. Errors are swallowed.
    async fn close(&mut self);
}

/// WebSocket transport (e.g. a Node-RED `ws://host:1880/ws/factory` endpoint).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, endpoint: &str) -> Result<Box<dyn Link>, TelemetryError> {
        let (ws, response) = connect_async(endpoint).await.map_err(|e| TelemetryError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        debug!(endpoint, status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WebSocketLink { ws }))
    }
}

struct WebSocketLink {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WebSocketLink {
    async fn recv(&mut self) -> Option<Result<String, TelemetryError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => {
                        warn!("dropping non-UTF-8 binary frame: {}", e);
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "websocket closed by peer");
                    return None;
                }
                // Ping/pong are answered by tungstenite itself
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn send(&mut self, payload: String) -> Result<(), TelemetryError> {
        self.ws.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!("websocket close: {}", e);
        }
    }
}
