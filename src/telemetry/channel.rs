//! Channel-based transport.
//!
//! An in-memory [`Transport`] for embedding the engine next to another
//! telemetry source (a message bus consumer, a replay tool) and for tests.
//! Every successful `open` hands the far end of the new link to the
//! [`ChannelRemote`] as a [`ChannelPeer`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::transport::{Link, Transport};
use crate::error::TelemetryError;

/// An in-memory transport.
///
/// # Example
///
/// ```
/// use floorwatch::ChannelTransport;
///
/// let (transport, mut remote) = ChannelTransport::create();
/// // Hand `transport` to the ingestor, then `remote.accept().await`
/// // yields a peer for each connection it opens.
/// # let _ = (transport, remote);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    accept_tx: mpsc::UnboundedSender<ChannelPeer>,
    refuse: Arc<AtomicBool>,
}

/// The remote side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct ChannelRemote {
    accept_rx: mpsc::UnboundedReceiver<ChannelPeer>,
    refuse: Arc<AtomicBool>,
}

/// The far end of one open link.
///
/// Dropping the peer closes the link from the remote side.
#[derive(Debug)]
pub struct ChannelPeer {
    endpoint: String,
    to_link: mpsc::UnboundedSender<String>,
    from_link: mpsc::UnboundedReceiver<String>,
}

impl ChannelTransport {
    /// Create a transport and its remote side.
    pub fn create() -> (Self, ChannelRemote) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));
        (
            Self {
                accept_tx,
                refuse: refuse.clone(),
            },
            ChannelRemote { accept_rx, refuse },
        )
    }
}

impl ChannelRemote {
    /// Wait for the next connection.
    pub async fn accept(&mut self) -> Option<ChannelPeer> {
        self.accept_rx.recv().await
    }

    /// Take a pending connection without waiting.
    pub fn try_accept(&mut self) -> Option<ChannelPeer> {
        self.accept_rx.try_recv().ok()
    }

    /// Make subsequent `open` calls fail as if the endpoint were down.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl ChannelPeer {
    /// The endpoint the link was opened against.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Push a payload to the link. Returns false if the link is gone.
    pub fn send(&self, payload: impl Into<String>) -> bool {
        self.to_link.send(payload.into()).is_ok()
    }

    /// Wait for the next payload sent by the link.
    ///
    /// Returns `None` once the link has closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_link.recv().await
    }

    /// Take a payload sent by the link without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_link.try_recv().ok()
    }

    /// True once the link side has closed.
    pub fn is_closed(&self) -> bool {
        self.to_link.is_closed()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn open(&self, endpoint: &str) -> Result<Box<dyn Link>, TelemetryError> {
        let refused = || TelemetryError::Connect {
            endpoint: endpoint.to_string(),
            reason: "connection refused".to_string(),
        };
        if self.refuse.load(Ordering::SeqCst) {
            return Err(refused());
        }

        let (to_link, link_rx) = mpsc::unbounded_channel();
        let (link_tx, from_link) = mpsc::unbounded_channel();
        let peer = ChannelPeer {
            endpoint: endpoint.to_string(),
            to_link,
            from_link,
        };
        self.accept_tx.send(peer).map_err(|_| refused())?;

        Ok(Box::new(ChannelLink {
            rx: link_rx,
            tx: Some(link_tx),
        }))
    }
}

struct ChannelLink {
    rx: mpsc::UnboundedReceiver<String>,
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl Link for ChannelLink {
    async fn recv(&mut self) -> Option<Result<String, TelemetryError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn send(&mut self, payload: String) -> Result<(), TelemetryError> {
        let tx = self.tx.as_ref().ok_or(TelemetryError::Closed)?;
        tx.send(payload).map_err(|_| TelemetryError::Closed)
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_hands_peer_to_remote() {
        let (transport, mut remote) = ChannelTransport::create();
        let mut link = transport.open("mem://line-1").await.unwrap();
        let mut peer = remote.try_accept().unwrap();
        assert_eq!(peer.endpoint(), "mem://line-1");

        assert!(peer.send(r#"{"id":"M-A"}"#));
        assert_eq!(link.recv().await.unwrap().unwrap(), r#"{"id":"M-A"}"#);

        link.send("hello".to_string()).await.unwrap();
        assert_eq!(peer.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_dropping_peer_closes_link() {
        let (transport, mut remote) = ChannelTransport::create();
        let mut link = transport.open("mem://").await.unwrap();
        drop(remote.try_accept().unwrap());
        assert!(link.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closing_link_is_seen_by_peer() {
        let (transport, mut remote) = ChannelTransport::create();
        let mut link = transport.open("mem://").await.unwrap();
        let mut peer = remote.try_accept().unwrap();

        link.close().await;
        assert!(peer.recv().await.is_none());
        assert!(peer.is_closed());
        assert!(link.send("late".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_refuse() {
        let (transport, mut remote) = ChannelTransport::create();
        remote.set_refuse(true);
        assert!(matches!(
            transport.open("mem://down").await,
            Err(TelemetryError::Connect { .. })
        ));
        assert!(remote.try_accept().is_none());

        remote.set_refuse(false);
        assert!(transport.open("mem://up").await.is_ok());
    }
}
