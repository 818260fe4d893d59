//! Live telemetry: the link to an external push endpoint.
//!
//! - [`Transport`] / [`Link`]: the connection seam
//! - [`WebSocketTransport`]: WebSocket implementation
//! - [`ChannelTransport`]: in-memory implementation
//! - [`InboundMessage`]: wire decoding
//! - [`TelemetryIngestor`]: connection state machine and registry writer

mod channel;
mod ingestor;
pub mod message;
mod transport;

pub use channel::{ChannelPeer, ChannelRemote, ChannelTransport};
pub use ingestor::{ConnectionState, IngestCounters, TelemetryIngestor};
pub use message::{BatchItem, InboundMessage};
pub use transport::{Link, Transport, WebSocketTransport};
