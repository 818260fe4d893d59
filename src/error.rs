//! Error types for the telemetry engine.
//!
//! None of these are fatal at runtime. Ingest and connection failures are
//! absorbed where they happen (logged, and reflected in the connection state);
//! the typed errors exist so each component can report what went wrong.

use thiserror::Error;

/// Errors raised by the machine registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The seed fleet contains the same id twice.
    #[error("duplicate machine id: {0}")]
    DuplicateId(String),

    /// A full replacement did not carry exactly the registered ids, in order.
    #[error("replacement does not match the registered machine ids (expected {expected:?}, got {actual:?})")]
    IdSetMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Errors raised on the live telemetry link.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Opening the connection failed (refused, unreachable, bad handshake).
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The open connection failed while reading or writing.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection was refused because it is no longer wanted.
    #[error("connection closed")]
    Closed,

    /// An inbound payload could not be decoded.
    #[error("malformed telemetry message: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::Malformed(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TelemetryError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TelemetryError::Closed,
            other => TelemetryError::Transport(other.to_string()),
        }
    }
}

/// Errors raised while exporting a snapshot.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The artifact could not be serialized.
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The artifact could not be written.
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when parsing an operator console line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    /// The line was empty.
    #[error("empty input")]
    Empty,

    /// The first word is not a known intent.
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    /// The intent is known but its arguments are not.
    #[error("usage: {0}")]
    Usage(&'static str),
}
