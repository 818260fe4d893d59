//! Operator commands sent to the live telemetry source.

use chrono::{DateTime, Utc};

/// A command sent outward over the live connection.
///
/// Wire shape: `{"command": "emergency_stop", "machineId": null, "timestamp": "..."}`.
/// A `machine_id` of `None` addresses the whole line and serializes as `null`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OutboundCommand {
    /// Command name (e.g. "emergency_stop", "reset").
    pub command: String,

    /// Target machine, or `None` for a fleet-wide command.
    pub machine_id: Option<String>,

    /// When the command was issued.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp"))]
    pub timestamp: DateTime<Utc>,
}

impl OutboundCommand {
    pub fn new(command: impl Into<String>, machine_id: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            command: command.into(),
            machine_id,
            timestamp,
        }
    }
}
