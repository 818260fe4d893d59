//! Inbound telemetry messages.
//!
//! Two shapes arrive on the wire:
//!
//! ```text
//! {"id": "M-A", "temp": 71.2, "status": "WARN"}            single machine
//! {"machines": [{"id": "M-A", "temp": 71.2}, ...]}          batch
//! ```
//!
//! Batch items are decoded one by one, so a bad item does not take its
//! siblings down with it. Fields other than `id`, `temp` and `status` are
//! ignored; the feed cannot rename or retype a machine.

use floorwatch_types::MachinePatch;
use serde_json::Value;

use crate::error::TelemetryError;

/// One entry of a batch message.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItem {
    /// A well-formed patch.
    Patch(MachinePatch),
    /// An entry that could not be decoded, with the reason.
    Malformed { index: usize, reason: String },
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `{"id": ...}`
    Single(MachinePatch),
    /// `{"machines": [...]}`
    Batch(Vec<BatchItem>),
}

impl InboundMessage {
    /// Decode a raw text payload.
    pub fn parse(raw: &str) -> Result<Self, TelemetryError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, TelemetryError> {
        let Value::Object(mut object) = value else {
            return Err(TelemetryError::Malformed("expected a JSON object".to_string()));
        };

        if let Some(machines) = object.remove("machines") {
            let Value::Array(items) = machines else {
                return Err(TelemetryError::Malformed("`machines` must be an array".to_string()));
            };

            let items = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match serde_json::from_value::<MachinePatch>(item) {
                    Ok(patch) => BatchItem::Patch(patch),
                    Err(e) => BatchItem::Malformed {
                        index,
                        reason: e.to_string(),
                    },
                })
                .collect();
            return Ok(InboundMessage::Batch(items));
        }

        if object.contains_key("id") {
            let patch = serde_json::from_value::<MachinePatch>(Value::Object(object))?;
            return Ok(InboundMessage::Single(patch));
        }

        Err(TelemetryError::Malformed(
            "expected an `id` or a `machines` field".to_string(),
        ))
    }

    /// The well-formed patches carried by this message.
    pub fn patches(&self) -> Vec<MachinePatch> {
        match self {
            InboundMessage::Single(patch) => vec![patch.clone()],
            InboundMessage::Batch(items) => items
                .iter()
                .filter_map(|item| match item {
                    BatchItem::Patch(patch) => Some(patch.clone()),
                    BatchItem::Malformed { .. } => None,
                })
                .collect(),
        }
    }

    /// Number of batch entries that failed to decode.
    pub fn malformed_count(&self) -> usize {
        match self {
            InboundMessage::Single(_) => 0,
            InboundMessage::Batch(items) => items
                .iter()
                .filter(|item| matches!(item, BatchItem::Malformed { .. }))
                .count(),
        }
    }
}
