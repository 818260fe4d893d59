//! Partial updates to a single machine.

use crate::Status;

/// A partial update for one machine.
///
/// Only the fields that are present are applied; absent fields keep their
/// previous values. This is also the wire shape of a single-entity telemetry
/// message: `{"id": "M-A", "temp": 71.5, "status": "WARN"}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachinePatch {
    /// Target machine.
    pub id: String,

    /// New temperature reading, if any.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub temp: Option<f64>,

    /// New status, if any.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub status: Option<Status>,
}

impl MachinePatch {
    /// Create a patch that touches no fields (it still refreshes `lastUpdate`).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            temp: None,
            status: None,
        }
    }

    /// Set the temperature field.
    pub fn temp(mut self, temp: f64) -> Self {
        self.temp = Some(temp);
        self
    }

    /// Set the status field.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// True when the patch carries no field besides the id.
    pub fn is_empty(&self) -> bool {
        self.temp.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let patch = MachinePatch::new("M-A").temp(70.0).status(Status::Warn);
        assert_eq!(patch.id, "M-A");
        assert_eq!(patch.temp, Some(70.0));
        assert_eq!(patch.status, Some(Status::Warn));
        assert!(!patch.is_empty());
        assert!(MachinePatch::new("M-A").is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_absent_fields_stay_absent() {
        let patch: MachinePatch = serde_json::from_str(r#"{"id":"M-C"}"#).unwrap();
        assert!(patch.is_empty());

        let json = serde_json::to_string(&MachinePatch::new("M-C").temp(61.0)).unwrap();
        assert_eq!(json, r#"{"id":"M-C","temp":61.0}"#);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rejects_unknown_status() {
        let result = serde_json::from_str::<MachinePatch>(r#"{"id":"M-C","status":"ON_FIRE"}"#);
        assert!(result.is_err());
    }
}
