//! Temperature thresholds for status derivation.

use crate::Status;

/// Temperature thresholds that map a reading onto a [`Status`].
///
/// Both bounds are exclusive: a reading equal to `warn_above` is still OK,
/// and a reading equal to `alarm_above` is still WARN.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Thresholds {
    /// Readings above this are WARN.
    pub warn_above: f64,
    /// Readings above this are ALARM.
    pub alarm_above: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn_above: 80.0,
            alarm_above: 95.0,
        }
    }
}

impl Thresholds {
    /// Derive a status from a temperature reading.
    ///
    /// Monotonic in `temp`. A NaN reading classifies as OK.
    pub fn classify(&self, temp: f64) -> Status {
        if temp > self.alarm_above {
            Status::Alarm
        } else if temp > self.warn_above {
            Status::Warn
        } else {
            Status::Ok
        }
    }
}
