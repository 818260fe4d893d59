//! Machine entities - one per monitored factory station.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};

/// The kind of station a machine is.
///
/// This is a closed set. Anything keyed by kind (simulation baselines,
/// rendering geometry) is a lookup table, so adding a kind is a data change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MachineKind {
    /// Injection molding press.
    Injection,
    /// CNC machining center.
    Cnc,
    /// Assembly line cell.
    Assembly,
}

impl MachineKind {
    /// Every kind, in declaration order.
    pub const ALL: [MachineKind; 3] = [MachineKind::Injection, MachineKind::Cnc, MachineKind::Assembly];

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineKind::Injection => "injection",
            MachineKind::Cnc => "cnc",
            MachineKind::Assembly => "assembly",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`MachineKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError(pub String);

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown machine kind: {}", self.0)
    }
}

impl std::error::Error for ParseKindError {}

impl FromStr for MachineKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

/// Operational status of a machine.
///
/// Ordered by severity, so `max()` over a fleet gives the worst status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Status {
    #[default]
    Ok,
    Warn,
    Alarm,
}

impl Status {
    /// Returns the wire symbol for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warn => "WARN",
            Status::Alarm => "ALARM",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`Status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "OK" => Ok(Status::Ok),
            "WARN" => Ok(Status::Warn),
            "ALARM" => Ok(Status::Alarm),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Spatial attributes of a machine in the 3D scene.
///
/// Owned by the rendering layer. The engine carries them through untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Placement {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Placement {
    /// A placement at `position` with no rotation and a uniform scale.
    pub fn at(position: [f64; 3], scale: f64) -> Self {
        Self {
            position,
            rotation: [0.0; 3],
            scale: [scale; 3],
        }
    }
}

/// A monitored factory station.
///
/// `id`, `name`, `kind` and `placement` are fixed once the machine is
/// registered. Only `temp`, `status` and `last_update` change afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Machine {
    /// Stable unique identifier (e.g. "M-A").
    pub id: String,

    /// Display label.
    pub name: String,

    /// Station kind.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: MachineKind,

    /// Latest temperature reading in °C.
    pub temp: f64,

    /// Latest status.
    pub status: Status,

    /// When this machine was last written, by whichever writer did it.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp"))]
    pub last_update: DateTime<Utc>,

    /// Scene placement, passed through for the renderer.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub placement: Placement,
}

impl Machine {
    /// Create a machine with status OK, stamped now, at the scene origin.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: MachineKind, temp: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            temp,
            status: Status::Ok,
            last_update: Utc::now(),
            placement: Placement::default(),
        }
    }

    /// Set the initial status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the scene placement.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Set the last-update timestamp.
    pub fn with_last_update(mut self, at: DateTime<Utc>) -> Self {
        self.last_update = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_orders_by_severity() {
        assert!(Status::Alarm > Status::Warn);
        assert!(Status::Warn > Status::Ok);
        let worst = [Status::Ok, Status::Alarm, Status::Warn].into_iter().max();
        assert_eq!(worst, Some(Status::Alarm));
    }

    #[test]
    fn test_parse_kind_and_status() {
        assert_eq!("CNC".parse::<MachineKind>(), Ok(MachineKind::Cnc));
        assert!("lathe".parse::<MachineKind>().is_err());
        assert_eq!("WARN".parse::<Status>(), Ok(Status::Warn));
        assert!("warn".parse::<Status>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_machine_wire_format() {
        use chrono::TimeZone;

        let machine = Machine::new("M-A", "Injection Molder A", MachineKind::Injection, 65.0)
            .with_last_update(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
            .with_placement(Placement::at([7.0, 0.0, 0.0], 1.1));

        let value = serde_json::to_value(&machine).unwrap();
        assert_eq!(value["type"], "injection");
        assert_eq!(value["status"], "OK");
        assert_eq!(value["lastUpdate"], "2024-03-01T08:00:00.000Z");
        assert_eq!(value["position"], serde_json::json!([7.0, 0.0, 0.0]));
        assert_eq!(value["scale"], serde_json::json!([1.1, 1.1, 1.1]));

        let parsed: Machine = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, machine);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_placement_defaults_when_absent() {
        let json = r#"{
            "id": "M-X",
            "name": "X",
            "type": "assembly",
            "temp": 60.0,
            "status": "WARN",
            "lastUpdate": "2024-03-01T08:00:00Z"
        }"#;
        let machine: Machine = serde_json::from_str(json).unwrap();
        assert_eq!(machine.placement, Placement::default());
        assert_eq!(machine.status, Status::Warn);
    }
}
