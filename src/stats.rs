//! Fleet-level summary statistics.

use floorwatch_types::{Machine, Status};
use serde::{Deserialize, Serialize};

/// Counts by status plus the mean temperature of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total: usize,
    /// Machines at `OK`.
    pub online: usize,
    /// Machines at `WARN`.
    pub warning: usize,
    /// Machines at `ALARM`.
    pub alarm: usize,
    /// Mean temperature; `0.0` for an empty fleet.
    pub avg_temp: f64,
}

impl FleetStats {
    /// Share of the fleet that is not `OK`, in `[0, 1]`.
    pub fn degraded_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.warning + self.alarm) as f64 / self.total as f64
    }
}

/// Summarise a snapshot.
///
/// Pure and cheap; call it on every render.
pub fn aggregate(machines: &[Machine]) -> FleetStats {
    let mut stats = FleetStats {
        total: machines.len(),
        ..FleetStats::default()
    };

    let mut sum = 0.0;
    for machine in machines {
        match machine.status {
            Status::Ok => stats.online += 1,
            Status::Warn => stats.warning += 1,
            Status::Alarm => stats.alarm += 1,
        }
        sum += machine.temp;
    }

    if stats.total > 0 {
        stats.avg_temp = sum / stats.total as f64;
    }
    stats
}
