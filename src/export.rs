//! Point-in-time JSON export of the fleet.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use floorwatch_types::Machine;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::error::ExportError;
use crate::registry::MachineRegistry;
use crate::stats::{aggregate, FleetStats};
use crate::uptime::UptimeTracker;

/// A captured export.
///
/// The machine list and the stats are computed from the same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    #[serde(with = "floorwatch_types::timestamp")]
    pub timestamp: DateTime<Utc>,
    pub machines: Vec<Machine>,
    pub stats: FleetStats,
    /// `HH:MM:SS`.
    pub uptime: String,
}

impl ExportArtifact {
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `factory_data_YYYY-MM-DDTHH-MM-SS.json`, from the capture time.
    pub fn file_name(&self) -> String {
        format!("factory_data_{}.json", self.timestamp.format("%Y-%m-%dT%H-%M-%S"))
    }

    /// Write the artifact into `dir` under [`file_name`](Self::file_name).
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_json_pretty()?)?;
        info!(path = %path.display(), machines = self.machines.len(), "export written");
        Ok(path)
    }
}

/// Captures [`ExportArtifact`]s. Read-only with respect to the registry.
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    registry: MachineRegistry,
    uptime: Arc<UptimeTracker>,
    clock: Arc<dyn Clock>,
}

impl SnapshotExporter {
    pub fn new(registry: MachineRegistry, uptime: Arc<UptimeTracker>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            uptime,
            clock,
        }
    }

    /// Capture the fleet as it is now.
    pub fn export(&self) -> ExportArtifact {
        let machines = self.registry.snapshot();
        let stats = aggregate(&machines);
        ExportArtifact {
            timestamp: self.clock.now(),
            machines,
            stats,
            uptime: self.uptime.formatted(),
        }
    }
}
