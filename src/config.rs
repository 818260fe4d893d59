//! Runtime settings.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional file (TOML, YAML or JSON, picked by extension), then environment
//! variables prefixed `FLOORWATCH_`. Nested keys use `__`:
//!
//! ```text
//! FLOORWATCH_ENDPOINT=ws://line-2:1880/ws/factory
//! FLOORWATCH_SIMULATION__SEED=42
//! FLOORWATCH_THRESHOLDS__ALARM_ABOVE=100
//! ```
//!
//! A minimal file:
//!
//! ```toml
//! endpoint = "ws://localhost:1880/ws/factory"
//!
//! [simulation]
//! interval_ms = 1000
//! seed = 7
//!
//! [[machines]]
//! id = "M-A"
//! name = "Injection Molder A"
//! type = "injection"
//! temp = 65.0
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use config::{Config, Environment, File};
use floorwatch_types::{Machine, MachineKind, Placement, Status, Thresholds};
use serde::{Deserialize, Serialize};

use crate::simulation::SimulationConfig;

/// Default telemetry endpoint (a local Node-RED flow).
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:1880/ws/factory";

/// Everything the engine needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Live telemetry endpoint. Editable at runtime; never written back.
    pub endpoint: String,
    /// Open the live link immediately instead of starting in simulation.
    pub connect_on_start: bool,
    pub simulation: SimulationConfig,
    pub thresholds: Thresholds,
    /// Uptime refresh cadence, in milliseconds.
    pub uptime_interval_ms: u64,
    /// The fleet, in display order.
    pub machines: Vec<MachineSeed>,
}

/// Initial state of one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSeed {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MachineKind,
    pub temp: f64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
}

fn unit_scale() -> [f64; 3] {
    [1.0; 3]
}

impl MachineSeed {
    fn new(id: &str, name: &str, kind: MachineKind, temp: f64, position: [f64; 3]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            temp,
            status: Status::Ok,
            position,
            rotation: [0.0; 3],
            scale: [1.1; 3],
        }
    }

    /// Build the live machine, stamped with `now`.
    pub fn to_machine(&self, now: DateTime<Utc>) -> Machine {
        Machine::new(self.id.clone(), self.name.clone(), self.kind, self.temp)
            .with_status(self.status)
            .with_placement(Placement {
                position: self.position,
                rotation: self.rotation,
                scale: self.scale,
            })
            .with_last_update(now)
    }
}

/// The three-station demo line.
pub fn default_fleet() -> Vec<MachineSeed> {
    vec![
        MachineSeed::new("M-A", "Injection Molder A", MachineKind::Injection, 65.0, [7.0, 0.0, 0.0]),
        MachineSeed::new("M-B", "CNC Machine B", MachineKind::Cnc, 72.0, [-7.0, 0.0, 0.0]),
        MachineSeed::new("M-C", "Assembly Line C", MachineKind::Assembly, 58.0, [0.0, 0.3, 3.0]),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_on_start: false,
            simulation: SimulationConfig::default(),
            thresholds: Thresholds::default(),
            uptime_interval_ms: 1000,
            machines: default_fleet(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("FLOORWATCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder.add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }

        let sim = &self.simulation;
        if sim.interval_ms == 0 {
            bail!("simulation.interval_ms must be positive");
        }
        if self.uptime_interval_ms == 0 {
            bail!("uptime_interval_ms must be positive");
        }
        if !sim.min_temp.is_finite() || !sim.max_temp.is_finite() || sim.min_temp > sim.max_temp {
            bail!(
                "simulation.min_temp ({}) must not exceed simulation.max_temp ({})",
                sim.min_temp,
                sim.max_temp
            );
        }
        if !(0.0..=1.0).contains(&sim.anomaly_probability) {
            bail!(
                "simulation.anomaly_probability must be within [0, 1], got {}",
                sim.anomaly_probability
            );
        }
        if !sim.noise_amplitude.is_finite() || sim.noise_amplitude < 0.0 {
            bail!("simulation.noise_amplitude must be a non-negative number");
        }
        let t = &self.thresholds;
        if !t.warn_above.is_finite() || !t.alarm_above.is_finite() || t.warn_above >= t.alarm_above {
            bail!(
                "thresholds.warn_above ({}) must be below thresholds.alarm_above ({})",
                t.warn_above,
                t.alarm_above
            );
        }
        if let Some(seed) = self.machines.iter().find(|m| !m.temp.is_finite()) {
            bail!("machine {} has a non-finite temperature", seed.id);
        }
        Ok(())
    }

    pub fn uptime_interval(&self) -> Duration {
        Duration::from_millis(self.uptime_interval_ms)
    }

    /// Live machines for the configured fleet, all stamped with `now`.
    pub fn fleet(&self, now: DateTime<Utc>) -> Vec<Machine> {
        self.machines.iter().map(|seed| seed.to_machine(now)).collect()
    }
}
