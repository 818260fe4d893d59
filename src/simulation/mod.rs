//! Synthetic telemetry for when no live feed is connected.
//!
//! - [`policy`]: pure functions that turn a random source into readings
//! - [`SimulationEngine`]: the periodic writer that applies them to the registry

mod engine;
pub mod policy;

pub use engine::{SimulationEngine, SimulationState};
pub use policy::BaselineTable;

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Settings for the simulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time between ticks, in milliseconds.
    pub interval_ms: u64,
    /// Half-width of the uniform noise around each baseline, in °C.
    pub noise_amplitude: f64,
    /// Lower clamp for synthetic temperatures.
    pub min_temp: f64,
    /// Upper clamp for synthetic temperatures.
    pub max_temp: f64,
    /// Per-machine, per-tick chance of a forced ALARM.
    pub anomaly_probability: f64,
    /// Seed for the random source. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Baseline temperature per station kind.
    pub baselines: BaselineTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            noise_amplitude: 15.0,
            min_temp: 40.0,
            max_temp: 120.0,
            anomaly_probability: 0.05,
            seed: None,
            baselines: BaselineTable::default(),
        }
    }
}

impl SimulationConfig {
    /// Tick period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Build the random source this config asks for.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
