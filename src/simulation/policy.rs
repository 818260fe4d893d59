//! Synthetic reading policy.
//!
//! Each step is a separate function so it can be tested on its own:
//! baseline lookup, bounded noise, threshold derivation (see
//! [`Thresholds::classify`]), then the anomaly override.
//!
//! Random draws happen in a fixed order: for each machine in registry order,
//! one draw for the noise and one roll for the anomaly. The same seed
//! therefore always produces the same trajectory.

use std::collections::BTreeMap;

use floorwatch_types::{Machine, MachineKind, MachinePatch, Status, Thresholds};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::SimulationConfig;

/// Baseline for any kind missing from the table.
pub const FALLBACK_BASELINE: f64 = 65.0;

const DEFAULT_BASELINES: [(MachineKind, f64); 3] = [
    (MachineKind::Injection, 65.0),
    (MachineKind::Cnc, 70.0),
    (MachineKind::Assembly, 60.0),
];

/// Baseline temperature per station kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineTable {
    /// Used for kinds with no entry in `by_kind`.
    pub fallback: f64,
    pub by_kind: BTreeMap<MachineKind, f64>,
}

impl Default for BaselineTable {
    fn default() -> Self {
        Self {
            fallback: FALLBACK_BASELINE,
            by_kind: DEFAULT_BASELINES.into_iter().collect(),
        }
    }
}

impl BaselineTable {
    /// Baseline temperature for `kind`.
    pub fn baseline(&self, kind: MachineKind) -> f64 {
        self.by_kind.get(&kind).copied().unwrap_or(self.fallback)
    }

    /// Set the baseline for one kind.
    pub fn with(mut self, kind: MachineKind, baseline: f64) -> Self {
        self.by_kind.insert(kind, baseline);
        self
    }
}

/// Draw a temperature symmetric around `baseline`, clamped to `[min, max]`.
///
/// The offset is uniform in `[-amplitude, amplitude)`.
pub fn draw_temperature<R: Rng + ?Sized>(
    rng: &mut R,
    baseline: f64,
    amplitude: f64,
    min: f64,
    max: f64,
) -> f64 {
    let offset = (rng.gen::<f64>() - 0.5) * 2.0 * amplitude;
    (baseline + offset).max(min).min(max)
}

/// Force ALARM when `roll` falls under `probability`, regardless of `status`.
///
/// Models transient faults that have nothing to do with the reading.
pub fn apply_anomaly_override(status: Status, roll: f64, probability: f64) -> Status {
    if roll < probability {
        Status::Alarm
    } else {
        status
    }
}

/// Produce one synthetic reading for `machine`.
pub fn synthesize<R: Rng + ?Sized>(
    rng: &mut R,
    machine: &Machine,
    config: &SimulationConfig,
    thresholds: &Thresholds,
) -> MachinePatch {
    let baseline = config.baselines.baseline(machine.kind);
    let temp = draw_temperature(rng, baseline, config.noise_amplitude, config.min_temp, config.max_temp);

    let status = thresholds.classify(temp);
    let status = apply_anomaly_override(status, rng.gen::<f64>(), config.anomaly_probability);

    MachinePatch::new(machine.id.clone()).temp(temp).status(status)
}

/// Produce one tick's worth of readings, one per machine, in order.
pub fn synthesize_tick<R: Rng + ?Sized>(
    rng: &mut R,
    machines: &[Machine],
    config: &SimulationConfig,
    thresholds: &Thresholds,
) -> Vec<MachinePatch> {
    machines
        .iter()
        .map(|machine| synthesize(rng, machine, config, thresholds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fleet() -> Vec<Machine> {
        vec![
            Machine::new("M-A", "Injection Molder A", MachineKind::Injection, 65.0),
            Machine::new("M-B", "CNC Machine B", MachineKind::Cnc, 72.0),
            Machine::new("M-C", "Assembly Line C", MachineKind::Assembly, 58.0),
        ]
    }

    #[test]
    fn test_default_baselines() {
        let table = BaselineTable::default();
        assert_eq!(table.baseline(MachineKind::Injection), 65.0);
        assert_eq!(table.baseline(MachineKind::Cnc), 70.0);
        assert_eq!(table.baseline(MachineKind::Assembly), 60.0);
    }

    #[test]
    fn test_missing_kind_uses_fallback() {
        let mut table = BaselineTable::default();
        table.by_kind.remove(&MachineKind::Cnc);
        assert_eq!(table.baseline(MachineKind::Cnc), FALLBACK_BASELINE);

        let table = table.with(MachineKind::Cnc, 90.0);
        assert_eq!(table.baseline(MachineKind::Cnc), 90.0);
    }

    #[test]
    fn test_draw_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            // Amplitude far larger than the band so clamping is exercised
            let t = draw_temperature(&mut rng, 80.0, 200.0, 40.0, 120.0);
            assert!((40.0..=120.0).contains(&t), "out of bounds: {}", t);
        }
    }

    #[test]
    fn test_draw_extremes_clamp() {
        // StepRng(0, 0) always yields 0.0 from gen::<f64>()
        let mut low = StepRng::new(0, 0);
        assert_eq!(draw_temperature(&mut low, 45.0, 15.0, 40.0, 120.0), 40.0);

        let mut high = StepRng::new(u64::MAX, 0);
        let t = draw_temperature(&mut high, 110.0, 15.0, 40.0, 120.0);
        assert_eq!(t, 120.0);
    }

    #[test]
    fn test_draw_is_symmetric_around_baseline() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..1_000 {
            let t = draw_temperature(&mut rng, 65.0, 15.0, 40.0, 120.0);
            assert!((50.0..80.0).contains(&t));
        }
    }

    #[test]
    fn test_anomaly_override() {
        assert_eq!(apply_anomaly_override(Status::Ok, 0.01, 0.05), Status::Alarm);
        assert_eq!(apply_anomaly_override(Status::Warn, 0.049, 0.05), Status::Alarm);
        assert_eq!(apply_anomaly_override(Status::Ok, 0.05, 0.05), Status::Ok);
        assert_eq!(apply_anomaly_override(Status::Warn, 0.9, 0.05), Status::Warn);
        // A probability of zero never fires
        assert_eq!(apply_anomaly_override(Status::Ok, 0.0, 0.0), Status::Ok);
    }

    #[test]
    fn test_tick_matches_replayed_draws() {
        let config = SimulationConfig::default();
        let thresholds = Thresholds::default();
        let machines = fleet();

        let mut rng = StdRng::seed_from_u64(2024);
        let patches = synthesize_tick(&mut rng, &machines, &config, &thresholds);

        // Replay the same draws by hand
        let mut replay = StdRng::seed_from_u64(2024);
        for (machine, patch) in machines.iter().zip(&patches) {
            let baseline = config.baselines.baseline(machine.kind);
            let noise: f64 = replay.gen();
            let roll: f64 = replay.gen();
            let temp = (baseline + (noise - 0.5) * 2.0 * config.noise_amplitude).max(40.0).min(120.0);
            let status = if roll < config.anomaly_probability {
                Status::Alarm
            } else {
                thresholds.classify(temp)
            };

            assert_eq!(patch.id, machine.id);
            assert_eq!(patch.temp, Some(temp));
            assert_eq!(patch.status, Some(status));
        }
    }

    #[test]
    fn test_status_follows_thresholds_without_override() {
        let config = SimulationConfig {
            anomaly_probability: 0.0,
            noise_amplitude: 60.0,
            ..SimulationConfig::default()
        };
        let thresholds = Thresholds::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            for patch in synthesize_tick(&mut rng, &fleet(), &config, &thresholds) {
                let temp = patch.temp.unwrap();
                assert_eq!(patch.status, Some(thresholds.classify(temp)));
            }
        }
    }

    #[test]
    fn test_certain_anomaly_forces_alarm() {
        let config = SimulationConfig {
            anomaly_probability: 1.0,
            ..SimulationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let patches = synthesize_tick(&mut rng, &fleet(), &config, &Thresholds::default());
        assert!(patches.iter().all(|p| p.status == Some(Status::Alarm)));
    }
}
