//! The simulation engine - a periodic synthetic writer.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use tracing::{debug, info};

use super::{policy, SimulationConfig};
use crate::clock::{spawn_periodic, TimerHandle};
use crate::registry::{MachineRegistry, MergeReport};

/// Whether the engine is currently writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Active,
    Inactive,
}

/// Writes synthetic readings into the registry on a fixed cadence while active.
///
/// The state, the random source and the timer sit behind one mutex, and every
/// tick checks the state under it. Once the engine is deactivated, no tick can
/// touch the registry until it is activated again.
///
/// Only the telemetry ingestor switches the engine on and off, so outside
/// the crate a handle is read-only: [`state`](Self::state),
/// [`is_active`](Self::is_active) and [`ticks`](Self::ticks).
///
/// Cloning gives another handle to the same engine.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    registry: MachineRegistry,
    config: SimulationConfig,
    core: Mutex<Core>,
}

#[derive(Debug)]
struct Core {
    state: SimulationState,
    rng: StdRng,
    timer: Option<TimerHandle>,
    ticks: u64,
}

impl SimulationEngine {
    /// Create the engine and start it in the active state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(registry: MachineRegistry, config: SimulationConfig, rng: StdRng) -> Self {
        let engine = Self {
            shared: Arc::new(Shared {
                registry,
                config,
                core: Mutex::new(Core {
                    state: SimulationState::Inactive,
                    rng,
                    timer: None,
                    ticks: 0,
                }),
            }),
        };
        engine.activate();
        engine
    }

    /// Start ticking. Returns false if already active.
    pub(crate) fn activate(&self) -> bool {
        let mut core = self.shared.core.lock();
        if core.state == SimulationState::Active {
            return false;
        }

        let weak = Arc::downgrade(&self.shared);
        core.timer = Some(spawn_periodic(self.shared.config.interval(), move || {
            if let Some(shared) = weak.upgrade() {
                shared.tick();
            }
        }));
        core.state = SimulationState::Active;

        info!(interval_ms = self.shared.config.interval_ms, "simulation active");
        true
    }

    /// Stop ticking. Returns false if already inactive.
    pub(crate) fn deactivate(&self) -> bool {
        let mut core = self.shared.core.lock();
        if core.state == SimulationState::Inactive {
            return false;
        }

        core.state = SimulationState::Inactive;
        if let Some(timer) = core.timer.take() {
            timer.cancel();
        }

        info!(ticks = core.ticks, "simulation inactive");
        true
    }

    /// Current state.
    pub fn state(&self) -> SimulationState {
        self.shared.core.lock().state
    }

    /// True while the engine is the active writer.
    pub fn is_active(&self) -> bool {
        self.state() == SimulationState::Active
    }

    /// Run one tick right now, outside the timer.
    ///
    /// Returns `None` (and writes nothing) when inactive.
    #[cfg(test)]
    pub(crate) fn tick_now(&self) -> Option<MergeReport> {
        self.shared.tick()
    }

    /// Number of ticks applied so far.
    pub fn ticks(&self) -> u64 {
        self.shared.core.lock().ticks
    }

    /// The settings this engine runs with.
    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }
}

impl Shared {
    fn tick(&self) -> Option<MergeReport> {
        let mut core = self.core.lock();
        if core.state != SimulationState::Active {
            return None;
        }

        let machines = self.registry.snapshot();
        let thresholds = self.registry.thresholds();
        let patches = policy::synthesize_tick(&mut core.rng, &machines, &self.config, &thresholds);
        let report = self.registry.merge_batch(&patches);

        core.ticks += 1;
        debug!(tick = core.ticks, applied = report.applied_count(), "simulation tick");
        Some(report)
    }
}
