//! The machine registry - the single owner of live machine state.
//!
//! Every write goes through [`MachineRegistry::merge_update`],
//! [`MachineRegistry::merge_batch`] or [`MachineRegistry::replace_all`], each of
//! which holds one write lock for the whole call. Readers take
//! [`MachineRegistry::snapshot`], a copy made under the read lock, so they
//! never see a merge half-applied.

use std::collections::HashSet;
use std::sync::Arc;

use floorwatch_types::{Machine, MachinePatch, Thresholds};
use parking_lot::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::error::RegistryError;

/// What happened to each item of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids whose machine was updated.
    pub applied: Vec<String>,
    /// Ids with no matching machine; ignored.
    pub unknown: Vec<String>,
    /// Ids whose patch was invalid; the machine was left untouched.
    pub rejected: Vec<String>,
}

impl MergeReport {
    /// Number of machines updated.
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// True when nothing was updated.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Shared handle to the canonical, ordered machine collection.
///
/// Cloning is cheap; all clones see the same machines.
#[derive(Debug, Clone)]
pub struct MachineRegistry {
    machines: Arc<RwLock<Vec<Machine>>>,
    thresholds: Thresholds,
    clock: Arc<dyn Clock>,
}

impl MachineRegistry {
    /// Create a registry seeded with `machines`, in the given order.
    ///
    /// The set of ids is fixed from here on.
    pub fn new(
        machines: Vec<Machine>,
        thresholds: Thresholds,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for machine in &machines {
            if !seen.insert(machine.id.as_str()) {
                return Err(RegistryError::DuplicateId(machine.id.clone()));
            }
        }

        Ok(Self {
            machines: Arc::new(RwLock::new(machines)),
            thresholds,
            clock,
        })
    }

    /// Copy of the current machines, in registration order.
    pub fn snapshot(&self) -> Vec<Machine> {
        self.machines.read().clone()
    }

    /// Copy of one machine.
    pub fn get(&self, id: &str) -> Option<Machine> {
        self.machines.read().iter().find(|m| m.id == id).cloned()
    }

    /// Registered ids, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.machines.read().iter().map(|m| m.id.clone()).collect()
    }

    /// Number of registered machines.
    pub fn len(&self) -> usize {
        self.machines.read().len()
    }

    /// True when the registry holds no machines.
    pub fn is_empty(&self) -> bool {
        self.machines.read().is_empty()
    }

    /// Thresholds used to re-derive status when a patch carries only `temp`.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Apply one patch.
    pub fn merge_update(&self, patch: &MachinePatch) -> MergeReport {
        self.merge_batch(std::slice::from_ref(patch))
    }

    /// Apply a batch of patches under a single write lock.
    ///
    /// Each item succeeds or fails on its own:
    /// - unknown ids are ignored (never created),
    /// - a non-finite `temp` rejects that item without touching the machine,
    /// - otherwise only the present fields are applied and `lastUpdate` is
    ///   set to the merge time.
    ///
    /// A patch with `temp` but no `status` re-derives `status` from the new
    /// temperature using the registry thresholds. A patch with `status`
    /// applies it as given.
    pub fn merge_batch(&self, patches: &[MachinePatch]) -> MergeReport {
        let now = self.clock.now();
        let mut report = MergeReport::default();
        let mut machines = self.machines.write();

        for patch in patches {
            let Some(machine) = machines.iter_mut().find(|m| m.id == patch.id) else {
                debug!(id = %patch.id, "ignoring patch for unknown machine");
                report.unknown.push(patch.id.clone());
                continue;
            };

            if patch.temp.is_some_and(|t| !t.is_finite()) {
                debug!(id = %patch.id, temp = ?patch.temp, "rejecting patch with non-finite temperature");
                report.rejected.push(patch.id.clone());
                continue;
            }

            if let Some(temp) = patch.temp {
                machine.temp = temp;
            }
            match (patch.status, patch.temp) {
                (Some(status), _) => machine.status = status,
                (None, Some(temp)) => machine.status = self.thresholds.classify(temp),
                (None, None) => {}
            }
            machine.last_update = now;
            report.applied.push(patch.id.clone());
        }

        report
    }

    /// Replace every machine at once.
    ///
    /// The replacement must carry exactly the registered ids in registration
    /// order; otherwise nothing changes.
    pub fn replace_all(&self, replacement: Vec<Machine>) -> Result<(), RegistryError> {
        let mut machines = self.machines.write();

        let matches = machines.len() == replacement.len()
            && machines.iter().zip(&replacement).all(|(a, b)| a.id == b.id);
        if !matches {
            return Err(RegistryError::IdSetMismatch {
                expected: machines.iter().map(|m| m.id.clone()).collect(),
                actual: replacement.iter().map(|m| m.id.clone()).collect(),
            });
        }

        *machines = replacement;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use floorwatch_types::{MachineKind, Status};
    use std::time::Duration;

    fn seeded() -> (MachineRegistry, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let machines = vec![
            Machine::new("M-A", "Injection Molder A", MachineKind::Injection, 65.0).with_last_update(start),
            Machine::new("M-B", "CNC Machine B", MachineKind::Cnc, 72.0).with_last_update(start),
            Machine::new("M-C", "Assembly Line C", MachineKind::Assembly, 58.0).with_last_update(start),
        ];
        let registry = MachineRegistry::new(machines, Thresholds::default(), clock.clone()).unwrap();
        (registry, clock)
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let machines = vec![
            Machine::new("M-A", "A", MachineKind::Cnc, 60.0),
            Machine::new("M-A", "A again", MachineKind::Cnc, 60.0),
        ];
        let err = MachineRegistry::new(machines, Thresholds::default(), clock).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("M-A".to_string()));
    }

    #[test]
    fn test_temp_only_patch_rederives_status() {
        let (registry, clock) = seeded();
        clock.advance(Duration::from_secs(5));

        let report = registry.merge_update(&MachinePatch::new("M-B").temp(101.0));
        assert_eq!(report.applied, vec!["M-B".to_string()]);

        let b = registry.get("M-B").unwrap();
        assert_eq!(b.temp, 101.0);
        assert_eq!(b.status, Status::Alarm);
        assert_eq!(b.last_update, clock.now());
    }

    #[test]
    fn test_absent_fields_are_untouched() {
        let (registry, _clock) = seeded();
        let before = registry.snapshot();

        registry.merge_update(&MachinePatch::new("M-A").status(Status::Warn));

        let after = registry.get("M-A").unwrap();
        assert_eq!(after.status, Status::Warn);
        assert_eq!(after.temp, before[0].temp);
        assert_eq!(after.name, before[0].name);
        assert_eq!(after.kind, before[0].kind);
        assert_eq!(after.placement, before[0].placement);
    }

    #[test]
    fn test_explicit_status_wins_over_threshold() {
        let (registry, _clock) = seeded();
        registry.merge_update(&MachinePatch::new("M-C").temp(110.0).status(Status::Ok));
        let c = registry.get("M-C").unwrap();
        assert_eq!(c.temp, 110.0);
        assert_eq!(c.status, Status::Ok);
    }

    #[test]
    fn test_empty_patch_still_refreshes_last_update() {
        let (registry, clock) = seeded();
        let before = registry.get("M-A").unwrap();
        clock.advance(Duration::from_secs(30));

        let report = registry.merge_update(&MachinePatch::new("M-A"));
        assert_eq!(report.applied_count(), 1);

        let after = registry.get("M-A").unwrap();
        assert_eq!(after.temp, before.temp);
        assert_eq!(after.status, before.status);
        assert!(after.last_update > before.last_update);
    }

    #[test]
    fn test_unknown_ids_are_ignored_per_item() {
        let (registry, _clock) = seeded();
        let report = registry.merge_batch(&[
            MachinePatch::new("M-Z").temp(99.0),
            MachinePatch::new("M-A").temp(70.0),
        ]);

        assert_eq!(report.unknown, vec!["M-Z".to_string()]);
        assert_eq!(report.applied, vec!["M-A".to_string()]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("M-Z").is_none());
        assert_eq!(registry.get("M-A").unwrap().temp, 70.0);
    }

    #[test]
    fn test_non_finite_temp_is_rejected_without_mutation() {
        let (registry, clock) = seeded();
        let before = registry.get("M-B").unwrap();
        clock.advance(Duration::from_secs(1));

        let report = registry.merge_batch(&[
            MachinePatch::new("M-B").temp(f64::NAN),
            MachinePatch::new("M-C").temp(61.0),
        ]);

        assert_eq!(report.rejected, vec!["M-B".to_string()]);
        assert_eq!(report.applied, vec!["M-C".to_string()]);
        assert_eq!(registry.get("M-B").unwrap(), before);
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let (registry, _clock) = seeded();
        registry.merge_update(&MachinePatch::new("M-C").temp(90.0));
        let ids: Vec<_> = registry.snapshot().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["M-A", "M-B", "M-C"]);
    }

    #[test]
    fn test_replace_all_requires_same_ids() {
        let (registry, _clock) = seeded();

        let mut replacement = registry.snapshot();
        replacement.pop();
        assert!(matches!(
            registry.replace_all(replacement),
            Err(RegistryError::IdSetMismatch { .. })
        ));

        let mut reordered = registry.snapshot();
        reordered.swap(0, 1);
        assert!(registry.replace_all(reordered).is_err());

        let mut replacement = registry.snapshot();
        replacement[1].temp = 88.0;
        replacement[1].status = Status::Warn;
        registry.replace_all(replacement).unwrap();
        assert_eq!(registry.get("M-B").unwrap().status, Status::Warn);
    }

    #[test]
    fn test_concurrent_readers_see_whole_batches() {
        let (registry, _clock) = seeded();
        let writer = registry.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..500 {
                let t = 60.0 + (i % 20) as f64;
                writer.merge_batch(&[
                    MachinePatch::new("M-A").temp(t),
                    MachinePatch::new("M-B").temp(t),
                    MachinePatch::new("M-C").temp(t),
                ]);
            }
        });

        for _ in 0..500 {
            let snapshot = registry.snapshot();
            let stamps: HashSet<_> = snapshot.iter().map(|m| m.temp.to_bits()).collect();
            // Either the seed (three distinct temps) or one whole batch (one temp)
            assert!(stamps.len() == 1 || stamps.len() == 3);
        }
        handle.join().unwrap();
    }
}
