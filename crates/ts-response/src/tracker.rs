//! Vehicle identity across steps.
//!
//! The engine reuses a [`VehicleId`] once its vehicle has left the network.
//! [`VehicleTracker`] turns the per-snapshot ids into `(id, generation)`
//! pairs that stay unique for the whole run: a new generation starts when an
//! id reappears after a gap, when a creation event names an id that is still
//! active, or when the vehicle type under an id changes.

use std::collections::BTreeMap;

use tracing::trace;
use ts_core::{StepIndex, VehicleId};

use crate::StepSnapshot;

/// The span during which one physical vehicle carried an id.
#[derive(Clone, Debug, PartialEq)]
pub struct Lifecycle {
    pub id: VehicleId,
    /// 0 for the first vehicle seen under `id`, incremented on every reuse.
    pub generation: u32,
    pub first_seen: StepIndex,
    pub last_seen: StepIndex,
    pub vehicle_type: String,
}

/// What changed between two consecutive observations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackerUpdate {
    /// Lifecycles that started at this step.
    pub entered: Vec<(VehicleId, u32)>,
    /// Lifecycles that ended before this step.
    pub left: Vec<Lifecycle>,
}

/// Follows ids from snapshot to snapshot.
#[derive(Debug, Default)]
pub struct VehicleTracker {
    active: BTreeMap<VehicleId, Lifecycle>,
    /// Next generation to hand out per id.
    generations: BTreeMap<VehicleId, u32>,
    retired: usize,
}

impl VehicleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the snapshot of step `step` into the tracker.
    pub fn observe(&mut self, step: StepIndex, snapshot: &StepSnapshot) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();

        // Vehicles absent from this snapshot, plus ids re-created while active.
        let gone: Vec<VehicleId> = self
            .active
            .keys()
            .copied()
            .filter(|&id| !snapshot.contains(id) || snapshot.creations().iter().any(|c| c.id == id))
            .collect();
        for id in gone {
            if let Some(life) = self.active.remove(&id) {
                update.left.push(life);
            }
        }

        for vehicle in snapshot.vehicles() {
            if let Some(life) = self.active.get_mut(&vehicle.id) {
                if life.vehicle_type == vehicle.vehicle_type {
                    life.last_seen = step;
                    continue;
                }
                // Same id, different vehicle.
                if let Some(life) = self.active.remove(&vehicle.id) {
                    update.left.push(life);
                }
            }
            let next = self.generations.entry(vehicle.id).or_insert(0);
            let generation = *next;
            *next += 1;
            trace!(vehicle = vehicle.id.get(), generation, "vehicle entered");
            self.active.insert(vehicle.id, Lifecycle {
                id: vehicle.id,
                generation,
                first_seen: step,
                last_seen: step,
                vehicle_type: vehicle.vehicle_type.clone(),
            });
            update.entered.push((vehicle.id, generation));
        }

        self.retired += update.left.len();
        update
    }

    /// Lifecycles currently in the network, ordered by id.
    pub fn active(&self) -> impl Iterator<Item = &Lifecycle> + '_ {
        self.active.values()
    }

    /// Current generation of `id`, if it is active.
    pub fn generation(&self, id: VehicleId) -> Option<u32> {
        self.active.get(&id).map(|l| l.generation)
    }

    /// Step at which the current holder of `id` first appeared.
    pub fn first_seen(&self, id: VehicleId) -> Option<StepIndex> {
        self.active.get(&id).map(|l| l.first_seen)
    }

    /// Number of lifecycles that have ended so far.
    pub fn retired_count(&self) -> usize {
        self.retired
    }
}
