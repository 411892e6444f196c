//! Snapshot types produced by [`parse_step`][crate::parse_step].
//!
//! A snapshot is the whole observable state of the engine after one step.
//! It is replaced wholesale every step; nothing here keeps history.

use ts_core::{Position, VehicleId};

// ── Records ───────────────────────────────────────────────────────────────────

/// One vehicle's state as reported by a `TRAJ` entry.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub vehicle_type: String,
    /// Link (`tron`) the vehicle is currently on.
    pub link: String,
    /// Lane number, 1 = rightmost.
    pub lane: u16,
    /// Longitudinal position on the current link, m.
    pub position: f64,
    /// Absolute planar coordinates, m.
    pub coordinates: Position,
    /// Elevation, m.
    pub elevation: f64,
    /// Speed, m/s.
    pub speed: f64,
    /// Acceleration, m/s².
    pub acceleration: f64,
    /// Cumulative distance travelled since creation, m, when the engine
    /// reports it.
    pub travelled: Option<f64>,
    /// Vehicle directly ahead, if any.
    pub leader: Option<VehicleId>,
    /// `true` while the vehicle's motion is imposed by a drive command.
    pub driven: bool,
}

/// A vehicle injected into the network during this step.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreationEvent {
    pub id: VehicleId,
    pub origin: String,
    pub destination: String,
    pub vehicle_type: String,
}

/// A vehicle that left the network during this step.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExitEvent {
    pub id: VehicleId,
    pub destination: Option<String>,
    pub vehicle_type: Option<String>,
}

/// Vehicles waiting to enter at a network endpoint.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryQueue {
    pub endpoint: String,
    pub waiting: u32,
}

// ── StepSnapshot ──────────────────────────────────────────────────────────────

/// Parsed state of the network after one step.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepSnapshot {
    /// Simulated time, seconds (`val`).
    pub time: f64,
    /// Vehicle count as announced by the engine (`nbVeh`).  May differ from
    /// `vehicles().len()`: the engine counts before applying creations.
    pub reported_vehicle_count: u32,
    pub(crate) vehicles: Vec<VehicleRecord>,
    pub(crate) creations: Vec<CreationEvent>,
    pub(crate) exits: Vec<ExitEvent>,
    pub(crate) entry_queues: Vec<EntryQueue>,
}

impl StepSnapshot {
    /// A snapshot with no vehicles or events at `time`.
    ///
    /// Stands in for a step whose payload was unavailable or unparseable.
    pub fn empty(time: f64) -> Self {
        Self { time, ..Self::default() }
    }

    // ── Raw access ────────────────────────────────────────────────────────

    /// Vehicles in payload order.
    pub fn vehicles(&self) -> &[VehicleRecord] {
        &self.vehicles
    }

    pub fn creations(&self) -> &[CreationEvent] {
        &self.creations
    }

    pub fn exits(&self) -> &[ExitEvent] {
        &self.exits
    }

    pub fn entry_queues(&self) -> &[EntryQueue] {
        &self.entry_queues
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.iter().map(|v| v.id)
    }

    // ── Per-vehicle lookups ───────────────────────────────────────────────

    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleRecord> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.vehicle(id).is_some()
    }

    /// `true` if every id in `ids` is present.
    pub fn contains_all(&self, ids: &[VehicleId]) -> bool {
        ids.iter().all(|&id| self.contains(id))
    }

    pub fn link_of(&self, id: VehicleId) -> Option<&str> {
        self.vehicle(id).map(|v| v.link.as_str())
    }

    /// `true` if `id` is present and currently under a drive command.
    pub fn is_driven(&self, id: VehicleId) -> bool {
        self.vehicle(id).is_some_and(|v| v.driven)
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Ids of vehicles on `(link, lane)`, in payload order.
    pub fn vehicles_on_link(&self, link: &str, lane: u16) -> Vec<VehicleId> {
        self.vehicles
            .iter()
            .filter(|v| v.link == link && v.lane == lane)
            .map(|v| v.id)
            .collect()
    }

    /// `true` if `id` is on `link` (any lane).
    pub fn is_on_link(&self, id: VehicleId, link: &str) -> bool {
        self.link_of(id) == Some(link)
    }

    /// `(id, link)` pairs for every vehicle.
    pub fn link_map(&self) -> impl Iterator<Item = (VehicleId, &str)> + '_ {
        self.vehicles.iter().map(|v| (v.id, v.link.as_str()))
    }

    /// Vehicles ahead of `id` on its link and lane, nearest first.
    ///
    /// Empty if `id` is not in the snapshot.
    pub fn downstream_of(&self, id: VehicleId) -> Vec<VehicleId> {
        self.neighbours(id, |other, own| other > own, |a, b| a.total_cmp(&b))
    }

    /// Vehicles behind `id` on its link and lane, nearest first.
    pub fn upstream_of(&self, id: VehicleId) -> Vec<VehicleId> {
        self.neighbours(id, |other, own| other < own, |a, b| b.total_cmp(&a))
    }

    fn neighbours(
        &self,
        id:    VehicleId,
        keep:  impl Fn(f64, f64) -> bool,
        order: impl Fn(f64, f64) -> std::cmp::Ordering,
    ) -> Vec<VehicleId> {
        let Some(me) = self.vehicle(id) else {
            return vec![];
        };
        let mut found: Vec<&VehicleRecord> = self
            .vehicles
            .iter()
            .filter(|v| v.id != id && v.link == me.link && v.lane == me.lane)
            .filter(|v| keep(v.position, me.position))
            .collect();
        found.sort_by(|a, b| order(a.position, b.position));
        found.into_iter().map(|v| v.id).collect()
    }

    // ── Aggregates ────────────────────────────────────────────────────────

    /// Arithmetic mean speed of all vehicles, m/s.  `None` when empty.
    pub fn mean_speed(&self) -> Option<f64> {
        if self.vehicles.is_empty() {
            return None;
        }
        let sum: f64 = self.vehicles.iter().map(|v| v.speed).sum();
        Some(sum / self.vehicles.len() as f64)
    }
}
