//! The loaded, immutable scenario and its read-only queries.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ts_core::StepClock;

// ── Component types ───────────────────────────────────────────────────────────

/// Parameters of the (first) `SIMULATION` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParameters {
    pub id: String,
    /// Start, end, and step length of the simulated window.
    pub clock: StepClock,
    pub date: Option<String>,
    pub seed: Option<u64>,
}

impl SimulationParameters {
    /// Step length in seconds.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.clock.step_length
    }
}

/// Car-following parameters of a vehicle type (triangular fundamental
/// diagram).  Absent attributes stay `None`; the engine applies its defaults.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CarFollowing {
    /// Congestion wave speed, m/s (negative).
    pub w: Option<f64>,
    /// Jam density, veh/m.
    pub kx: Option<f64>,
    /// Free-flow speed, m/s.
    pub vx: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleType {
    pub id: String,
    pub car_following: CarFollowing,
}

/// A named set of links.
#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    pub id: String,
    pub links: Vec<String>,
}

impl Zone {
    pub fn contains(&self, link: &str) -> bool {
        self.links.iter().any(|l| l == link)
    }

    /// Space-separated link list, the form the engine expects for zone calls.
    pub fn link_list(&self) -> String {
        self.links.join(" ")
    }
}

// ── ScenarioDescriptor ────────────────────────────────────────────────────────

/// Immutable view of a scenario document.
///
/// All id collections keep document order and drop duplicates (first
/// occurrence wins).  Every link referenced by a zone is guaranteed to exist
/// in [`links`](Self::links); the loader rejects documents that break this.
///
/// Do not construct directly; use [`ScenarioLoader`][crate::ScenarioLoader].
#[derive(Clone, Debug)]
pub struct ScenarioDescriptor {
    pub(crate) path: PathBuf,
    pub(crate) simulation: SimulationParameters,
    pub(crate) vehicle_types: Vec<VehicleType>,
    pub(crate) endpoints: Vec<String>,
    pub(crate) links: Vec<String>,
    pub(crate) link_index: HashSet<String>,
    pub(crate) sensor_zones: Vec<Zone>,
    pub(crate) termination_zones: Vec<Zone>,
    pub(crate) max_steps: Option<u64>,
}

impl ScenarioDescriptor {
    /// Path the document was loaded from.  In-memory documents report the
    /// placeholder path given to the loader.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Simulation window ─────────────────────────────────────────────────

    pub fn simulation(&self) -> &SimulationParameters {
        &self.simulation
    }

    pub fn clock(&self) -> &StepClock {
        &self.simulation.clock
    }

    /// `floor((end - start) / step_length)`, clamped to the loader's
    /// `max_steps` when one was configured.
    pub fn step_count(&self) -> u64 {
        self.simulation.clock.capped_step_count(self.max_steps)
    }

    pub fn max_steps(&self) -> Option<u64> {
        self.max_steps
    }

    // ── Vehicle types ─────────────────────────────────────────────────────

    pub fn vehicle_types(&self) -> &[VehicleType] {
        &self.vehicle_types
    }

    pub fn vehicle_type(&self, id: &str) -> Option<&VehicleType> {
        self.vehicle_types.iter().find(|t| t.id == id)
    }

    pub fn has_vehicle_type(&self, id: &str) -> bool {
        self.vehicle_type(id).is_some()
    }

    // ── Network ───────────────────────────────────────────────────────────

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn has_endpoint(&self, id: &str) -> bool {
        self.endpoints.iter().any(|e| e == id)
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    #[inline]
    pub fn has_link(&self, id: &str) -> bool {
        self.link_index.contains(id)
    }

    // ── Zones ─────────────────────────────────────────────────────────────

    /// MFD sensor zones in document order.
    pub fn sensor_zones(&self) -> &[Zone] {
        &self.sensor_zones
    }

    pub fn sensor_zone(&self, id: &str) -> Option<&Zone> {
        self.sensor_zones.iter().find(|z| z.id == id)
    }

    /// Ids of all MFD sensor zones.
    pub fn sensor_zone_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.sensor_zones.iter().map(|z| z.id.as_str())
    }

    pub fn termination_zones(&self) -> &[Zone] {
        &self.termination_zones
    }

    pub fn termination_zone(&self, id: &str) -> Option<&Zone> {
        self.termination_zones.iter().find(|z| z.id == id)
    }
}
