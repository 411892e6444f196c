//! Built-in monitors.

use std::collections::{HashMap, HashSet};

use ts_core::{Position, StepIndex, VehicleId};
use ts_response::StepSnapshot;
use ts_session::MFD_FLOOR_SPEED;

use crate::{Monitor, MonitorError, MonitorResult, Sample};

fn link_set<I, S>(links: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    links.into_iter().map(Into::into).collect()
}

fn x(step: StepIndex) -> f64 {
    step.get() as f64
}

/// Ids handed to a new vehicle in this snapshot.
fn created_ids(snapshot: &StepSnapshot) -> HashSet<VehicleId> {
    snapshot.creations().iter().map(|c| c.id).collect()
}

// ── Accumulation ──────────────────────────────────────────────────────────────

/// Announced vehicle count per step.
#[derive(Debug, Default)]
pub struct Accumulation;

impl Monitor for Accumulation {
    fn title(&self) -> &str {
        "Accumulation"
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", "VEH number")
    }

    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, _series: usize) -> MonitorResult<Option<Sample>> {
        Ok(Some(Sample::Point(x(step), snapshot.reported_vehicle_count as f64)))
    }
}

// ── MFD ───────────────────────────────────────────────────────────────────────

/// Accumulation against production (mean speed × accumulation).
#[derive(Debug, Default)]
pub struct Mfd;

impl Monitor for Mfd {
    fn title(&self) -> &str {
        "MFD"
    }

    fn axes(&self) -> (&str, &str) {
        ("Accumulation", "Production")
    }

    fn update(&mut self, _step: StepIndex, snapshot: &StepSnapshot, _series: usize) -> MonitorResult<Option<Sample>> {
        let count = snapshot.reported_vehicle_count as f64;
        Ok(snapshot.mean_speed().map(|speed| Sample::Point(count, speed * count)))
    }
}

// ── Per-vehicle indicators ────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Indicator {
    Speed,
    Acceleration,
    /// Cumulative straight-line distance between successive positions.
    Distance,
}

impl Indicator {
    fn label(self) -> &'static str {
        match self {
            Indicator::Speed => "speed",
            Indicator::Acceleration => "acceleration",
            Indicator::Distance => "distance",
        }
    }
}

/// One indicator for a fixed list of vehicles, one series per vehicle.
///
/// A vehicle absent from the snapshot yields no sample.  The distance
/// indicator reports 0 the first time a vehicle is seen, and starts over
/// when the id goes missing or is named by a creation event, since the id
/// may then belong to another vehicle.
#[derive(Debug)]
pub struct VehicleIndicator {
    title:     String,
    ids:       Vec<VehicleId>,
    indicator: Indicator,
    travelled: Vec<f64>,
    last:      Vec<Option<Position>>,
}

impl VehicleIndicator {
    pub fn new(ids: Vec<VehicleId>, indicator: Indicator) -> Self {
        let n = ids.len();
        Self {
            title: format!("VEH {}", indicator.label()),
            ids,
            indicator,
            travelled: vec![0.0; n],
            last: vec![None; n],
        }
    }

    fn forget(&mut self, series: usize) {
        self.last[series] = None;
        self.travelled[series] = 0.0;
    }
}

impl Monitor for VehicleIndicator {
    fn title(&self) -> &str {
        &self.title
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", self.indicator.label())
    }

    fn series(&self) -> Vec<String> {
        self.ids.iter().map(|id| id.get().to_string()).collect()
    }

    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, series: usize) -> MonitorResult<Option<Sample>> {
        let Some(&id) = self.ids.get(series) else {
            return Ok(None);
        };
        let Some(vehicle) = snapshot.vehicle(id) else {
            self.forget(series);
            return Ok(None);
        };
        if snapshot.creations().iter().any(|c| c.id == id) {
            self.forget(series);
        }
        let y = match self.indicator {
            Indicator::Speed => vehicle.speed,
            Indicator::Acceleration => vehicle.acceleration,
            Indicator::Distance => {
                let here = vehicle.coordinates;
                if let Some(previous) = self.last[series] {
                    self.travelled[series] += previous.distance_to(here);
                }
                self.last[series] = Some(here);
                self.travelled[series]
            }
        };
        Ok(Some(Sample::Point(x(step), y)))
    }
}

// ── Zone totals ───────────────────────────────────────────────────────────────

/// Time spent by vehicles on a set of links, summed over the run.
///
/// Only vehicles seen on the zone at two consecutive sampled steps
/// contribute.  A vehicle leaving the zone is forgotten, and an id named by
/// a creation event counts as a new vehicle.
#[derive(Debug)]
pub struct TotalTravelTime {
    zone:   HashSet<String>,
    period: u64,
    seen:   HashMap<VehicleId, f64>,
    total:  f64,
}

impl TotalTravelTime {
    pub fn new<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { zone: link_set(links), period: 1, seen: HashMap::new(), total: 0.0 }
    }

    /// Sample only every `period` steps.
    pub fn aggregation_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    fn accumulate(&mut self, snapshot: &StepSnapshot) {
        let now = snapshot.time;
        let created = created_ids(snapshot);
        let mut inside = HashSet::new();
        for vehicle in snapshot.vehicles().iter().filter(|v| self.zone.contains(&v.link)) {
            let previous = self.seen.insert(vehicle.id, now);
            if let (Some(then), false) = (previous, created.contains(&vehicle.id)) {
                self.total += now - then;
            }
            inside.insert(vehicle.id);
        }
        self.seen.retain(|id, _| inside.contains(id));
    }
}

impl Monitor for TotalTravelTime {
    fn title(&self) -> &str {
        "Total Travel Time"
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", "Time")
    }

    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, _series: usize) -> MonitorResult<Option<Sample>> {
        if !step.is_boundary(self.period) {
            return Ok(None);
        }
        self.accumulate(snapshot);
        Ok(Some(Sample::Point(x(step), self.total)))
    }
}

/// Distance covered by vehicles on a set of links, summed over the run.
///
/// Same bookkeeping as [`TotalTravelTime`], with straight-line distance
/// between sampled positions.
#[derive(Debug)]
pub struct TotalTravelDistance {
    zone:   HashSet<String>,
    period: u64,
    seen:   HashMap<VehicleId, Position>,
    total:  f64,
}

impl TotalTravelDistance {
    pub fn new<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { zone: link_set(links), period: 1, seen: HashMap::new(), total: 0.0 }
    }

    pub fn aggregation_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    fn accumulate(&mut self, snapshot: &StepSnapshot) {
        let created = created_ids(snapshot);
        let mut inside = HashSet::new();
        for vehicle in snapshot.vehicles().iter().filter(|v| self.zone.contains(&v.link)) {
            let previous = self.seen.insert(vehicle.id, vehicle.coordinates);
            if let (Some(then), false) = (previous, created.contains(&vehicle.id)) {
                self.total += then.distance_to(vehicle.coordinates);
            }
            inside.insert(vehicle.id);
        }
        self.seen.retain(|id, _| inside.contains(id));
    }
}

impl Monitor for TotalTravelDistance {
    fn title(&self) -> &str {
        "Total Travel Distance"
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", "Distance")
    }

    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, _series: usize) -> MonitorResult<Option<Sample>> {
        if !step.is_boundary(self.period) {
            return Ok(None);
        }
        self.accumulate(snapshot);
        Ok(Some(Sample::Point(x(step), self.total)))
    }
}

/// Space-mean speed on a set of links: total distance over total time.
///
/// Fails while no time has accumulated; the manager then records
/// [`MFD_FLOOR_SPEED`].
#[derive(Debug)]
pub struct ZoneSpeed {
    time:     TotalTravelTime,
    distance: TotalTravelDistance,
}

impl ZoneSpeed {
    pub fn new<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let zone: Vec<String> = links.into_iter().map(Into::into).collect();
        Self { time: TotalTravelTime::new(zone.clone()), distance: TotalTravelDistance::new(zone) }
    }
}

impl Monitor for ZoneSpeed {
    fn title(&self) -> &str {
        "Zone Speed"
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", "Speed")
    }

    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, _series: usize) -> MonitorResult<Option<Sample>> {
        self.time.accumulate(snapshot);
        self.distance.accumulate(snapshot);
        if self.time.total() <= 0.0 {
            return Err(MonitorError::NoTravelTime);
        }
        Ok(Some(Sample::Point(x(step), self.distance.total() / self.time.total())))
    }

    fn fallback(&self, step: StepIndex, _series: usize) -> Option<Sample> {
        Some(Sample::Point(x(step), MFD_FLOOR_SPEED))
    }
}

// ── Flux ──────────────────────────────────────────────────────────────────────

/// Vehicles entering (series 0) and leaving the network from (series 1) a
/// set of links, counted per aggregation period.
///
/// A vehicle is counted in once, when first seen on the links, and out once,
/// when it disappears from the network.  Driving off the links onto the
/// rest of the network is neither: the vehicle stays counted in until it
/// leaves the network, so coming back onto the links is not a new entry.
/// An id named by a creation event while still counted in belongs to a new
/// vehicle: the old one is counted out and the new one may be counted in.
#[derive(Debug)]
pub struct Flux {
    zone:    HashSet<String>,
    period:  u64,
    inflow:  u64,
    outflow: u64,
    inside:  HashSet<VehicleId>,
}

impl Flux {
    pub fn new<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { zone: link_set(links), period: 1, inflow: 0, outflow: 0, inside: HashSet::new() }
    }

    pub fn aggregation_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }
}

impl Monitor for Flux {
    fn title(&self) -> &str {
        "Flux"
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", "Number")
    }

    fn series(&self) -> Vec<String> {
        vec!["InFlux".to_owned(), "OutFlux".to_owned()]
    }

    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, series: usize) -> MonitorResult<Option<Sample>> {
        let boundary = step.is_boundary(self.period);
        let counter = if series == 0 {
            for created in snapshot.creations() {
                if self.inside.remove(&created.id) {
                    self.outflow += 1;
                }
            }
            for vehicle in snapshot.vehicles().iter().filter(|v| self.zone.contains(&v.link)) {
                if self.inside.insert(vehicle.id) {
                    self.inflow += 1;
                }
            }
            &mut self.inflow
        } else {
            let before = self.inside.len();
            self.inside.retain(|&id| snapshot.contains(id));
            self.outflow += (before - self.inside.len()) as u64;
            &mut self.outflow
        };
        let value = *counter;
        if !boundary {
            return Ok(None);
        }
        *counter = 0;
        Ok(Some(Sample::Point(x(step), value as f64)))
    }
}

// ── Flow ──────────────────────────────────────────────────────────────────────

/// Positions of every vehicle, as a point cloud.
#[derive(Debug, Default)]
pub struct Flow;

impl Monitor for Flow {
    fn title(&self) -> &str {
        "Flow"
    }

    fn axes(&self) -> (&str, &str) {
        ("X", "Y")
    }

    fn update(&mut self, _step: StepIndex, snapshot: &StepSnapshot, _series: usize) -> MonitorResult<Option<Sample>> {
        if snapshot.is_empty() {
            return Ok(None);
        }
        let points = snapshot.vehicles().iter().map(|v| (v.coordinates.x, v.coordinates.y)).collect();
        Ok(Some(Sample::Cloud(points)))
    }
}
