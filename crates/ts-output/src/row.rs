//! Plain data row types written by output backends.

use ts_core::StepIndex;
use ts_response::{StepSnapshot, VehicleRecord};

/// One vehicle's state at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRow {
    pub step:         u64,
    /// Simulated time, seconds.
    pub time:         f64,
    pub vehicle_id:   u32,
    pub vehicle_type: String,
    pub link:         String,
    pub lane:         u16,
    /// Distance from the link start, metres.
    pub position:     f64,
    pub x:            f64,
    pub y:            f64,
    pub speed:        f64,
    pub acceleration: f64,
}

impl TrajectoryRow {
    pub fn new(step: StepIndex, time: f64, vehicle: &VehicleRecord) -> Self {
        Self {
            step: step.get(),
            time,
            vehicle_id: vehicle.id.get(),
            vehicle_type: vehicle.vehicle_type.clone(),
            link: vehicle.link.clone(),
            lane: vehicle.lane,
            position: vehicle.position,
            x: vehicle.coordinates.x,
            y: vehicle.coordinates.y,
            speed: vehicle.speed,
            acceleration: vehicle.acceleration,
        }
    }
}

/// Aggregate figures for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSummaryRow {
    pub step:       u64,
    pub time:       f64,
    /// Vehicle count announced by the engine.
    pub vehicles:   u32,
    pub created:    u32,
    pub exited:     u32,
    /// `None` when no vehicle is on the network.
    pub mean_speed: Option<f64>,
}

impl StepSummaryRow {
    pub fn new(step: StepIndex, snapshot: &StepSnapshot) -> Self {
        Self {
            step:       step.get(),
            time:       snapshot.time,
            vehicles:   snapshot.reported_vehicle_count,
            created:    snapshot.creations().len() as u32,
            exited:     snapshot.exits().len() as u32,
            mean_speed: snapshot.mean_speed(),
        }
    }
}
