//! The engine seam.
//!
//! # Pluggability
//!
//! `ts-session` drives the engine only through [`Engine`], so the native
//! library can be swapped for [`ReplayEngine`][crate::ReplayEngine] in tests
//! or for a synthetic engine in demos without touching the session.
//!
//! # Return codes
//!
//! Methods that forward an engine status code return it untouched.
//! Non-negative means success; interpreting negative codes is the caller's
//! business.

use std::path::Path;

use ts_core::VehicleId;

use crate::{EngineConfig, EngineResult, ResponseBuffer};

/// Result of one step call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// `false` once the engine has reached the end of its simulation window.
    pub more_remaining: bool,
}

/// Synchronous handle on a traffic engine.
pub trait Engine {
    /// Load the scenario document at `path` into the engine.
    fn load_network(&mut self, path: &Path) -> EngineResult<()>;

    /// Advance one step, writing the step payload into `buffer`.
    fn run_next_step(&mut self, buffer: &mut ResponseBuffer, trace: bool) -> EngineResult<StepOutcome>;

    /// Advance one step without producing a payload.
    fn run_next_step_lite(&mut self, trace: bool) -> EngineResult<StepOutcome>;

    /// Run the whole scenario at `path` in one call.
    fn run_to_end(&mut self, path: &Path) -> EngineResult<i32>;

    /// Inject a vehicle; returns its id, or a negative code.
    fn create_vehicle(
        &mut self,
        vehicle_type: &str,
        origin:       &str,
        destination:  &str,
        lane:         i32,
        time:         f64,
    ) -> EngineResult<i32>;

    /// Inject a vehicle with an imposed route (space-separated link ids).
    fn create_vehicle_with_route(
        &mut self,
        origin:       &str,
        destination:  &str,
        vehicle_type: &str,
        lane:         i32,
        time:         f64,
        route:        &str,
    ) -> EngineResult<i32>;

    /// Impose a position on a vehicle for the next step.
    fn drive_vehicle(
        &mut self,
        id:       VehicleId,
        link:     &str,
        lane:     i32,
        position: f64,
        force:    bool,
    ) -> EngineResult<i32>;

    /// Replace a vehicle's remaining route.
    fn alter_route(&mut self, id: VehicleId, route: &str) -> EngineResult<i32>;

    /// Register an access-control zone over `links`; returns its handle.
    fn add_control_zone(&mut self, access_rate: f64, min_distance: f64, links: &str) -> EngineResult<i32>;

    fn modify_control_zone(&mut self, handle: i32, access_rate: f64) -> EngineResult<i32>;

    /// Activate all registered control zones.
    fn apply_control_zones(&mut self) -> EngineResult<i32>;

    /// Total travel time spent inside sensor zone `zone` so far, s.
    fn total_travel_time(&mut self, zone: &str) -> EngineResult<f64>;

    /// Total distance travelled inside sensor zone `zone` so far, m.
    fn total_travel_distance(&mut self, zone: &str) -> EngineResult<f64>;

    /// Vehicles currently inside sensor zone `zone`.
    fn vehicles_in_zone(&mut self, zone: &str) -> EngineResult<Vec<VehicleId>>;

    fn unload_network(&mut self) -> EngineResult<()>;
}

/// Produces an engine from configuration.
///
/// Any `Fn(&EngineConfig) -> EngineResult<E>` is a binder, so tests can hand
/// the session a closure returning a prepared engine.
pub trait EngineBinder {
    type Engine: Engine;

    fn bind(&self, config: &EngineConfig) -> EngineResult<Self::Engine>;
}

impl<E, F> EngineBinder for F
where
    E: Engine,
    F: Fn(&EngineConfig) -> EngineResult<E>,
{
    type Engine = E;

    fn bind(&self, config: &EngineConfig) -> EngineResult<E> {
        self(config)
    }
}

/// Parse the engine's space-separated id list.
pub(crate) fn parse_id_list(list: &str) -> Vec<VehicleId> {
    list.split_whitespace()
        .filter_map(|s| s.parse::<i64>().ok())
        .filter_map(VehicleId::from_raw)
        .collect()
}
