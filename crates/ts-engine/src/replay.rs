//! In-memory engine replaying recorded payloads.
//!
//! `ReplayEngine` answers each step with the next scripted payload and
//! records every call it receives in a shared [`CallLog`], so a test can
//! hand the engine to a session and still inspect the traffic afterwards.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ts_core::VehicleId;

use crate::{Engine, EngineError, EngineResult, ResponseBuffer, StepOutcome};

/// One call received by a [`ReplayEngine`].
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    LoadNetwork(PathBuf),
    RunNextStep { trace: bool },
    RunNextStepLite { trace: bool },
    RunToEnd(PathBuf),
    CreateVehicle { vehicle_type: String, origin: String, destination: String, lane: i32, time: f64 },
    CreateVehicleWithRoute {
        vehicle_type: String,
        origin:       String,
        destination:  String,
        lane:         i32,
        time:         f64,
        route:        String,
    },
    DriveVehicle { id: VehicleId, link: String, lane: i32, position: f64, force: bool },
    AlterRoute { id: VehicleId, route: String },
    AddControlZone { access_rate: f64, min_distance: f64, links: String },
    ModifyControlZone { handle: i32, access_rate: f64 },
    ApplyControlZones,
    TotalTravelTime(String),
    TotalTravelDistance(String),
    VehiclesInZone(String),
    UnloadNetwork,
}

impl EngineCall {
    /// `true` for the step entry points.
    pub fn is_step(&self) -> bool {
        matches!(self, EngineCall::RunNextStep { .. } | EngineCall::RunNextStepLite { .. })
    }
}

/// Shared, append-only record of engine calls.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<EngineCall>>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<EngineCall>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, call: EngineCall) {
        self.lock().push(call);
    }

    /// Copy of every call so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().iter().filter(|c| pred(c)).count()
    }

    /// Number of step calls (full or lite).
    pub fn steps(&self) -> usize {
        self.count(EngineCall::is_step)
    }
}

/// Scripted [`Engine`].
///
/// By default every call succeeds: vehicles get consecutive ids from 0,
/// drive and route commands return 0, control zones get consecutive handles
/// from 0, zone metrics are 0.
#[derive(Clone, Debug, Default)]
pub struct ReplayEngine {
    payloads:        VecDeque<Vec<u8>>,
    cycle:           bool,
    fail_steps_from: Option<usize>,
    reject_network:  bool,
    steps_taken:     usize,
    next_vehicle:    i32,
    next_zone:       i32,
    create_codes:    VecDeque<i32>,
    drive_codes:     VecDeque<i32>,
    apply_codes:     VecDeque<i32>,
    no_routes:       bool,
    fail_drive:      bool,
    zone_metrics:    HashMap<String, (f64, f64)>,
    zone_vehicles:   HashMap<String, Vec<VehicleId>>,
    log:             CallLog,
}

impl ReplayEngine {
    /// Replay `payloads` in order, one per step.
    pub fn new<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        Self { payloads: payloads.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Load every `*.xml` file of `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> EngineResult<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        files.sort();
        let payloads = files.iter().map(std::fs::read).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(payloads))
    }

    /// Restart from the first payload when exhausted; the engine then never
    /// reports the end of the simulation.
    pub fn cycle(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Step calls numbered `n` and later (0-based) fail.
    pub fn fail_steps_from(mut self, n: usize) -> Self {
        self.fail_steps_from = Some(n);
        self
    }

    /// `load_network` reports the network as rejected.
    pub fn reject_network(mut self) -> Self {
        self.reject_network = true;
        self
    }

    /// Return `code` from the next `create_vehicle*` call instead of a fresh id.
    pub fn script_create(mut self, code: i32) -> Self {
        self.create_codes.push_back(code);
        self
    }

    /// Return `code` from the next `drive_vehicle` call.
    pub fn script_drive(mut self, code: i32) -> Self {
        self.drive_codes.push_back(code);
        self
    }

    /// Return `code` from the next `apply_control_zones` call.
    pub fn script_apply(mut self, code: i32) -> Self {
        self.apply_codes.push_back(code);
        self
    }

    /// Behave like an engine build lacking the routed creation entry point.
    pub fn without_routes(mut self) -> Self {
        self.no_routes = true;
        self
    }

    /// Fail the next `drive_vehicle` call as an argument marshalling error.
    pub fn fail_next_drive(mut self) -> Self {
        self.fail_drive = true;
        self
    }

    /// Travel time and distance reported for `zone`.
    pub fn zone_metrics(mut self, zone: &str, time: f64, distance: f64) -> Self {
        self.zone_metrics.insert(zone.to_owned(), (time, distance));
        self
    }

    pub fn zone_vehicles(mut self, zone: &str, ids: &[VehicleId]) -> Self {
        self.zone_vehicles.insert(zone.to_owned(), ids.to_vec());
        self
    }

    /// Handle on the call record, valid after the engine is moved away.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn step(&mut self) -> EngineResult<Option<Vec<u8>>> {
        let index = self.steps_taken;
        self.steps_taken += 1;
        if self.fail_steps_from.is_some_and(|n| index >= n) {
            return Err(EngineError::StepFailed);
        }
        let payload = self.payloads.pop_front();
        if let (true, Some(p)) = (self.cycle, &payload) {
            self.payloads.push_back(p.clone());
        }
        Ok(payload)
    }

    fn more_remaining(&self) -> bool {
        self.cycle || !self.payloads.is_empty()
    }

    fn created(&mut self) -> i32 {
        self.create_codes.pop_front().unwrap_or_else(|| {
            let id = self.next_vehicle;
            self.next_vehicle += 1;
            id
        })
    }
}

impl Engine for ReplayEngine {
    fn load_network(&mut self, path: &Path) -> EngineResult<()> {
        self.log.push(EngineCall::LoadNetwork(path.to_path_buf()));
        if self.reject_network {
            return Err(EngineError::NetworkRejected(path.to_path_buf()));
        }
        Ok(())
    }

    fn run_next_step(&mut self, buffer: &mut ResponseBuffer, trace: bool) -> EngineResult<StepOutcome> {
        self.log.push(EngineCall::RunNextStep { trace });
        match self.step()? {
            Some(payload) => {
                buffer.fill(&payload);
            }
            None => buffer.clear(),
        }
        Ok(StepOutcome { more_remaining: self.more_remaining() })
    }

    fn run_next_step_lite(&mut self, trace: bool) -> EngineResult<StepOutcome> {
        self.log.push(EngineCall::RunNextStepLite { trace });
        self.step()?;
        Ok(StepOutcome { more_remaining: self.more_remaining() })
    }

    fn run_to_end(&mut self, path: &Path) -> EngineResult<i32> {
        self.log.push(EngineCall::RunToEnd(path.to_path_buf()));
        self.payloads.clear();
        Ok(0)
    }

    fn create_vehicle(
        &mut self,
        vehicle_type: &str,
        origin:       &str,
        destination:  &str,
        lane:         i32,
        time:         f64,
    ) -> EngineResult<i32> {
        self.log.push(EngineCall::CreateVehicle {
            vehicle_type: vehicle_type.to_owned(),
            origin:       origin.to_owned(),
            destination:  destination.to_owned(),
            lane,
            time,
        });
        Ok(self.created())
    }

    fn create_vehicle_with_route(
        &mut self,
        origin:       &str,
        destination:  &str,
        vehicle_type: &str,
        lane:         i32,
        time:         f64,
        route:        &str,
    ) -> EngineResult<i32> {
        if self.no_routes {
            return Err(EngineError::Unsupported("SymCreateVehicleWithRouteEx"));
        }
        self.log.push(EngineCall::CreateVehicleWithRoute {
            vehicle_type: vehicle_type.to_owned(),
            origin:       origin.to_owned(),
            destination:  destination.to_owned(),
            lane,
            time,
            route:        route.to_owned(),
        });
        Ok(self.created())
    }

    fn drive_vehicle(
        &mut self,
        id:       VehicleId,
        link:     &str,
        lane:     i32,
        position: f64,
        force:    bool,
    ) -> EngineResult<i32> {
        if std::mem::take(&mut self.fail_drive) {
            return Err(EngineError::InvalidArgument { what: "link", reason: "interior NUL byte".into() });
        }
        self.log.push(EngineCall::DriveVehicle { id, link: link.to_owned(), lane, position, force });
        Ok(self.drive_codes.pop_front().unwrap_or(0))
    }

    fn alter_route(&mut self, id: VehicleId, route: &str) -> EngineResult<i32> {
        self.log.push(EngineCall::AlterRoute { id, route: route.to_owned() });
        Ok(0)
    }

    fn add_control_zone(&mut self, access_rate: f64, min_distance: f64, links: &str) -> EngineResult<i32> {
        self.log.push(EngineCall::AddControlZone { access_rate, min_distance, links: links.to_owned() });
        let handle = self.next_zone;
        self.next_zone += 1;
        Ok(handle)
    }

    fn modify_control_zone(&mut self, handle: i32, access_rate: f64) -> EngineResult<i32> {
        self.log.push(EngineCall::ModifyControlZone { handle, access_rate });
        Ok(handle)
    }

    fn apply_control_zones(&mut self) -> EngineResult<i32> {
        self.log.push(EngineCall::ApplyControlZones);
        Ok(self.apply_codes.pop_front().unwrap_or(0))
    }

    fn total_travel_time(&mut self, zone: &str) -> EngineResult<f64> {
        self.log.push(EngineCall::TotalTravelTime(zone.to_owned()));
        Ok(self.zone_metrics.get(zone).map_or(0.0, |m| m.0))
    }

    fn total_travel_distance(&mut self, zone: &str) -> EngineResult<f64> {
        self.log.push(EngineCall::TotalTravelDistance(zone.to_owned()));
        Ok(self.zone_metrics.get(zone).map_or(0.0, |m| m.1))
    }

    fn vehicles_in_zone(&mut self, zone: &str) -> EngineResult<Vec<VehicleId>> {
        self.log.push(EngineCall::VehiclesInZone(zone.to_owned()));
        Ok(self.zone_vehicles.get(zone).cloned().unwrap_or_default())
    }

    fn unload_network(&mut self) -> EngineResult<()> {
        self.log.push(EngineCall::UnloadNetwork);
        Ok(())
    }
}
