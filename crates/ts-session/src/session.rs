//! The `Session` state machine.

use std::sync::Arc;

use tracing::{debug, info, warn};
use ts_core::{StepIndex, VehicleId};
use ts_engine::{Engine, EngineBinder, LaunchMode, ResponseBuffer, StepOutcome};
use ts_response::{ParseError, StepSnapshot, VehicleTracker, parse_step};
use ts_scenario::ScenarioDescriptor;

use crate::control::zone_speed;
use crate::{
    ControlZone, DriveRequest, ParseErrorPolicy, Rejection, SessionConfig, SessionError, SessionResult,
    SessionState, StepObserver, StepStatus, StopHandle, VehicleRequest,
};

use SessionState::*;

/// One simulation run against engine `E`.
///
/// The session exclusively owns the engine and the response buffer.  Both
/// are released when the session reaches `Terminated` or `Failed`, and on
/// drop.  Calls must be serialized by the caller; nothing here is reentrant.
///
/// Create with [`Session::new`] and walk the setup states by hand, or use
/// [`SessionBuilder`][crate::SessionBuilder].
pub struct Session<E: Engine> {
    config:            SessionConfig,
    state:             SessionState,
    engine:            Option<E>,
    network_loaded:    bool,
    scenario:          Option<Arc<ScenarioDescriptor>>,
    buffer:            Option<ResponseBuffer>,
    snapshot:          StepSnapshot,
    tracker:           VehicleTracker,
    /// Steps left before iteration exhaustion.
    remaining:         u64,
    /// Counted steps executed so far.
    executed:          u64,
    observers:         Vec<Box<dyn StepObserver>>,
    observer_failures: u64,
    stop:              StopHandle,
    control_zones:     Vec<ControlZone>,
}

impl<E: Engine> Session<E> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state:             Unbound,
            engine:            None,
            network_loaded:    false,
            scenario:          None,
            buffer:            None,
            snapshot:          StepSnapshot::default(),
            tracker:           VehicleTracker::new(),
            remaining:         0,
            executed:          0,
            observers:         Vec::new(),
            observer_failures: 0,
            stop:              StopHandle::default(),
            control_zones:     Vec::new(),
        }
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    /// `Unbound → Bound`.  A binder failure moves the session to `Failed`.
    pub fn bind<B>(&mut self, binder: &B) -> SessionResult<()>
    where
        B: EngineBinder<Engine = E>,
    {
        self.require("bind", &[Unbound])?;
        match binder.bind(&self.config.engine) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.transition(Bound);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "engine bind failed");
                self.transition(Failed);
                Err(SessionError::LoadLibrary(e))
            }
        }
    }

    /// Attach the scenario to run.  Allowed until the network is loaded.
    pub fn register_scenario(&mut self, scenario: Arc<ScenarioDescriptor>) -> SessionResult<()> {
        self.require("register_scenario", &[Unbound, Bound])?;
        debug!(scenario = %scenario.path().display(), steps = scenario.step_count(), "scenario registered");
        self.scenario = Some(scenario);
        Ok(())
    }

    /// `Bound → NetworkLoaded`.  An engine refusal moves the session to
    /// `Failed`.
    pub fn load_network(&mut self) -> SessionResult<()> {
        self.require("load_network", &[Bound])?;
        let Some(scenario) = self.scenario.clone() else {
            return Err(SessionError::FileLoad {
                path:   Default::default(),
                reason: "no scenario registered".into(),
            });
        };
        let loaded = self.engine_mut("load_network")?.load_network(scenario.path());
        if let Err(e) = loaded {
            warn!(error = %e, "network load failed");
            self.shutdown(Failed);
            return Err(SessionError::FileLoad { path: scenario.path().to_path_buf(), reason: e.to_string() });
        }
        self.network_loaded = true;
        info!(network = %scenario.path().display(), "network loaded");
        self.transition(NetworkLoaded);
        Ok(())
    }

    /// `NetworkLoaded → Ready`: allocate the response buffer and set the
    /// iteration counter from the scenario window.
    pub fn initialize(&mut self) -> SessionResult<()> {
        self.require("initialize", &[NetworkLoaded])?;
        let Some(scenario) = self.scenario.clone() else {
            return Err(self.illegal("initialize"));
        };
        if self.config.engine.launch_mode == LaunchMode::Full {
            self.buffer = Some(ResponseBuffer::with_capacity(self.config.engine.buffer_capacity));
        }
        self.remaining = match self.config.max_iterations {
            Some(cap) => scenario.step_count().min(cap),
            None => scenario.step_count(),
        };
        self.executed = 0;
        self.snapshot = StepSnapshot::empty(0.0);
        self.tracker = VehicleTracker::new();
        self.transition(Ready);
        info!(iterations = self.remaining, "session ready");

        for observer in &mut self.observers {
            if let Err(e) = observer.on_session_start(&scenario) {
                self.observer_failures += 1;
                warn!(error = %e, "observer failed at session start");
            }
        }
        Ok(())
    }

    pub fn add_observer(&mut self, observer: impl StepObserver + 'static) {
        self.add_boxed_observer(Box::new(observer));
    }

    pub fn add_boxed_observer(&mut self, observer: Box<dyn StepObserver>) {
        self.observers.push(observer);
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Execute one step.
    ///
    /// Returns [`StepStatus::Completed`] without calling the engine when a
    /// stop was requested or no iterations remain; the session is then
    /// `Terminated`.  The step that exhausts the counter returns `Advanced`
    /// and terminates the session.  Calling `advance` on a terminated
    /// session is an [`SessionError::IllegalState`].
    pub fn advance(&mut self) -> SessionResult<StepStatus> {
        self.require("advance", &[Ready, Stepping])?;
        if self.stop.is_stopped() || self.remaining == 0 {
            self.shutdown(Terminated);
            return Ok(StepStatus::Completed);
        }

        let outcome = self.pull_step()?;
        let step = StepIndex(self.executed);
        let parsed = self.refresh_snapshot();
        self.executed += 1;
        self.remaining -= 1;
        if self.state == Ready {
            self.transition(Stepping);
        }

        if self.has_fresh_payload(&parsed) {
            self.tracker.observe(step, &self.snapshot);
        }
        for observer in &mut self.observers {
            if let Err(e) = observer.on_step(step, &self.snapshot) {
                self.observer_failures += 1;
                warn!(step = step.get(), error = %e, "observer failed");
            }
        }

        let time = self.snapshot.time;
        if self.remaining == 0 || !outcome.more_remaining {
            self.shutdown(Terminated);
        }
        match parsed {
            Err(e) if self.config.parse_errors == ParseErrorPolicy::Fail => Err(e.into()),
            _ => Ok(StepStatus::Advanced { step, time }),
        }
    }

    /// Advance until completion.  Returns the number of steps executed.
    pub fn run(&mut self) -> SessionResult<u64> {
        while self.state.is_running() {
            self.advance()?;
        }
        Ok(self.executed)
    }

    /// Advance at most `n` steps.  Returns how many were executed.
    pub fn run_steps(&mut self, n: u64) -> SessionResult<u64> {
        let mut done = 0;
        while done < n && self.state.is_running() {
            match self.advance()? {
                StepStatus::Advanced { .. } => done += 1,
                StepStatus::Completed => break,
            }
        }
        Ok(done)
    }

    /// Let the engine run the whole scenario in one call, then terminate.
    ///
    /// Allowed once the engine is bound and before stepping starts.
    pub fn run_to_end(&mut self) -> SessionResult<i32> {
        self.require("run_to_end", &[Bound, NetworkLoaded])?;
        let Some(scenario) = self.scenario.clone() else {
            return Err(SessionError::FileLoad {
                path:   Default::default(),
                reason: "no scenario registered".into(),
            });
        };
        let status = self.engine_mut("run_to_end")?.run_to_end(scenario.path())?;
        info!(status, "single-shot run finished");
        self.shutdown(Terminated);
        Ok(status)
    }

    /// Request termination before the next step.
    pub fn stop(&mut self) {
        self.stop.stop();
    }

    /// Handle that can request termination from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Terminate now and release the engine.  Idempotent.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            self.shutdown(Terminated);
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Inject a vehicle and return its engine id.
    ///
    /// Type and endpoints are checked against the scenario before the
    /// engine is called.  A request with a route goes through the routed
    /// entry point, which also rejects identical endpoints and unknown links.
    pub fn create_vehicle(&mut self, request: &VehicleRequest) -> SessionResult<VehicleId> {
        self.require("create_vehicle", &[Ready, Stepping])?;
        let scenario = self.scenario_arc("create_vehicle")?;
        let reject = SessionError::VehicleCreation;

        if !scenario.has_vehicle_type(&request.vehicle_type) {
            return Err(reject(Rejection::UnknownVehicleType(request.vehicle_type.clone())));
        }
        for endpoint in [&request.origin, &request.destination] {
            if !scenario.has_endpoint(endpoint) {
                return Err(reject(Rejection::UnknownEndpoint(endpoint.clone())));
            }
        }

        let lane = i32::from(request.lane);
        let code = if request.route.is_empty() {
            self.engine_mut("create_vehicle")?.create_vehicle(
                &request.vehicle_type,
                &request.origin,
                &request.destination,
                lane,
                request.time,
            )
        } else {
            if request.origin == request.destination {
                return Err(reject(Rejection::SameEndpoints));
            }
            if let Some(link) = request.route.iter().find(|l| !scenario.has_link(l)) {
                return Err(reject(Rejection::UnknownLink(link.clone())));
            }
            self.engine_mut("create_vehicle")?.create_vehicle_with_route(
                &request.origin,
                &request.destination,
                &request.vehicle_type,
                lane,
                request.time,
                &request.route.join(" "),
            )
        }
        .map_err(|e| reject(Rejection::Engine(e)))?;

        let id = VehicleId::from_raw(i64::from(code)).ok_or(reject(Rejection::EngineCode(code)))?;
        debug!(vehicle = id.get(), vehicle_type = %request.vehicle_type, "vehicle created");
        Ok(id)
    }

    /// Impose a position on a vehicle, then pull one extra step so the
    /// snapshot reflects it.
    ///
    /// The extra step is not counted against the iteration budget and is
    /// not reported to observers.  Returns the engine status code.
    pub fn drive_vehicle(&mut self, request: &DriveRequest) -> SessionResult<i32> {
        self.require("drive_vehicle", &[Ready, Stepping])?;
        let scenario = self.scenario_arc("drive_vehicle")?;
        let reject = SessionError::DriveVehicle;

        let link = match &request.link {
            Some(link) => link.clone(),
            None => self
                .snapshot
                .link_of(request.id)
                .map(str::to_owned)
                .ok_or(reject(Rejection::VehicleNotFound(request.id)))?,
        };
        if !scenario.has_link(&link) {
            return Err(reject(Rejection::UnknownLink(link)));
        }

        let code = self.engine_mut("drive_vehicle")?.drive_vehicle(
            request.id,
            &link,
            i32::from(request.lane),
            request.position,
            true,
        )
        .map_err(|e| reject(Rejection::Engine(e)))?;
        if code < 0 {
            return Err(reject(Rejection::EngineCode(code)));
        }
        debug!(vehicle = request.id.get(), link = %link, position = request.position, "vehicle driven");
        self.resync()?;
        Ok(code)
    }

    /// Replace the remaining route of a vehicle.  Returns the engine code.
    pub fn alter_route<S: AsRef<str>>(&mut self, id: VehicleId, route: &[S]) -> SessionResult<i32> {
        self.require("alter_route", &[Ready, Stepping])?;
        let scenario = self.scenario_arc("alter_route")?;
        if let Some(link) = route.iter().map(AsRef::as_ref).find(|l| !scenario.has_link(l)) {
            return Err(SessionError::Route(Rejection::UnknownLink(link.to_owned())));
        }
        let joined = route.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
        let code = self
            .engine_mut("alter_route")?
            .alter_route(id, &joined)
            .map_err(|e| SessionError::Route(Rejection::Engine(e)))?;
        if code < 0 {
            return Err(SessionError::Route(Rejection::EngineCode(code)));
        }
        Ok(code)
    }

    /// Put sensor zone `zone` under access control and activate it.
    ///
    /// Registering a zone again replaces the stored handle.
    pub fn add_control_zone(
        &mut self,
        zone:               &str,
        access_probability: f64,
        min_distance:       f64,
    ) -> SessionResult<ControlZone> {
        self.require("add_control_zone", &[Ready, Stepping])?;
        let scenario = self.scenario_arc("add_control_zone")?;
        let links = scenario
            .sensor_zone(zone)
            .ok_or_else(|| SessionError::UnknownZone(zone.to_owned()))?
            .link_list();

        let engine = self.engine_mut("add_control_zone")?;
        let handle = engine.add_control_zone(access_probability, min_distance, &links)?;
        if handle < 0 {
            return Err(SessionError::ControlZone { zone: zone.to_owned(), code: handle });
        }
        let applied = engine.apply_control_zones()?;
        if applied < 0 {
            return Err(SessionError::ControlZone { zone: zone.to_owned(), code: applied });
        }

        let entry = ControlZone { zone: zone.to_owned(), handle, access_probability, min_distance };
        self.control_zones.retain(|c| c.zone != zone);
        self.control_zones.push(entry.clone());
        debug!(zone, handle, access_probability, "control zone added");
        Ok(entry)
    }

    /// Change the access probability of a registered control zone.
    pub fn modify_control_zone(&mut self, zone: &str, access_probability: f64) -> SessionResult<()> {
        self.require("modify_control_zone", &[Ready, Stepping])?;
        let handle = self
            .control_zones
            .iter()
            .find(|c| c.zone == zone)
            .map(|c| c.handle)
            .ok_or_else(|| SessionError::UnknownZone(zone.to_owned()))?;

        let engine = self.engine_mut("modify_control_zone")?;
        let code = engine.modify_control_zone(handle, access_probability)?;
        if code < 0 {
            return Err(SessionError::ControlZone { zone: zone.to_owned(), code });
        }
        let applied = engine.apply_control_zones()?;
        if applied < 0 {
            return Err(SessionError::ControlZone { zone: zone.to_owned(), code: applied });
        }

        if let Some(entry) = self.control_zones.iter_mut().find(|c| c.zone == zone) {
            entry.access_probability = access_probability;
        }
        Ok(())
    }

    // ── Zone metrics ──────────────────────────────────────────────────────

    /// Total travel time accumulated in sensor zone `zone`, s.
    pub fn total_travel_time(&mut self, zone: &str) -> SessionResult<f64> {
        self.check_zone("total_travel_time", zone)?;
        Ok(self.engine_mut("total_travel_time")?.total_travel_time(zone)?)
    }

    /// Total distance travelled in sensor zone `zone`, m.
    pub fn total_travel_distance(&mut self, zone: &str) -> SessionResult<f64> {
        self.check_zone("total_travel_distance", zone)?;
        Ok(self.engine_mut("total_travel_distance")?.total_travel_distance(zone)?)
    }

    /// Space-mean speed in `zone`; [`MFD_FLOOR_SPEED`][crate::MFD_FLOOR_SPEED]
    /// while no travel time has accumulated.
    pub fn mfd_speed(&mut self, zone: &str) -> SessionResult<f64> {
        let distance = self.total_travel_distance(zone)?;
        let time = self.total_travel_time(zone)?;
        Ok(zone_speed(distance, time))
    }

    /// [`mfd_speed`](Self::mfd_speed) for every sensor zone, in document
    /// order.
    pub fn mfd_speeds(&mut self) -> SessionResult<Vec<(String, f64)>> {
        let scenario = self.scenario_arc("mfd_speeds")?;
        scenario
            .sensor_zone_ids()
            .map(|zone| -> SessionResult<(String, f64)> { Ok((zone.to_owned(), self.mfd_speed(zone)?)) })
            .collect()
    }

    pub fn vehicles_in_zone(&mut self, zone: &str) -> SessionResult<Vec<VehicleId>> {
        self.check_zone("vehicles_in_zone", zone)?;
        Ok(self.engine_mut("vehicles_in_zone")?.vehicles_in_zone(zone)?)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Snapshot of the last step.
    pub fn snapshot(&self) -> &StepSnapshot {
        &self.snapshot
    }

    pub fn tracker(&self) -> &VehicleTracker {
        &self.tracker
    }

    pub fn scenario(&self) -> Option<&ScenarioDescriptor> {
        self.scenario.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn remaining_iterations(&self) -> u64 {
        self.remaining
    }

    /// Index the next counted step will carry; equals the number of steps
    /// executed so far.
    pub fn current_step(&self) -> StepIndex {
        StepIndex(self.executed)
    }

    pub fn control_zones(&self) -> &[ControlZone] {
        &self.control_zones
    }

    /// Number of observer callbacks that returned an error.
    pub fn observer_failures(&self) -> u64 {
        self.observer_failures
    }

    /// `true` while the session holds an engine.
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn transition(&mut self, to: SessionState) {
        debug!(from = %self.state, to = %to, "session state change");
        self.state = to;
    }

    fn illegal(&self, operation: &'static str) -> SessionError {
        SessionError::IllegalState { operation, state: self.state }
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> SessionResult<()> {
        if allowed.contains(&self.state) { Ok(()) } else { Err(self.illegal(operation)) }
    }

    fn engine_mut(&mut self, operation: &'static str) -> SessionResult<&mut E> {
        let state = self.state;
        self.engine.as_mut().ok_or(SessionError::IllegalState { operation, state })
    }

    fn scenario_arc(&self, operation: &'static str) -> SessionResult<Arc<ScenarioDescriptor>> {
        self.scenario.clone().ok_or_else(|| self.illegal(operation))
    }

    fn check_zone(&self, operation: &'static str, zone: &str) -> SessionResult<()> {
        self.require(operation, &[Ready, Stepping])?;
        match self.scenario_arc(operation)?.sensor_zone(zone) {
            Some(_) => Ok(()),
            None => Err(SessionError::UnknownZone(zone.to_owned())),
        }
    }

    /// One engine step in the configured launch mode.  An engine failure is
    /// unrecoverable and fails the session.
    fn pull_step(&mut self) -> SessionResult<StepOutcome> {
        let trace = self.config.engine.trace_flow;
        let state = self.state;
        let result = match (self.engine.as_mut(), self.buffer.as_mut(), self.config.engine.launch_mode) {
            (Some(engine), Some(buffer), LaunchMode::Full) => engine.run_next_step(buffer, trace),
            (Some(engine), _, LaunchMode::Lite) => engine.run_next_step_lite(trace),
            _ => return Err(SessionError::IllegalState { operation: "advance", state }),
        };
        result.map_err(|e| {
            warn!(error = %e, "engine step failed");
            self.shutdown(Failed);
            SessionError::Engine(e)
        })
    }

    /// Whether the snapshot was decoded from an engine payload this step.
    /// Placeholder snapshots (Lite mode, unparseable payload) are kept away
    /// from the tracker.
    fn has_fresh_payload(&self, parsed: &Result<(), ParseError>) -> bool {
        parsed.is_ok() && self.buffer.is_some()
    }

    /// Replace the snapshot with the buffer contents.  On a parse failure
    /// the snapshot becomes empty and the error is handed back.
    fn refresh_snapshot(&mut self) -> Result<(), ParseError> {
        let elapsed = self.scenario.as_ref().map_or(0.0, |s| s.clock().time_at(self.executed + 1));
        let Some(buffer) = self.buffer.as_ref() else {
            self.snapshot = StepSnapshot::empty(elapsed);
            return Ok(());
        };
        match parse_step(buffer.payload()) {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                Ok(())
            }
            Err(e) => {
                warn!(step = self.executed, error = %e, "unparseable step payload; using empty snapshot");
                self.snapshot = StepSnapshot::empty(elapsed);
                Err(e)
            }
        }
    }

    /// Extra step after a drive command.
    fn resync(&mut self) -> SessionResult<()> {
        let outcome = self.pull_step()?;
        let parsed = match self.config.engine.launch_mode {
            LaunchMode::Full => self.refresh_snapshot(),
            LaunchMode::Lite => Ok(()),
        };
        if self.has_fresh_payload(&parsed) {
            self.tracker.observe(StepIndex(self.executed), &self.snapshot);
        }
        if !outcome.more_remaining {
            self.shutdown(Terminated);
        }
        match parsed {
            Err(e) if self.config.parse_errors == ParseErrorPolicy::Fail => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Enter a terminal state: notify observers and release resources.
    fn shutdown(&mut self, to: SessionState) {
        if self.state.is_terminal() {
            return;
        }
        let was_running = self.state.is_running();
        self.transition(to);
        if was_running {
            for observer in &mut self.observers {
                if let Err(e) = observer.on_session_end(self.executed) {
                    self.observer_failures += 1;
                    warn!(error = %e, "observer failed at session end");
                }
            }
        }
        self.release();
        info!(state = %to, steps = self.executed, "session closed");
    }

    fn release(&mut self) {
        self.buffer = None;
        if let Some(mut engine) = self.engine.take() {
            if self.network_loaded {
                if let Err(e) = engine.unload_network() {
                    warn!(error = %e, "network unload failed");
                }
            }
        }
        self.network_loaded = false;
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            self.release();
            debug!("session dropped; engine released");
        }
    }
}
