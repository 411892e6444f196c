//! `libloading` binding to the engine's C ABI.
//!
//! # Symbols
//!
//! Required entry points are resolved when the library is bound; a missing
//! one fails the bind.  Optional entry points (lite step, route change,
//! control zones, zone metrics, vehicle listing) resolve to `None` and the
//! matching [`Engine`] method returns [`EngineError::Unsupported`].
//!
//! Strings cross the boundary as NUL-terminated UTF-8.  Integers are `int`,
//! reals are `double`, flags are C `bool`.

use std::ffi::{CStr, CString, c_char, c_double, c_int};
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info, warn};
use ts_core::VehicleId;

use crate::engine::parse_id_list;
use crate::{Engine, EngineBinder, EngineConfig, EngineError, EngineResult, ResponseBuffer, StepOutcome};

type LoadNetworkFn = unsafe extern "C" fn(*const c_char) -> bool;
type RunNextStepFn = unsafe extern "C" fn(*mut c_char, bool, *mut c_int) -> bool;
type RunNextStepLiteFn = unsafe extern "C" fn(bool, *mut c_int) -> bool;
type RunFn = unsafe extern "C" fn(*const c_char) -> c_int;
type CreateVehicleFn = unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, c_int, c_double) -> c_int;
type CreateVehicleWithRouteFn =
    unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, c_int, c_double, *const c_char) -> c_int;
type DriveVehicleFn = unsafe extern "C" fn(c_int, *const c_char, c_int, c_double, c_int) -> c_int;
type AlterRouteFn = unsafe extern "C" fn(c_int, *const c_char) -> c_int;
type AddControlZoneFn = unsafe extern "C" fn(c_int, c_double, c_double, c_double, *const c_char) -> c_int;
type ModifyControlZoneFn = unsafe extern "C" fn(c_int, c_int, c_double) -> c_int;
type ApplyControlZonesFn = unsafe extern "C" fn(c_int) -> c_int;
type ZoneMetricFn = unsafe extern "C" fn(*const c_char) -> c_double;
type VehicleListFn = unsafe extern "C" fn(*const c_char) -> *const c_char;
type UnloadFn = unsafe extern "C" fn() -> c_int;

/// Control-zone calls address every network of the engine.
const ALL_NETWORKS: c_int = -1;

struct Symbols {
    load_network:              LoadNetworkFn,
    run_next_step:             RunNextStepFn,
    run:                       RunFn,
    create_vehicle:            CreateVehicleFn,
    drive_vehicle:             DriveVehicleFn,
    unload:                    UnloadFn,
    run_next_step_lite:        Option<RunNextStepLiteFn>,
    create_vehicle_with_route: Option<CreateVehicleWithRouteFn>,
    alter_route:               Option<AlterRouteFn>,
    add_control_zone:          Option<AddControlZoneFn>,
    modify_control_zone:       Option<ModifyControlZoneFn>,
    apply_control_zones:       Option<ApplyControlZonesFn>,
    total_travel_time:         Option<ZoneMetricFn>,
    total_travel_distance:     Option<ZoneMetricFn>,
    vehicle_list:              Option<VehicleListFn>,
}

/// Resolve a symbol to a plain fn pointer.
///
/// # Safety
///
/// `T` must match the exported function's signature.
unsafe fn optional<T: Copy>(library: &Library, name: &'static str) -> Option<T> {
    let symbol = format!("{name}\0");
    unsafe { library.get::<T>(symbol.as_bytes()) }.ok().map(|s| *s)
}

/// # Safety
///
/// As for [`optional`].
unsafe fn required<T: Copy>(library: &Library, name: &'static str) -> EngineResult<T> {
    unsafe { optional(library, name) }.ok_or(EngineError::MissingSymbol(name))
}

fn c_string(what: &'static str, value: &str) -> EngineResult<CString> {
    CString::new(value).map_err(|e| EngineError::InvalidArgument { what, reason: e.to_string() })
}

fn c_path(path: &Path) -> EngineResult<CString> {
    let text = path.to_str().ok_or_else(|| EngineError::InvalidArgument {
        what:   "path",
        reason: format!("{} is not valid UTF-8", path.display()),
    })?;
    c_string("path", text)
}

// ── NativeEngine ──────────────────────────────────────────────────────────────

/// The engine shared library, loaded and resolved.
///
/// Dropping the engine unloads the current network, then the library.
pub struct NativeEngine {
    symbols: Symbols,
    path:    PathBuf,
    network_loaded: bool,
    // Declared last: fn pointers in `symbols` must not outlive it.
    library: Library,
}

impl NativeEngine {
    /// Load the library at `path` and resolve its entry points.
    pub fn open(path: &Path) -> EngineResult<Self> {
        // SAFETY: loading runs the library's initialisers; the engine library
        // is trusted by configuration.
        let library = unsafe { Library::new(path) }.map_err(|e| EngineError::LoadLibrary {
            path:   path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: every alias above mirrors the engine's exported signature.
        let symbols = unsafe {
            Symbols {
                load_network:              required(&library, "SymLoadNetworkEx")?,
                run_next_step:             required(&library, "SymRunNextStepEx")?,
                run:                       required(&library, "SymRunEx")?,
                create_vehicle:            required(&library, "SymCreateVehicleEx")?,
                drive_vehicle:             required(&library, "SymDriveVehicleEx")?,
                unload:                    required(&library, "SymUnloadCurrentNetworkEx")?,
                run_next_step_lite:        optional(&library, "SymRunNextStepLiteEx"),
                create_vehicle_with_route: optional(&library, "SymCreateVehicleWithRouteEx"),
                alter_route:               optional(&library, "SymAlterRouteEx"),
                add_control_zone:          optional(&library, "SymAddControlZoneEx"),
                modify_control_zone:       optional(&library, "SymModifyControlZoneEx"),
                apply_control_zones:       optional(&library, "SymApplyControlZonesEx"),
                total_travel_time:         optional(&library, "SymGetTotalTravelTimeEx"),
                total_travel_distance:     optional(&library, "SymGetTotalTravelDistanceEx"),
                vehicle_list:              optional(&library, "SymGetListofVehicleIdsEx"),
            }
        };
        info!(library = %path.display(), "engine library bound");
        Ok(Self { symbols, path: path.to_path_buf(), network_loaded: false, library })
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying library handle.
    pub fn library(&self) -> &Library {
        &self.library
    }
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine")
            .field("path", &self.path)
            .field("network_loaded", &self.network_loaded)
            .finish_non_exhaustive()
    }
}

impl Engine for NativeEngine {
    fn load_network(&mut self, path: &Path) -> EngineResult<()> {
        let arg = c_path(path)?;
        // SAFETY: `arg` outlives the call.
        let ok = unsafe { (self.symbols.load_network)(arg.as_ptr()) };
        if !ok {
            return Err(EngineError::NetworkRejected(path.to_path_buf()));
        }
        self.network_loaded = true;
        debug!(network = %path.display(), "network loaded");
        Ok(())
    }

    fn run_next_step(&mut self, buffer: &mut ResponseBuffer, trace: bool) -> EngineResult<StepOutcome> {
        let mut end: c_int = 0;
        // SAFETY: the buffer is a live, fixed allocation for the whole call.
        let ok = unsafe { (self.symbols.run_next_step)(buffer.as_mut_ptr().cast(), trace, &mut end) };
        if !ok {
            return Err(EngineError::StepFailed);
        }
        Ok(StepOutcome { more_remaining: end == 0 })
    }

    fn run_next_step_lite(&mut self, trace: bool) -> EngineResult<StepOutcome> {
        let f = self.symbols.run_next_step_lite.ok_or(EngineError::Unsupported("SymRunNextStepLiteEx"))?;
        let mut end: c_int = 0;
        // SAFETY: `end` is a valid out-pointer.
        let ok = unsafe { f(trace, &mut end) };
        if !ok {
            return Err(EngineError::StepFailed);
        }
        Ok(StepOutcome { more_remaining: end == 0 })
    }

    fn run_to_end(&mut self, path: &Path) -> EngineResult<i32> {
        let arg = c_path(path)?;
        // SAFETY: `arg` outlives the call.
        Ok(unsafe { (self.symbols.run)(arg.as_ptr()) })
    }

    fn create_vehicle(
        &mut self,
        vehicle_type: &str,
        origin:       &str,
        destination:  &str,
        lane:         i32,
        time:         f64,
    ) -> EngineResult<i32> {
        let ty = c_string("vehicle type", vehicle_type)?;
        let from = c_string("origin", origin)?;
        let to = c_string("destination", destination)?;
        // SAFETY: all strings outlive the call.
        Ok(unsafe { (self.symbols.create_vehicle)(ty.as_ptr(), from.as_ptr(), to.as_ptr(), lane, time) })
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
        let f = self
            .symbols
            .create_vehicle_with_route
            .ok_or(EngineError::Unsupported("SymCreateVehicleWithRouteEx"))?;
        let from = c_string("origin", origin)?;
        let to = c_string("destination", destination)?;
        let ty = c_string("vehicle type", vehicle_type)?;
        let route = c_string("route", route)?;
        // SAFETY: all strings outlive the call.
        Ok(unsafe { f(from.as_ptr(), to.as_ptr(), ty.as_ptr(), lane, time, route.as_ptr()) })
    }

    fn drive_vehicle(
        &mut self,
        id:       VehicleId,
        link:     &str,
        lane:     i32,
        position: f64,
        force:    bool,
    ) -> EngineResult<i32> {
        let link = c_string("link", link)?;
        // SAFETY: `link` outlives the call.
        Ok(unsafe { (self.symbols.drive_vehicle)(id.as_c_int(), link.as_ptr(), lane, position, c_int::from(force)) })
    }

    fn alter_route(&mut self, id: VehicleId, route: &str) -> EngineResult<i32> {
        let f = self.symbols.alter_route.ok_or(EngineError::Unsupported("SymAlterRouteEx"))?;
        let route = c_string("route", route)?;
        // SAFETY: `route` outlives the call.
        Ok(unsafe { f(id.as_c_int(), route.as_ptr()) })
    }

    fn add_control_zone(&mut self, access_rate: f64, min_distance: f64, links: &str) -> EngineResult<i32> {
        let f = self.symbols.add_control_zone.ok_or(EngineError::Unsupported("SymAddControlZoneEx"))?;
        let links = c_string("links", links)?;
        // The fourth argument is the engine's per-zone weighting, always 1.
        // SAFETY: `links` outlives the call.
        Ok(unsafe { f(ALL_NETWORKS, access_rate, min_distance, 1.0, links.as_ptr()) })
    }

    fn modify_control_zone(&mut self, handle: i32, access_rate: f64) -> EngineResult<i32> {
        let f = self.symbols.modify_control_zone.ok_or(EngineError::Unsupported("SymModifyControlZoneEx"))?;
        // SAFETY: scalar arguments only.
        Ok(unsafe { f(ALL_NETWORKS, handle, access_rate) })
    }

    fn apply_control_zones(&mut self) -> EngineResult<i32> {
        let f = self.symbols.apply_control_zones.ok_or(EngineError::Unsupported("SymApplyControlZonesEx"))?;
        // SAFETY: scalar arguments only.
        Ok(unsafe { f(ALL_NETWORKS) })
    }

    fn total_travel_time(&mut self, zone: &str) -> EngineResult<f64> {
        let f = self.symbols.total_travel_time.ok_or(EngineError::Unsupported("SymGetTotalTravelTimeEx"))?;
        let zone = c_string("zone", zone)?;
        // SAFETY: `zone` outlives the call.
        Ok(unsafe { f(zone.as_ptr()) })
    }

    fn total_travel_distance(&mut self, zone: &str) -> EngineResult<f64> {
        let f = self
            .symbols
            .total_travel_distance
            .ok_or(EngineError::Unsupported("SymGetTotalTravelDistanceEx"))?;
        let zone = c_string("zone", zone)?;
        // SAFETY: `zone` outlives the call.
        Ok(unsafe { f(zone.as_ptr()) })
    }

    fn vehicles_in_zone(&mut self, zone: &str) -> EngineResult<Vec<VehicleId>> {
        let f = self.symbols.vehicle_list.ok_or(EngineError::Unsupported("SymGetListofVehicleIdsEx"))?;
        let zone = c_string("zone", zone)?;
        // SAFETY: `zone` outlives the call; the returned string is owned by
        // the engine and only read before the next engine call.
        let list = unsafe {
            let raw = f(zone.as_ptr());
            if raw.is_null() {
                return Ok(vec![]);
            }
            CStr::from_ptr(raw).to_string_lossy().into_owned()
        };
        Ok(parse_id_list(&list))
    }

    fn unload_network(&mut self) -> EngineResult<()> {
        if self.network_loaded {
            // SAFETY: no arguments.
            unsafe { (self.symbols.unload)() };
            self.network_loaded = false;
            debug!("network unloaded");
        }
        Ok(())
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        if let Err(e) = self.unload_network() {
            warn!(error = %e, "failed to unload network");
        }
        info!(library = %self.path.display(), "engine library released");
    }
}

// ── NativeBinder ──────────────────────────────────────────────────────────────

/// Binds [`NativeEngine`] from [`EngineConfig::library_path`].
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeBinder;

impl EngineBinder for NativeBinder {
    type Engine = NativeEngine;

    fn bind(&self, config: &EngineConfig) -> EngineResult<NativeEngine> {
        NativeEngine::open(&config.library_path)
    }
}
