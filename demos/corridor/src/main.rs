//! corridor — drive a session end to end against a synthetic engine.
//!
//! Vehicles run along three 300 m links.  The demo injects vehicles, drives
//! one of them forward, throttles the entry with a control zone, and records
//! monitors and trajectories under `output/corridor/`.
//!
//! `RUST_LOG=debug cargo run -p corridor` shows per-step engine traffic.

mod engine;
mod scenario;

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ts_core::VehicleId;
use ts_engine::{EngineConfig, EngineResult};
use ts_monitor::{Accumulation, Flux, Indicator, Mfd, MonitorManager, TotalTravelTime, VehicleIndicator, ZoneSpeed};
use ts_output::CsvRecorder;
use ts_scenario::ScenarioLoader;
use ts_session::{DriveRequest, SessionBuilder, SessionConfig, SessionError, StepStatus, VehicleRequest};

use engine::CorridorEngine;
use scenario::CORRIDOR_XML;

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:            u64 = 42;
const OUTPUT_DIR:      &str = "output/corridor";
const INJECT_EVERY:    u64 = 10;
const DRIVE_AT_STEP:   u64 = 30;
const THROTTLE_AT:     u64 = 60;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // 1. Scenario on disk, as a real engine would need it.
    let out = Path::new(OUTPUT_DIR);
    fs::create_dir_all(out)?;
    let scenario_path = out.join("corridor.xml");
    fs::write(&scenario_path, CORRIDOR_XML)?;
    let scenario = ScenarioLoader::new().load(&scenario_path)?;
    let sensors: Vec<(String, Vec<String>)> =
        scenario.sensor_zones().iter().map(|z| (z.id.clone(), z.links.clone())).collect();
    info!(steps = scenario.step_count(), sensors = sensors.len(), "scenario ready");

    // 2. Monitors and recorder, shared so they stay readable after the run.
    let monitors = Rc::new(RefCell::new(MonitorManager::new()));
    let mid: Vec<String> = sensors.iter().find(|s| s.0 == "Sensor_Mid").map(|s| s.1.clone()).unwrap_or_default();
    {
        let mut m = monitors.borrow_mut();
        m.add(Accumulation);
        m.add(Mfd);
        m.add(TotalTravelTime::new(mid.clone()).aggregation_period(10));
        m.add(Flux::new(mid.clone()).aggregation_period(10));
        m.add(ZoneSpeed::new(mid));
        m.add(VehicleIndicator::new(vec![VehicleId(0), VehicleId(1)], Indicator::Distance));
    }
    let recorder = Rc::new(RefCell::new(CsvRecorder::create(out)?));

    // 3. Session.
    let binder = move |_: &EngineConfig| -> EngineResult<CorridorEngine> {
        Ok(sensors.iter().fold(CorridorEngine::new(SEED), |engine, (id, links)| engine.with_zone(id, links)))
    };
    let mut session = SessionBuilder::new(SessionConfig::new(EngineConfig::new("corridor-synthetic")), binder)
        .scenario_path(&scenario_path)
        .observer(monitors.clone())
        .observer(recorder.clone())
        .open()?;

    // 4. Run.
    let t0 = Instant::now();
    let mut speeds = Vec::new();
    loop {
        let step = session.current_step().get();
        if step % INJECT_EVERY == 0 {
            let time = session.snapshot().time;
            match session.create_vehicle(&VehicleRequest::new("VL", "E_West", "S_East").at(time)) {
                Ok(id) => info!(step, id = id.get(), "vehicle injected"),
                Err(e) => warn!(step, error = %e, "injection refused"),
            }
        }
        if step == DRIVE_AT_STEP {
            let request = DriveRequest::new(VehicleId(0), 150.0).link("Corridor_3");
            if let Err(e) = session.drive_vehicle(&request) {
                warn!(error = %e, "drive refused");
            }
        }
        // The engine is released on termination; sample while it is live.
        speeds = session.mfd_speeds()?;
        if step == THROTTLE_AT {
            session.add_control_zone("Sensor_All", 0.3, 20.0)?;
        }
        match session.advance() {
            Ok(StepStatus::Advanced { .. }) if session.state().is_running() => {}
            Ok(_) => break,
            // A bad payload only costs one step.
            Err(SessionError::Parse(e)) => warn!(error = %e, "step payload rejected"),
            Err(e) => return Err(e.into()),
        }
    }
    let elapsed = t0.elapsed();

    // 5. Summary.
    for (zone, speed) in &speeds {
        println!("  {zone:<12} mean speed {speed:>6.2} m/s");
    }
    println!(
        "Ran {} steps in {:.3} s; {} vehicles seen, {} observer failures",
        session.current_step().get(),
        elapsed.as_secs_f64(),
        session.tracker().retired_count() + session.tracker().active().count(),
        session.observer_failures(),
    );
    session.close();

    let csv = monitors.borrow().write_csv(out)?;
    println!("  monitors        : {}", csv.display());
    let mut recorder = recorder.borrow_mut();
    if let Some(e) = recorder.take_error() {
        eprintln!("output error: {e}");
    }
    println!("  trajectories.csv: {} rows", recorder.rows_written());

    Ok(())
}
