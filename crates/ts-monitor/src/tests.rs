//! Unit tests for ts-monitor.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use ts_core::{StepIndex, VehicleId};
use ts_engine::{EngineConfig, EngineError, ReplayEngine};
use ts_response::{StepSnapshot, parse_step};
use ts_scenario::ScenarioLoader;
use ts_session::{MFD_FLOOR_SPEED, SessionBuilder, SessionConfig};

use crate::{
    Accumulation, Flow, Flux, Indicator, Mfd, Monitor, MonitorError, MonitorManager, Sample, TotalTravelDistance,
    TotalTravelTime, VehicleIndicator, ZoneSpeed,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Three vehicles at t = 6 s; vehicles 0 and 1 share a lane.
const STEP_6: &str = r#"<INST nbVeh="3" val="6.00">
<CREATIONS/>
<SORTIES/>
<TRAJS>
<TRAJ abs="843554.88" acc="2.00" deltaN="1.00" dst="43.56" id="0" lead="-1" ord="6519864.04" tron="Rue_Crequi_SN_1" type="VL" vit="14.00" voie="1" z="0.00"/>
<TRAJ abs="843559.27" acc="0.00" deltaN="1.00" dst="17.41" id="1" lead="0" ord="6519838.26" tron="Rue_Crequi_SN_1" type="VL" vit="99.00" voie="1" z="0.00"/>
<TRAJ abs="843163.80" acc="0.00" deltaN="1.00" dst="19.01" id="2" lead="-1" ord="6519886.77" tron="Cr_Lafayette_OE_1" type="VL" vit="14.00" voie="1" z="0.00"/>
</TRAJS>
<STREAMS/>
<LINKS/>
<SGTS/>
<FEUX/>
<ENTREES>
<ENTREE id="E_Corneille" nb_veh_en_attente="0"/>
<ENTREE id="E_Crequi_S" nb_veh_en_attente="0"/>
<ENTREE id="E_Duguesclin_N" nb_veh_en_attente="0"/>
<ENTREE id="E_Lafayette_E" nb_veh_en_attente="0"/>
<ENTREE id="E_Lafayette_O" nb_veh_en_attente="0"/>
<ENTREE id="E_Moliere_S" nb_veh_en_attente="0"/>
<ENTREE id="E_Saxe_N" nb_veh_en_attente="0"/>
<ENTREE id="E_Saxe_S" nb_veh_en_attente="0"/>
<ENTREE id="E_Vendome_N" nb_veh_en_attente="0"/>
</ENTREES>
<REGULATIONS/>
</INST>"#;

/// Same network one second later: vehicle 3 created on Rue_Duguesclin_NS_1.
const STEP_7: &str = r#"<INST nbVeh="3" val="7.00">
<CREATIONS>
<CREATION entree="E_Duguesclin_N" id="3" sortie="S_Duguesclin_S" type="VL"/>
</CREATIONS>
<SORTIES/>
<TRAJS>
<TRAJ abs="843552.53" acc="0.00" deltaN="1.00" dst="57.56" id="0" lead="-1" ord="6519877.84" tron="Rue_Crequi_SN_1" type="VL" vit="14.00" voie="1" z="0.00"/>
<TRAJ abs="843556.92" acc="0.00" deltaN="1.00" dst="31.41" id="1" lead="0" ord="6519852.06" tron="Rue_Crequi_SN_1" type="VL" vit="14.00" voie="1" z="0.00"/>
<TRAJ abs="843177.80" acc="0.00" deltaN="1.00" dst="33.01" id="2" lead="-1" ord="6519887.01" tron="Cr_Lafayette_OE_1" type="VL" vit="14.00" voie="1" z="0.00"/>
<TRAJ abs="843630.04" acc="0.00" deltaN="1.00" dst="3.61" id="3" lead="-1" ord="6520018.11" tron="Rue_Duguesclin_NS_1" type="VL" vit="14.00" voie="1" z="0.00"/>
</TRAJS>
<STREAMS/>
<LINKS/>
<SGTS/>
<FEUX/>
<ENTREES>
<ENTREE id="E_Corneille" nb_veh_en_attente="0"/>
<ENTREE id="E_Crequi_S" nb_veh_en_attente="0"/>
<ENTREE id="E_Duguesclin_N" nb_veh_en_attente="0"/>
<ENTREE id="E_Lafayette_E" nb_veh_en_attente="0"/>
<ENTREE id="E_Lafayette_O" nb_veh_en_attente="0"/>
<ENTREE id="E_Moliere_S" nb_veh_en_attente="0"/>
<ENTREE id="E_Saxe_N" nb_veh_en_attente="0"/>
<ENTREE id="E_Saxe_S" nb_veh_en_attente="0"/>
<ENTREE id="E_Vendome_N" nb_veh_en_attente="0"/>
</ENTREES>
<REGULATIONS/>
</INST>"#;

fn parse(payload: &str) -> StepSnapshot {
    parse_step(payload.as_bytes()).unwrap()
}

/// Minimal step payload: creation events plus `(id, link, abs, ord)` rows.
fn payload(time: f64, created: &[u32], vehicles: &[(u32, &str, f64, f64)]) -> String {
    let mut xml = format!("<INST nbVeh=\"{}\" val=\"{time:.2}\"><CREATIONS>", vehicles.len());
    for id in created {
        xml += &format!("<CREATION entree=\"E\" id=\"{id}\" sortie=\"S\" type=\"VL\"/>");
    }
    xml += "</CREATIONS><TRAJS>";
    for (id, link, abs, ord) in vehicles {
        xml += &format!(
            "<TRAJ abs=\"{abs:.2}\" acc=\"0.00\" id=\"{id}\" ord=\"{ord:.2}\" tron=\"{link}\" type=\"VL\" vit=\"10.00\" voie=\"1\"/>"
        );
    }
    xml + "</TRAJS></INST>"
}

fn point(sample: Option<Sample>) -> (f64, f64) {
    match sample {
        Some(Sample::Point(x, y)) => (x, y),
        other => panic!("expected a point, got {other:?}"),
    }
}

fn run<M: Monitor>(monitor: &mut M, step: u64, payload: &str, series: usize) -> Option<Sample> {
    monitor.update(StepIndex(step), &parse(payload), series).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

/// Monitor that fails on every even step.
struct EvenFails;

impl Monitor for EvenFails {
    fn title(&self) -> &str {
        "EvenFails"
    }

    fn axes(&self) -> (&str, &str) {
        ("Instant", "Step")
    }

    fn update(&mut self, step: StepIndex, _snapshot: &StepSnapshot, _series: usize) -> crate::MonitorResult<Option<Sample>> {
        if step.get() % 2 == 0 {
            return Err(MonitorError::NoTravelTime);
        }
        Ok(Some(Sample::Point(step.get() as f64, 1.0)))
    }
}

// ── Scalar monitors ───────────────────────────────────────────────────────────

#[cfg(test)]
mod scalar {
    use super::*;

    #[test]
    fn accumulation_reports_announced_count() {
        assert_eq!(point(run(&mut Accumulation, 6, STEP_6, 0)), (6.0, 3.0));
    }

    #[test]
    fn mfd_is_count_against_production() {
        assert_eq!(point(run(&mut Mfd, 6, STEP_6, 0)), (3.0, 127.0));
    }

    #[test]
    fn mfd_without_vehicles_has_no_sample() {
        let empty = StepSnapshot::empty(1.0);
        assert!(Mfd.update(StepIndex(1), &empty, 0).unwrap().is_none());
    }

    #[test]
    fn flow_is_a_point_cloud() {
        let Some(Sample::Cloud(points)) = run(&mut Flow, 6, STEP_6, 0) else {
            panic!("expected a cloud");
        };
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        assert_eq!(xs, vec![843554.88, 843559.27, 843163.8]);
        assert_eq!(ys, vec![6519864.04, 6519838.26, 6519886.77]);
        assert!(Flow.update(StepIndex(1), &StepSnapshot::empty(1.0), 0).unwrap().is_none());
    }
}

// ── Vehicle indicators ────────────────────────────────────────────────────────

#[cfg(test)]
mod vehicles {
    use super::*;

    fn pair(indicator: Indicator) -> VehicleIndicator {
        VehicleIndicator::new(vec![VehicleId(0), VehicleId(1)], indicator)
    }

    #[test]
    fn one_series_per_vehicle() {
        assert_eq!(pair(Indicator::Speed).series(), vec!["0", "1"]);
    }

    #[test]
    fn speed() {
        let mut m = pair(Indicator::Speed);
        assert_eq!(point(run(&mut m, 6, STEP_6, 0)), (6.0, 14.0));
        assert_eq!(point(run(&mut m, 6, STEP_6, 1)), (6.0, 99.0));
    }

    #[test]
    fn acceleration() {
        let mut m = pair(Indicator::Acceleration);
        assert_eq!(point(run(&mut m, 6, STEP_6, 0)), (6.0, 2.0));
        assert_eq!(point(run(&mut m, 6, STEP_6, 1)), (6.0, 0.0));
    }

    #[test]
    fn distance_accumulates_between_positions() {
        let mut m = pair(Indicator::Distance);
        assert_eq!(point(run(&mut m, 6, STEP_6, 0)), (6.0, 0.0));
        let (x, y) = point(run(&mut m, 6, STEP_7, 0));
        assert_eq!(x, 6.0);
        assert_close(y, 13.998660650031834);
    }

    #[test]
    fn absent_vehicle_has_no_sample() {
        let mut m = VehicleIndicator::new(vec![VehicleId(9)], Indicator::Speed);
        assert!(run(&mut m, 6, STEP_6, 0).is_none());
    }

    #[test]
    fn distance_restarts_after_absence() {
        let mut m = VehicleIndicator::new(vec![VehicleId(5)], Indicator::Distance);
        assert_eq!(point(run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0)), (1.0, 0.0));
        assert_eq!(point(run(&mut m, 2, &payload(2.0, &[], &[(5, "A", 100.0, 0.0)]), 0)), (2.0, 100.0));
        assert!(run(&mut m, 3, &payload(3.0, &[], &[]), 0).is_none());
        // the id now names a vehicle somewhere else
        assert_eq!(point(run(&mut m, 4, &payload(4.0, &[], &[(5, "B", 1000.0, 0.0)]), 0)), (4.0, 0.0));
        assert_eq!(point(run(&mut m, 5, &payload(5.0, &[], &[(5, "B", 1003.0, 4.0)]), 0)), (5.0, 5.0));
    }

    #[test]
    fn distance_restarts_on_creation() {
        let mut m = VehicleIndicator::new(vec![VehicleId(5)], Indicator::Distance);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        assert_eq!(point(run(&mut m, 2, &payload(2.0, &[5], &[(5, "B", 600.0, 800.0)]), 0)), (2.0, 0.0));
        assert_eq!(point(run(&mut m, 3, &payload(3.0, &[], &[(5, "B", 603.0, 804.0)]), 0)), (3.0, 5.0));
    }

    #[test]
    fn speed_follows_the_current_holder() {
        let mut m = VehicleIndicator::new(vec![VehicleId(5)], Indicator::Speed);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        assert_eq!(point(run(&mut m, 2, &payload(2.0, &[5], &[(5, "B", 50.0, 0.0)]), 0)), (2.0, 10.0));
    }
}

// ── Zone monitors ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod zones {
    use super::*;

    #[test]
    fn total_travel_time() {
        let mut m = TotalTravelTime::new(["Rue_Crequi_SN_1"]);
        assert_eq!(point(run(&mut m, 6, STEP_6, 0)), (6.0, 0.0));
        assert_eq!(point(run(&mut m, 7, STEP_7, 0)), (7.0, 2.0));
    }

    #[test]
    fn total_travel_distance() {
        let mut m = TotalTravelDistance::new(["Rue_Crequi_SN_1"]);
        run(&mut m, 6, STEP_6, 0);
        let (x, y) = point(run(&mut m, 7, STEP_7, 0));
        assert_eq!(x, 7.0);
        assert_close(y, 27.997321300063668);
    }

    #[test]
    fn off_period_steps_are_skipped() {
        let mut m = TotalTravelTime::new(["Rue_Crequi_SN_1"]).aggregation_period(2);
        assert!(run(&mut m, 7, STEP_7, 0).is_none());
        assert_eq!(point(run(&mut m, 6, STEP_6, 0)), (6.0, 0.0));
        assert_eq!(m.total(), 0.0);
    }

    #[test]
    fn leaving_vehicles_are_forgotten() {
        let mut m = TotalTravelTime::new(["Rue_Duguesclin_NS_1"]);
        run(&mut m, 7, STEP_7, 0);
        // vehicle 3 is absent at step 6, so re-entering starts a new stay
        run(&mut m, 8, STEP_6, 0);
        run(&mut m, 9, STEP_7, 0);
        assert_eq!(m.total(), 0.0);
    }

    #[test]
    fn reused_id_adds_no_travel_distance() {
        let mut m = TotalTravelDistance::new(["A"]);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        run(&mut m, 2, &payload(2.0, &[5], &[(5, "A", 3000.0, 4000.0)]), 0);
        assert_eq!(m.total(), 0.0);
        run(&mut m, 3, &payload(3.0, &[], &[(5, "A", 3003.0, 4004.0)]), 0);
        assert_close(m.total(), 5.0);
    }

    #[test]
    fn absent_id_adds_no_travel_distance() {
        let mut m = TotalTravelDistance::new(["A"]);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        run(&mut m, 2, &payload(2.0, &[], &[]), 0);
        run(&mut m, 3, &payload(3.0, &[], &[(5, "A", 1000.0, 0.0)]), 0);
        assert_eq!(m.total(), 0.0);
    }

    #[test]
    fn reused_id_adds_no_travel_time() {
        let mut m = TotalTravelTime::new(["A"]);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        run(&mut m, 2, &payload(2.0, &[5], &[(5, "A", 0.0, 0.0)]), 0);
        assert_eq!(m.total(), 0.0);
        run(&mut m, 3, &payload(3.0, &[], &[(5, "A", 10.0, 0.0)]), 0);
        assert_close(m.total(), 1.0);
    }

    #[test]
    fn influx_counts_new_arrivals() {
        let mut m = Flux::new(["Rue_Duguesclin_NS_1"]);
        assert_eq!(m.series(), vec!["InFlux", "OutFlux"]);
        assert_eq!(point(run(&mut m, 6, STEP_6, 0)), (6.0, 0.0));
        assert_eq!(point(run(&mut m, 7, STEP_7, 0)), (7.0, 1.0));
        // already inside
        assert_eq!(point(run(&mut m, 8, STEP_7, 0)), (8.0, 0.0));
    }

    #[test]
    fn outflux_counts_departures() {
        let mut m = Flux::new(["Rue_Duguesclin_NS_1"]);
        run(&mut m, 7, STEP_7, 0);
        assert_eq!(point(run(&mut m, 7, STEP_7, 1)), (7.0, 0.0));
        assert_eq!(point(run(&mut m, 8, STEP_6, 1)), (8.0, 1.0));
    }

    #[test]
    fn flux_counts_reentry_after_leaving_network() {
        let mut m = Flux::new(["A"]);
        let here = payload(1.0, &[], &[(5, "A", 0.0, 0.0)]);
        let gone = payload(2.0, &[], &[]);
        assert_eq!(point(run(&mut m, 1, &here, 0)), (1.0, 1.0));
        assert_eq!(point(run(&mut m, 1, &here, 1)), (1.0, 0.0));
        assert_eq!(point(run(&mut m, 2, &gone, 0)), (2.0, 0.0));
        assert_eq!(point(run(&mut m, 2, &gone, 1)), (2.0, 1.0));
        assert_eq!(point(run(&mut m, 3, &here, 0)), (3.0, 1.0));
    }

    #[test]
    fn flux_counts_id_reused_in_one_step() {
        let mut m = Flux::new(["A"]);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 1);
        let reused = payload(2.0, &[5], &[(5, "A", 0.0, 0.0)]);
        assert_eq!(point(run(&mut m, 2, &reused, 0)), (2.0, 1.0));
        assert_eq!(point(run(&mut m, 2, &reused, 1)), (2.0, 1.0));
    }

    #[test]
    fn flux_ignores_return_from_rest_of_network() {
        let mut m = Flux::new(["A"]);
        run(&mut m, 1, &payload(1.0, &[], &[(5, "A", 0.0, 0.0)]), 0);
        let elsewhere = payload(2.0, &[], &[(5, "B", 0.0, 0.0)]);
        assert_eq!(point(run(&mut m, 2, &elsewhere, 0)), (2.0, 0.0));
        assert_eq!(point(run(&mut m, 2, &elsewhere, 1)), (2.0, 0.0));
        assert_eq!(point(run(&mut m, 3, &payload(3.0, &[], &[(5, "A", 0.0, 0.0)]), 0)), (3.0, 0.0));
    }

    #[test]
    fn flux_holds_counts_until_boundary() {
        let mut m = Flux::new(["Rue_Duguesclin_NS_1"]).aggregation_period(2);
        assert!(run(&mut m, 7, STEP_7, 0).is_none());
        assert_eq!(point(run(&mut m, 8, STEP_7, 0)), (8.0, 1.0));
    }

    #[test]
    fn zone_speed_needs_travel_time() {
        let mut m = ZoneSpeed::new(["Rue_Crequi_SN_1"]);
        let err = m.update(StepIndex(6), &parse(STEP_6), 0).unwrap_err();
        assert!(matches!(err, MonitorError::NoTravelTime));
        assert_eq!(m.fallback(StepIndex(6), 0), Some(Sample::Point(6.0, MFD_FLOOR_SPEED)));

        let (_, speed) = point(run(&mut m, 7, STEP_7, 0));
        assert_close(speed, 27.997321300063668 / 2.0);
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod manager {
    use super::*;

    #[test]
    fn records_per_series() {
        let mut manager = MonitorManager::new();
        let veh = manager.add(VehicleIndicator::new(vec![VehicleId(0), VehicleId(3)], Indicator::Speed));
        manager.update(StepIndex(6), &parse(STEP_6));
        manager.update(StepIndex(7), &parse(STEP_7));
        assert_eq!(manager.series(veh), ["0", "3"]);
        assert_eq!(manager.samples(veh, 0).len(), 2);
        assert_eq!(manager.samples(veh, 1), [Sample::Point(7.0, 14.0)]);
    }

    #[test]
    fn failures_use_fallback_and_spare_others() {
        let mut manager = MonitorManager::new();
        let speed = manager.add(ZoneSpeed::new(["Rue_Crequi_SN_1"]));
        let even = manager.add(EvenFails);
        let acc = manager.add(Accumulation);

        manager.update(StepIndex(6), &parse(STEP_6));
        manager.update(StepIndex(7), &parse(STEP_7));

        assert_eq!(manager.failures(), 2);
        assert_eq!(manager.samples(speed, 0)[0], Sample::Point(6.0, MFD_FLOOR_SPEED));
        assert_eq!(manager.samples(speed, 0).len(), 2);
        // no fallback defined: the failed step is simply missing
        assert_eq!(manager.samples(even, 0), [Sample::Point(7.0, 1.0)]);
        assert_eq!(manager.samples(acc, 0).len(), 2);
    }

    #[test]
    fn unknown_ids_are_empty() {
        let manager = MonitorManager::new();
        assert!(manager.samples(crate::MonitorId(4), 0).is_empty());
        assert!(manager.title(crate::MonitorId(4)).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn write_csv_flattens_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = MonitorManager::new();
        manager.add(Accumulation);
        manager.add(Flow);
        manager.update(StepIndex(6), &parse(STEP_6));

        let path = manager.write_csv(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("monitors.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), ["monitor", "series", "x", "y"]);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[0][0], "Accumulation");
        assert_eq!(&rows[0][3], "3");
        assert!(rows[1..].iter().all(|r| &r[0] == "Flow"));
    }
}

// ── Session integration ───────────────────────────────────────────────────────

#[cfg(test)]
mod session {
    use super::*;

    const SCENARIO: &str = r#"<ROOT>
  <SIMULATIONS>
    <SIMULATION id="s" pasdetemps="1" debut="00:00:00" fin="00:00:05"/>
  </SIMULATIONS>
  <TRAFICS>
    <TRAFIC id="t">
      <TRONCONS>
        <TRONCON id="Rue_Crequi_SN_1"/>
      </TRONCONS>
      <TYPES_DE_VEHICULE>
        <TYPE_DE_VEHICULE id="VL"/>
      </TYPES_DE_VEHICULE>
    </TRAFIC>
  </TRAFICS>
</ROOT>"#;

    #[test]
    fn manager_observes_a_run() {
        let scenario = Arc::new(ScenarioLoader::new().load_str(SCENARIO).unwrap());
        let engine = ReplayEngine::new([STEP_6, STEP_7]).cycle();
        let manager = Rc::new(RefCell::new(MonitorManager::new()));
        let acc = manager.borrow_mut().add(Accumulation);
        let speed = manager.borrow_mut().add(VehicleIndicator::new(vec![VehicleId(3)], Indicator::Speed));

        let mut session = SessionBuilder::new(SessionConfig::default(), move |_: &EngineConfig| {
            Ok::<_, EngineError>(engine.clone())
        })
        .scenario(scenario)
        .observer(manager.clone())
        .open()
        .unwrap();
        session.run().unwrap();

        let manager = manager.borrow();
        let xs: Vec<f64> = manager.samples(acc, 0).iter().flat_map(Sample::points).map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // vehicle 3 only exists in every other payload
        assert_eq!(manager.samples(speed, 0), [Sample::Point(1.0, 14.0), Sample::Point(3.0, 14.0)]);
        assert_eq!(manager.failures(), 0);
    }
}
