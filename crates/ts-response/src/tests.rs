//! Unit tests for ts-response.

use ts_core::{Position, StepIndex, VehicleId};

use crate::{ParseError, StepSnapshot, VehicleTracker, parse_step};

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

fn snapshot_with(ids: &[(u32, &str)]) -> StepSnapshot {
    let mut xml = String::from(r#"<INST nbVeh="0" val="1.00"><TRAJS>"#);
    for (id, ty) in ids {
        xml.push_str(&format!(r#"<TRAJ id="{id}" tron="L" voie="1" type="{ty}"/>"#));
    }
    xml.push_str("</TRAJS></INST>");
    parse(&xml)
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod parser {
    use super::*;

    #[test]
    fn header_and_vehicles() {
        let snap = parse(STEP_6);
        assert_eq!(snap.time, 6.0);
        assert_eq!(snap.reported_vehicle_count, 3);
        assert_eq!(snap.vehicles().len(), 3);

        let v0 = snap.vehicle(VehicleId(0)).unwrap();
        assert_eq!(v0.link, "Rue_Crequi_SN_1");
        assert_eq!(v0.vehicle_type, "VL");
        assert_eq!(v0.lane, 1);
        assert_eq!(v0.speed, 14.0);
        assert_eq!(v0.acceleration, 2.0);
        assert_eq!(v0.position, 43.56);
        assert_eq!(v0.coordinates, Position::new(843554.88, 6519864.04));
        assert_eq!(v0.leader, None);
        assert!(!v0.driven);

        assert_eq!(snap.vehicle(VehicleId(1)).unwrap().leader, Some(VehicleId(0)));
        assert_eq!(snap.vehicle(VehicleId(1)).unwrap().speed, 99.0);
    }

    #[test]
    fn events_and_entry_queues() {
        let snap = parse(STEP_7);
        assert_eq!(snap.creations().len(), 1);
        let created = &snap.creations()[0];
        assert_eq!(created.id, VehicleId(3));
        assert_eq!(created.origin, "E_Duguesclin_N");
        assert_eq!(created.destination, "S_Duguesclin_S");
        assert!(snap.exits().is_empty());
        assert_eq!(snap.entry_queues().len(), 9);
        assert!(snap.entry_queues().iter().all(|q| q.waiting == 0));
    }

    #[test]
    fn reported_count_may_differ_from_records() {
        let snap = parse(STEP_7);
        assert_eq!(snap.reported_vehicle_count, 3);
        assert_eq!(snap.vehicles().len(), 4);
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse(STEP_6), parse(STEP_6));
    }

    #[test]
    fn trailing_nul_bytes_are_ignored() {
        let mut buf = vec![0u8; 8192];
        buf[..STEP_6.len()].copy_from_slice(STEP_6.as_bytes());
        assert_eq!(parse_step(&buf).unwrap(), parse(STEP_6));
    }

    #[test]
    fn empty_vehicle_list_is_valid() {
        let snap = parse(r#"<INST nbVeh="0" val="1.00"><CREATIONS/><SORTIES/><TRAJS/></INST>"#);
        assert!(snap.is_empty());
        assert_eq!(snap.mean_speed(), None);
    }

    #[test]
    fn empty_payload() {
        assert_eq!(parse_step(b""), Err(ParseError::Empty));
        assert_eq!(parse_step(&[0u8; 16]), Err(ParseError::Empty));
    }

    #[test]
    fn truncated_payload() {
        let cut = &STEP_6[..STEP_6.find("<STREAMS/>").unwrap()];
        assert_eq!(parse_step(cut.as_bytes()), Err(ParseError::Truncated));
    }

    #[test]
    fn wrong_root_element() {
        let err = parse_step(b"<OUT/>").unwrap_err();
        assert_eq!(err, ParseError::MissingInstant("OUT".into()));
    }

    #[test]
    fn bad_number_names_field_and_value() {
        let err = parse_step(br#"<INST val="1"><TRAJS><TRAJ id="0" vit="fast"/></TRAJS></INST>"#)
            .unwrap_err();
        assert_eq!(err, ParseError::InvalidValue { field: "vit", value: "fast".into() });
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = parse_step(br#"<INST val="1"><TRAJS><TRAJ vit="3"/></TRAJS></INST>"#).unwrap_err();
        assert_eq!(err, ParseError::MissingField { element: "TRAJ", field: "id" });
    }

    #[test]
    fn missing_time_is_rejected() {
        let err = parse_step(br#"<INST nbVeh="0"></INST>"#).unwrap_err();
        assert_eq!(err, ParseError::MissingField { element: "INST", field: "val" });
    }

    #[test]
    fn duplicate_id_keeps_last_entry() {
        let snap = parse(
            r#"<INST val="2"><TRAJS><TRAJ id="4" vit="1"/><TRAJ id="5" vit="2"/><TRAJ id="4" vit="9"/></TRAJS></INST>"#,
        );
        assert_eq!(snap.vehicles().len(), 2);
        assert_eq!(snap.vehicle(VehicleId(4)).unwrap().speed, 9.0);
        assert_eq!(snap.vehicles()[0].id, VehicleId(4));
    }

    #[test]
    fn optional_attributes() {
        let snap = parse(
            r#"<INST val="2"><TRAJS><TRAJ id="1" dst_parcourue="120.5" etat_pilotage="force" deltaN="1.00" unknown="x"/></TRAJS></INST>"#,
        );
        let v = snap.vehicle(VehicleId(1)).unwrap();
        assert_eq!(v.travelled, Some(120.5));
        assert!(v.driven);
        assert!(snap.is_driven(VehicleId(1)));
    }

    #[test]
    fn nb_veh_defaults_to_record_count() {
        let snap = snapshot_with(&[(0, "VL"), (1, "VL")]);
        assert_eq!(snap.reported_vehicle_count, 0);
        let snap = parse(r#"<INST val="2"><TRAJS><TRAJ id="1"/></TRAJS></INST>"#);
        assert_eq!(snap.reported_vehicle_count, 1);
    }
}

// ── Snapshot queries ──────────────────────────────────────────────────────────

#[cfg(test)]
mod queries {
    use super::*;

    #[test]
    fn membership() {
        let snap = parse(STEP_6);
        assert!(snap.contains(VehicleId(2)));
        assert!(!snap.contains(VehicleId(3)));
        assert!(snap.contains_all(&[VehicleId(0), VehicleId(1)]));
        assert!(!snap.contains_all(&[VehicleId(0), VehicleId(3)]));
    }

    #[test]
    fn links_and_lanes() {
        let snap = parse(STEP_6);
        assert_eq!(snap.vehicles_on_link("Rue_Crequi_SN_1", 1), vec![VehicleId(0), VehicleId(1)]);
        assert!(snap.vehicles_on_link("Rue_Crequi_SN_1", 2).is_empty());
        assert!(snap.is_on_link(VehicleId(2), "Cr_Lafayette_OE_1"));
        assert_eq!(snap.link_of(VehicleId(0)), Some("Rue_Crequi_SN_1"));
        assert_eq!(snap.link_of(VehicleId(9)), None);
        assert_eq!(snap.link_map().count(), 3);
    }

    #[test]
    fn neighbours_on_same_lane() {
        let snap = parse(STEP_6);
        // Vehicle 0 is at 43.56 m, vehicle 1 behind it at 17.41 m.
        assert_eq!(snap.downstream_of(VehicleId(1)), vec![VehicleId(0)]);
        assert_eq!(snap.upstream_of(VehicleId(0)), vec![VehicleId(1)]);
        assert!(snap.downstream_of(VehicleId(0)).is_empty());
        assert!(snap.upstream_of(VehicleId(2)).is_empty());
        assert!(snap.downstream_of(VehicleId(42)).is_empty());
    }

    #[test]
    fn mean_speed() {
        let snap = parse(STEP_6);
        assert_eq!(snap.mean_speed(), Some((14.0 + 99.0 + 14.0) / 3.0));
    }

    #[test]
    fn empty_snapshot_keeps_time() {
        let snap = StepSnapshot::empty(12.0);
        assert_eq!(snap.time, 12.0);
        assert!(snap.is_empty());
        assert!(snap.creations().is_empty());
    }
}

// ── Tracker ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tracker {
    use super::*;

    #[test]
    fn steady_vehicles_keep_generation() {
        let mut tracker = VehicleTracker::new();
        let first = tracker.observe(StepIndex(0), &parse(STEP_6));
        assert_eq!(first.entered.len(), 3);
        assert!(first.left.is_empty());

        let second = tracker.observe(StepIndex(1), &parse(STEP_7));
        assert_eq!(second.entered, vec![(VehicleId(3), 0)]);
        assert_eq!(tracker.generation(VehicleId(0)), Some(0));
        assert_eq!(tracker.first_seen(VehicleId(0)), Some(StepIndex(0)));
        assert_eq!(tracker.first_seen(VehicleId(3)), Some(StepIndex(1)));
        assert_eq!(tracker.active().count(), 4);
    }

    #[test]
    fn reused_id_after_gap_is_a_new_vehicle() {
        let mut tracker = VehicleTracker::new();
        tracker.observe(StepIndex(0), &snapshot_with(&[(7, "VL")]));
        let gap = tracker.observe(StepIndex(1), &snapshot_with(&[]));
        assert_eq!(gap.left.len(), 1);
        assert_eq!(gap.left[0].last_seen, StepIndex(0));
        assert_eq!(tracker.generation(VehicleId(7)), None);

        let back = tracker.observe(StepIndex(2), &snapshot_with(&[(7, "VL")]));
        assert_eq!(back.entered, vec![(VehicleId(7), 1)]);
        assert_eq!(tracker.first_seen(VehicleId(7)), Some(StepIndex(2)));
        assert_eq!(tracker.retired_count(), 1);
    }

    #[test]
    fn type_change_is_a_new_vehicle() {
        let mut tracker = VehicleTracker::new();
        tracker.observe(StepIndex(0), &snapshot_with(&[(2, "VL")]));
        let update = tracker.observe(StepIndex(1), &snapshot_with(&[(2, "PL")]));
        assert_eq!(update.entered, vec![(VehicleId(2), 1)]);
        assert_eq!(update.left[0].vehicle_type, "VL");
    }

    #[test]
    fn creation_of_active_id_is_a_new_vehicle() {
        let mut tracker = VehicleTracker::new();
        tracker.observe(StepIndex(0), &snapshot_with(&[(3, "VL")]));
        let recreated = parse(
            r#"<INST val="2"><CREATIONS><CREATION id="3" entree="E" sortie="S" type="VL"/></CREATIONS><TRAJS><TRAJ id="3" type="VL"/></TRAJS></INST>"#,
        );
        let update = tracker.observe(StepIndex(1), &recreated);
        assert_eq!(update.left.len(), 1);
        assert_eq!(tracker.generation(VehicleId(3)), Some(1));
    }
}
