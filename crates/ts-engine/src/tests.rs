//! Unit tests for ts-engine.

use std::path::Path;

use ts_core::VehicleId;

use crate::{
    Engine, EngineBinder, EngineCall, EngineConfig, EngineError, LaunchMode, NativeBinder, ReplayEngine,
    ResponseBuffer,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const STEP_1: &str = r#"<INST nbVeh="0" val="1.00"><TRAJS/></INST>"#;
const STEP_2: &str = r#"<INST nbVeh="1" val="2.00"><TRAJS><TRAJ id="0" tron="L_1"/></TRAJS></INST>"#;

// ── ResponseBuffer ────────────────────────────────────────────────────────────

#[cfg(test)]
mod buffer {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = ResponseBuffer::with_capacity(64);
        assert_eq!(buf.capacity(), 64);
        assert!(buf.payload().is_empty());
    }

    #[test]
    fn payload_stops_at_first_nul() {
        let mut buf = ResponseBuffer::with_capacity(64);
        buf.fill(b"<INST/>");
        assert_eq!(buf.payload(), b"<INST/>");
        buf.fill(b"ab");
        // Earlier, longer content beyond the terminator is not visible.
        assert_eq!(buf.payload(), b"ab");
    }

    #[test]
    fn overlong_fill_is_cut_and_capacity_kept() {
        let mut buf = ResponseBuffer::with_capacity(4);
        assert_eq!(buf.fill(b"abcdef"), 3);
        assert_eq!(buf.payload(), b"abc");
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn clear_empties_payload() {
        let mut buf = ResponseBuffer::with_capacity(16);
        buf.fill(b"xyz");
        buf.clear();
        assert!(buf.payload().is_empty());
    }

    #[test]
    fn zero_capacity_still_holds_terminator() {
        let mut buf = ResponseBuffer::with_capacity(0);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.fill(b"a"), 0);
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_capacity, 1_000_000);
        assert!(!config.trace_flow);
        assert_eq!(config.launch_mode, LaunchMode::Full);
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::new("/opt/libengine.so")
            .buffer_capacity(10)
            .trace_flow(true)
            .launch_mode(LaunchMode::Lite);
        assert_eq!(config.library_path, Path::new("/opt/libengine.so"));
        assert_eq!(config.buffer_capacity, 10);
        assert!(config.trace_flow);
        assert_eq!(config.launch_mode, LaunchMode::Lite);
    }
}

// ── Native binding ────────────────────────────────────────────────────────────

#[cfg(test)]
mod native {
    use super::*;

    #[test]
    fn missing_library_is_a_load_error() {
        let config = EngineConfig::new("/definitely/not/here/libengine.so");
        let err = NativeBinder.bind(&config).unwrap_err();
        assert!(matches!(err, EngineError::LoadLibrary { .. }), "{err}");
    }

    #[test]
    fn id_list_parsing() {
        let ids = crate::engine::parse_id_list("3 7 12 ");
        assert_eq!(ids, vec![VehicleId(3), VehicleId(7), VehicleId(12)]);
        assert!(crate::engine::parse_id_list("").is_empty());
    }
}

// ── Replay engine ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod replay {
    use super::*;

    #[test]
    fn replays_payloads_in_order_then_ends() {
        let mut engine = ReplayEngine::new([STEP_1, STEP_2]);
        let mut buf = ResponseBuffer::with_capacity(1024);

        let first = engine.run_next_step(&mut buf, false).unwrap();
        assert_eq!(buf.payload(), STEP_1.as_bytes());
        assert!(first.more_remaining);

        let second = engine.run_next_step(&mut buf, false).unwrap();
        assert_eq!(buf.payload(), STEP_2.as_bytes());
        assert!(!second.more_remaining);

        engine.run_next_step(&mut buf, false).unwrap();
        assert!(buf.payload().is_empty());
    }

    #[test]
    fn cycling_never_ends() {
        let mut engine = ReplayEngine::new([STEP_1]).cycle();
        let mut buf = ResponseBuffer::with_capacity(1024);
        for _ in 0..5 {
            assert!(engine.run_next_step(&mut buf, true).unwrap().more_remaining);
            assert_eq!(buf.payload(), STEP_1.as_bytes());
        }
    }

    #[test]
    fn records_every_call() {
        let mut engine = ReplayEngine::new([STEP_1]);
        let log = engine.log();
        engine.load_network(Path::new("net.xml")).unwrap();
        let id = engine.create_vehicle("VL", "E_1", "S_1", 1, 0.5).unwrap();
        engine.drive_vehicle(VehicleId(0), "L_1", 1, 12.0, true).unwrap();
        engine.run_next_step_lite(false).unwrap();

        assert_eq!(id, 0);
        assert_eq!(log.len(), 4);
        assert_eq!(log.steps(), 1);
        assert_eq!(log.calls()[0], EngineCall::LoadNetwork("net.xml".into()));
        assert_eq!(log.calls()[1], EngineCall::CreateVehicle {
            vehicle_type: "VL".into(),
            origin:       "E_1".into(),
            destination:  "S_1".into(),
            lane:         1,
            time:         0.5,
        });
    }

    #[test]
    fn scripted_failures() {
        let mut engine = ReplayEngine::default().without_routes().fail_next_drive().script_apply(-4);
        let log = engine.log();
        assert!(matches!(
            engine.create_vehicle_with_route("a", "b", "VL", 1, 0.0, "L_1 L_2"),
            Err(EngineError::Unsupported("SymCreateVehicleWithRouteEx"))
        ));
        assert!(matches!(
            engine.drive_vehicle(VehicleId(0), "L_1", 1, 1.0, true),
            Err(EngineError::InvalidArgument { what: "link", .. })
        ));
        assert_eq!(engine.drive_vehicle(VehicleId(0), "L_1", 1, 1.0, true).unwrap(), 0);
        assert_eq!(engine.apply_control_zones().unwrap(), -4);
        assert_eq!(engine.apply_control_zones().unwrap(), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn scripted_codes_and_metrics() {
        let mut engine = ReplayEngine::default()
            .script_create(-2)
            .script_drive(-5)
            .zone_metrics("Z", 40.0, 400.0)
            .zone_vehicles("Z", &[VehicleId(4)]);
        assert_eq!(engine.create_vehicle("VL", "a", "b", 1, 0.0).unwrap(), -2);
        assert_eq!(engine.create_vehicle("VL", "a", "b", 1, 0.0).unwrap(), 0);
        assert_eq!(engine.create_vehicle("VL", "a", "b", 1, 0.0).unwrap(), 1);
        assert_eq!(engine.drive_vehicle(VehicleId(0), "L", 1, 0.0, true).unwrap(), -5);
        assert_eq!(engine.total_travel_time("Z").unwrap(), 40.0);
        assert_eq!(engine.total_travel_distance("Z").unwrap(), 400.0);
        assert_eq!(engine.total_travel_time("other").unwrap(), 0.0);
        assert_eq!(engine.vehicles_in_zone("Z").unwrap(), vec![VehicleId(4)]);
    }

    #[test]
    fn control_zone_handles_are_consecutive() {
        let mut engine = ReplayEngine::default();
        assert_eq!(engine.add_control_zone(0.5, 100.0, "L_1 L_2").unwrap(), 0);
        assert_eq!(engine.add_control_zone(0.8, 50.0, "L_3").unwrap(), 1);
        assert_eq!(engine.modify_control_zone(1, 0.2).unwrap(), 1);
    }

    #[test]
    fn failures() {
        let mut engine = ReplayEngine::new([STEP_1, STEP_2]).fail_steps_from(1).reject_network();
        let mut buf = ResponseBuffer::with_capacity(1024);
        assert!(matches!(engine.load_network(Path::new("n.xml")), Err(EngineError::NetworkRejected(_))));
        engine.run_next_step(&mut buf, false).unwrap();
        assert!(matches!(engine.run_next_step(&mut buf, false), Err(EngineError::StepFailed)));
    }

    #[test]
    fn closure_is_a_binder() {
        let prepared = ReplayEngine::new([STEP_1]);
        let log = prepared.log();
        let binder = move |_: &EngineConfig| Ok::<_, EngineError>(prepared.clone());
        let mut engine = binder.bind(&EngineConfig::default()).unwrap();
        engine.unload_network().unwrap();
        assert_eq!(log.calls(), vec![EngineCall::UnloadNetwork]);
    }

    #[test]
    fn from_dir_reads_xml_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002.xml"), STEP_2).unwrap();
        std::fs::write(dir.path().join("001.xml"), STEP_1).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut engine = ReplayEngine::from_dir(dir.path()).unwrap();
        let mut buf = ResponseBuffer::with_capacity(1024);
        engine.run_next_step(&mut buf, false).unwrap();
        assert_eq!(buf.payload(), STEP_1.as_bytes());
        assert!(!engine.run_next_step(&mut buf, false).unwrap().more_remaining);
    }
}
