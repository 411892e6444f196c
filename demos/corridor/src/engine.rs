//! A synthetic engine driving vehicles along a straight corridor.
//!
//! Good enough to exercise the session end to end without a native engine
//! library: vehicles follow their leader with a crude gap rule, spawn at
//! random at the west entry, and leave past the last link.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use ts_core::VehicleId;
use ts_engine::{Engine, EngineError, EngineResult, ResponseBuffer, StepOutcome};

pub const LINK_LENGTH: f64 = 300.0;
pub const LINKS: [&str; 3] = ["Corridor_1", "Corridor_2", "Corridor_3"];

const STEP_SECS:     f64 = 1.0;
const FREE_SPEED:    f64 = 13.9;
const MIN_GAP:       f64 = 7.0;
const SPAWN_PROB:    f64 = 0.25;
/// Corridor origin in projected coordinates.
const ORIGIN:        (f64, f64) = (843_000.0, 6_519_000.0);

#[derive(Clone, Debug)]
struct Car {
    id:           u32,
    vehicle_type: String,
    /// Distance from the corridor start, metres.
    offset:       f64,
    speed:        f64,
    acceleration: f64,
    lane:         i32,
}

impl Car {
    fn link(&self) -> usize {
        ((self.offset / LINK_LENGTH) as usize).min(LINKS.len() - 1)
    }

    fn position(&self) -> f64 {
        self.offset - self.link() as f64 * LINK_LENGTH
    }
}

struct Creation {
    id:           u32,
    vehicle_type: String,
}

/// Synthetic [`Engine`] for the corridor scenario.
pub struct CorridorEngine {
    rng:          SmallRng,
    time:         f64,
    next_id:      u32,
    cars:         Vec<Car>,
    created:      Vec<Creation>,
    /// Sensor id → link indices.
    zones:        HashMap<String, Vec<usize>>,
    /// Per sensor: accumulated (time, distance).
    totals:       HashMap<String, (f64, f64)>,
    access_rates: Vec<f64>,
    loaded:       bool,
}

impl CorridorEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            rng:          SmallRng::seed_from_u64(seed),
            time:         0.0,
            next_id:      0,
            cars:         Vec::new(),
            created:      Vec::new(),
            zones:        HashMap::new(),
            totals:       HashMap::new(),
            access_rates: Vec::new(),
            loaded:       false,
        }
    }

    /// Declare a sensor over `links`; unknown link ids are ignored.
    pub fn with_zone<S: AsRef<str>>(mut self, id: &str, links: &[S]) -> Self {
        let indices = links
            .iter()
            .filter_map(|l| LINKS.iter().position(|known| *known == l.as_ref()))
            .collect();
        self.zones.insert(id.to_owned(), indices);
        self
    }

    fn spawn(&mut self, vehicle_type: &str, offset: f64, lane: i32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.cars.push(Car {
            id,
            vehicle_type: vehicle_type.to_owned(),
            offset,
            speed: FREE_SPEED * 0.5,
            acceleration: 0.0,
            lane,
        });
        self.created.push(Creation { id, vehicle_type: vehicle_type.to_owned() });
        id
    }

    /// Advance one step and return the ids that left the corridor.
    fn tick(&mut self) -> Vec<u32> {
        self.time += STEP_SECS;

        let admit = self.access_rates.iter().copied().fold(1.0, f64::min);
        if self.rng.gen_bool(SPAWN_PROB * admit) {
            let vehicle_type = if self.rng.gen_bool(0.1) { "PL" } else { "VL" };
            self.spawn(vehicle_type, 0.0, 1);
        }

        // Front to back so each car sees its leader's new offset.
        self.cars.sort_by(|a, b| b.offset.total_cmp(&a.offset));
        let mut leader: Option<f64> = None;
        for car in &mut self.cars {
            let noise: f64 = self.rng.gen_range(-0.5..0.5);
            let wanted = (FREE_SPEED + noise).max(0.0);
            let allowed = leader.map_or(wanted, |front| ((front - car.offset - MIN_GAP) / STEP_SECS).max(0.0));
            let speed = wanted.min(allowed);
            car.acceleration = (speed - car.speed) / STEP_SECS;
            car.speed = speed;
            let before = car.link();
            car.offset += speed * STEP_SECS;
            for (zone, links) in &self.zones {
                if links.contains(&before) {
                    let total = self.totals.entry(zone.clone()).or_default();
                    total.0 += STEP_SECS;
                    total.1 += speed * STEP_SECS;
                }
            }
            leader = Some(car.offset);
        }

        let end = LINK_LENGTH * LINKS.len() as f64;
        let exited: Vec<u32> = self.cars.iter().filter(|c| c.offset >= end).map(|c| c.id).collect();
        self.cars.retain(|c| c.offset < end);
        exited
    }

    fn payload(&mut self, exited: &[u32]) -> String {
        let mut xml = format!(r#"<INST nbVeh="{}" val="{:.2}"><CREATIONS>"#, self.cars.len(), self.time);
        for c in self.created.drain(..) {
            let _ = write!(
                xml,
                r#"<CREATION entree="E_West" id="{}" sortie="S_East" type="{}"/>"#,
                c.id, c.vehicle_type
            );
        }
        xml.push_str("</CREATIONS><SORTIES>");
        for id in exited {
            let _ = write!(xml, r#"<SORTIE id="{id}" sortie="S_East"/>"#);
        }
        xml.push_str("</SORTIES><TRAJS>");
        let mut cars: Vec<&Car> = self.cars.iter().collect();
        cars.sort_by_key(|c| c.id);
        for car in cars {
            let _ = write!(
                xml,
                r#"<TRAJ abs="{:.2}" acc="{:.2}" dst="{:.2}" id="{}" ord="{:.2}" tron="{}" type="{}" vit="{:.2}" voie="{}"/>"#,
                ORIGIN.0 + car.offset,
                car.acceleration,
                car.position(),
                car.id,
                ORIGIN.1,
                LINKS[car.link()],
                car.vehicle_type,
                car.speed,
                car.lane,
            );
        }
        xml.push_str("</TRAJS><ENTREES><ENTREE id=\"E_West\" nb_veh_en_attente=\"0\"/></ENTREES></INST>");
        xml
    }

    fn zone_links(&self, zone: &str) -> EngineResult<&[usize]> {
        self.zones.get(zone).map(Vec::as_slice).ok_or_else(|| EngineError::InvalidArgument {
            what:   "zone",
            reason: format!("unknown sensor {zone}"),
        })
    }

    fn find(&mut self, id: VehicleId) -> Option<&mut Car> {
        self.cars.iter_mut().find(|c| c.id == id.get())
    }
}

impl Engine for CorridorEngine {
    fn load_network(&mut self, path: &Path) -> EngineResult<()> {
        debug!(path = %path.display(), "corridor network loaded");
        self.loaded = true;
        Ok(())
    }

    fn run_next_step(&mut self, buffer: &mut ResponseBuffer, _trace: bool) -> EngineResult<StepOutcome> {
        let exited = self.tick();
        let xml = self.payload(&exited);
        buffer.fill(xml.as_bytes());
        Ok(StepOutcome { more_remaining: true })
    }

    fn run_next_step_lite(&mut self, _trace: bool) -> EngineResult<StepOutcome> {
        self.tick();
        self.created.clear();
        Ok(StepOutcome { more_remaining: true })
    }

    fn run_to_end(&mut self, _path: &Path) -> EngineResult<i32> {
        Err(EngineError::Unsupported("run_to_end"))
    }

    fn create_vehicle(
        &mut self,
        vehicle_type: &str,
        origin:       &str,
        destination:  &str,
        lane:         i32,
        _time:        f64,
    ) -> EngineResult<i32> {
        if origin != "E_West" || destination != "S_East" {
            return Ok(-1);
        }
        Ok(self.spawn(vehicle_type, 0.0, lane) as i32)
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
        // A corridor has only one route.
        if route.split_whitespace().ne(LINKS.iter().copied()) {
            return Ok(-2);
        }
        self.create_vehicle(vehicle_type, origin, destination, lane, time)
    }

    fn drive_vehicle(
        &mut self,
        id:       VehicleId,
        link:     &str,
        lane:     i32,
        position: f64,
        _force:   bool,
    ) -> EngineResult<i32> {
        let Some(index) = LINKS.iter().position(|l| *l == link) else {
            return Ok(-3);
        };
        let Some(car) = self.find(id) else {
            return Ok(-1);
        };
        car.offset = index as f64 * LINK_LENGTH + position.clamp(0.0, LINK_LENGTH - 0.01);
        car.lane = lane;
        Ok(0)
    }

    fn alter_route(&mut self, id: VehicleId, _route: &str) -> EngineResult<i32> {
        Ok(if self.find(id).is_some() { 0 } else { -1 })
    }

    fn add_control_zone(&mut self, access_rate: f64, _min_distance: f64, _links: &str) -> EngineResult<i32> {
        self.access_rates.push(access_rate.clamp(0.0, 1.0));
        Ok(self.access_rates.len() as i32 - 1)
    }

    fn modify_control_zone(&mut self, handle: i32, access_rate: f64) -> EngineResult<i32> {
        match usize::try_from(handle).ok().and_then(|h| self.access_rates.get_mut(h)) {
            Some(rate) => {
                *rate = access_rate.clamp(0.0, 1.0);
                Ok(handle)
            }
            None => Ok(-1),
        }
    }

    fn apply_control_zones(&mut self) -> EngineResult<i32> {
        Ok(0)
    }

    fn total_travel_time(&mut self, zone: &str) -> EngineResult<f64> {
        self.zone_links(zone)?;
        Ok(self.totals.get(zone).map_or(0.0, |t| t.0))
    }

    fn total_travel_distance(&mut self, zone: &str) -> EngineResult<f64> {
        self.zone_links(zone)?;
        Ok(self.totals.get(zone).map_or(0.0, |t| t.1))
    }

    fn vehicles_in_zone(&mut self, zone: &str) -> EngineResult<Vec<VehicleId>> {
        let links = self.zone_links(zone)?;
        Ok(self.cars.iter().filter(|c| links.contains(&c.link())).map(|c| VehicleId(c.id)).collect())
    }

    fn unload_network(&mut self) -> EngineResult<()> {
        if self.loaded {
            debug!(vehicles = self.cars.len(), "corridor network unloaded");
        }
        self.loaded = false;
        self.cars.clear();
        Ok(())
    }
}
