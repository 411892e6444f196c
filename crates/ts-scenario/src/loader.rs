//! Scenario document loader.
//!
//! Loading happens once per session.  The whole document is read into
//! memory and deserialized in one pass; the resulting
//! [`ScenarioDescriptor`] never touches the file again.
//!
//! When a document holds several `SIMULATION` or `TRAFIC` entries, the first
//! of each is used.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use ts_core::{ClockTime, StepClock};

use crate::descriptor::{CarFollowing, ScenarioDescriptor, SimulationParameters, VehicleType, Zone};
use crate::document::{IdEntry, ScenarioDocument, SimulationEntry, TraficEntry, ZoneEntry};
use crate::{ScenarioError, ScenarioResult};

/// Placeholder path reported by descriptors loaded from a string.
const IN_MEMORY: &str = "<in-memory>";

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a scenario with default options (no step cap).
pub fn load(path: impl AsRef<Path>) -> ScenarioResult<ScenarioDescriptor> {
    ScenarioLoader::new().load(path)
}

/// Builder-style loader options.
#[derive(Clone, Debug, Default)]
pub struct ScenarioLoader {
    max_steps: Option<u64>,
}

impl ScenarioLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp [`ScenarioDescriptor::step_count`] to at most `n` steps.
    pub fn max_steps(mut self, n: u64) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::FileLoad`] if the path does not exist, cannot be
    /// read, or lacks the `SIMULATIONS` / `TRAFICS` sections.
    pub fn load(&self, path: impl AsRef<Path>) -> ScenarioResult<ScenarioDescriptor> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(file_load(path, "file not found"));
        }
        let text = std::fs::read_to_string(path).map_err(|e| file_load(path, e.to_string()))?;
        self.load_document(&text, path.to_path_buf())
    }

    /// Like [`load`](Self::load) but for a document already in memory.
    ///
    /// Useful for tests and for scenarios generated on the fly.
    pub fn load_str(&self, xml: &str) -> ScenarioResult<ScenarioDescriptor> {
        self.load_document(xml, PathBuf::from(IN_MEMORY))
    }

    fn load_document(&self, xml: &str, path: PathBuf) -> ScenarioResult<ScenarioDescriptor> {
        let doc: ScenarioDocument =
            quick_xml::de::from_str(xml).map_err(|e| file_load(&path, e.to_string()))?;

        let Some(sim) = doc.simulations.entries.into_iter().next() else {
            return Err(file_load(&path, "SIMULATIONS has no SIMULATION entry"));
        };
        let Some(trafic) = doc.trafics.entries.into_iter().next() else {
            return Err(file_load(&path, "TRAFICS has no TRAFIC entry"));
        };

        let simulation = simulation_parameters(sim)?;
        let descriptor = build(path, simulation, trafic, self.max_steps)?;

        debug!(
            path = %descriptor.path().display(),
            steps = descriptor.step_count(),
            vehicle_types = descriptor.vehicle_types().len(),
            links = descriptor.links().len(),
            sensors = descriptor.sensor_zones().len(),
            "scenario loaded"
        );
        Ok(descriptor)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn file_load(path: &Path, reason: impl Into<String>) -> ScenarioError {
    ScenarioError::FileLoad { path: path.to_path_buf(), reason: reason.into() }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> ScenarioResult<&'a str> {
    value.as_deref().ok_or(ScenarioError::MissingAttribute(field))
}

fn parse_f64(field: &'static str, value: &str) -> ScenarioResult<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| ScenarioError::InvalidValue { field, value: value.to_owned() })
}

fn optional_f64(field: &'static str, value: &Option<String>) -> ScenarioResult<Option<f64>> {
    value.as_deref().map(|v| parse_f64(field, v)).transpose()
}

fn simulation_parameters(sim: SimulationEntry) -> ScenarioResult<SimulationParameters> {
    let start: ClockTime = required("debut", &sim.start)?.parse()?;
    let end: ClockTime = required("fin", &sim.end)?.parse()?;
    let step = parse_f64("pasdetemps", required("pasdetemps", &sim.time_step)?)?;
    let seed = sim
        .seed
        .as_deref()
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|_| ScenarioError::InvalidValue { field: "seed", value: s.to_owned() })
        })
        .transpose()?;

    Ok(SimulationParameters {
        id: sim.id,
        clock: StepClock::new(start, end, step)?,
        date: sim.date,
        seed,
    })
}

/// Collect ids in document order, dropping repeats.
fn ordered_ids(entries: Vec<IdEntry>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .map(|e| e.id)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn zones(
    entries: Vec<ZoneEntry>,
    link_index: &HashSet<String>,
) -> ScenarioResult<Vec<Zone>> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.id.clone()) {
            continue;
        }
        let links = ordered_ids(entry.links.map(|l| l.entries).unwrap_or_default());
        if let Some(missing) = links.iter().find(|l| !link_index.contains(*l)) {
            return Err(ScenarioError::UnknownZoneLink {
                zone: entry.id,
                link: missing.clone(),
            });
        }
        out.push(Zone { id: entry.id, links });
    }
    Ok(out)
}

fn build(
    path:       PathBuf,
    simulation: SimulationParameters,
    trafic:     TraficEntry,
    max_steps:  Option<u64>,
) -> ScenarioResult<ScenarioDescriptor> {
    let vehicle_types = trafic
        .vehicle_types
        .map(|t| t.entries)
        .unwrap_or_default()
        .into_iter()
        .map(|t| {
            Ok(VehicleType {
                car_following: CarFollowing {
                    w:  optional_f64("w", &t.w)?,
                    kx: optional_f64("kx", &t.kx)?,
                    vx: optional_f64("vx", &t.vx)?,
                },
                id: t.id,
            })
        })
        .collect::<ScenarioResult<Vec<_>>>()?;

    let endpoints = ordered_ids(trafic.endpoints.map(|e| e.entries).unwrap_or_default());
    let links = ordered_ids(trafic.links.map(|l| l.entries).unwrap_or_default());
    let link_index: HashSet<String> = links.iter().cloned().collect();

    let sensor_zones = zones(
        trafic
            .sensor_settings
            .and_then(|s| s.sensors)
            .map(|s| s.mfd)
            .unwrap_or_default(),
        &link_index,
    )?;
    let termination_zones = zones(
        trafic.termination_zones.map(|z| z.entries).unwrap_or_default(),
        &link_index,
    )?;

    Ok(ScenarioDescriptor {
        path,
        simulation,
        vehicle_types,
        endpoints,
        links,
        link_index,
        sensor_zones,
        termination_zones,
        max_steps,
    })
}
