//! serde model of the scenario XML document.
//!
//! Only the sections the client queries are modelled; everything else in the
//! document (network geometry, demand, outputs) is ignored by the
//! deserializer.  Attribute values are kept as strings here and coerced in
//! [`crate::descriptor`] so that a bad value reports which attribute it came
//! from.
//!
//! ```text
//! ROOT
//! ├── SIMULATIONS/SIMULATION        @id @pasdetemps @debut @fin @date @seed
//! └── TRAFICS/TRAFIC
//!     ├── TYPES_DE_VEHICULE/TYPE_DE_VEHICULE   @id @w @kx @vx
//!     ├── EXTREMITES/EXTREMITE                 @id
//!     ├── TRONCONS/TRONCON                     @id
//!     ├── PARAMETRAGE_CAPTEURS/CAPTEURS/CAPTEUR_MFD @id
//!     │       └── TRONCONS/TRONCON             @id
//!     └── ZONES_DE_TERMINAISON/ZONE_DE_TERMINAISON @id
//!             └── TRONCONS/TRONCON             @id
//! ```

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ScenarioDocument {
    #[serde(rename = "SIMULATIONS")]
    pub simulations: Simulations,
    #[serde(rename = "TRAFICS")]
    pub trafics: Trafics,
}

// ── SIMULATIONS ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Simulations {
    #[serde(rename = "SIMULATION", default)]
    pub entries: Vec<SimulationEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimulationEntry {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@pasdetemps")]
    pub time_step: Option<String>,
    #[serde(rename = "@debut")]
    pub start: Option<String>,
    #[serde(rename = "@fin")]
    pub end: Option<String>,
    #[serde(rename = "@date")]
    pub date: Option<String>,
    #[serde(rename = "@seed")]
    pub seed: Option<String>,
}

// ── TRAFICS ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Trafics {
    #[serde(rename = "TRAFIC", default)]
    pub entries: Vec<TraficEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TraficEntry {
    #[serde(rename = "TYPES_DE_VEHICULE", default)]
    pub vehicle_types: Option<VehicleTypes>,
    #[serde(rename = "EXTREMITES", default)]
    pub endpoints: Option<Endpoints>,
    #[serde(rename = "TRONCONS", default)]
    pub links: Option<LinkList>,
    #[serde(rename = "PARAMETRAGE_CAPTEURS", default)]
    pub sensor_settings: Option<SensorSettings>,
    #[serde(rename = "ZONES_DE_TERMINAISON", default)]
    pub termination_zones: Option<TerminationZones>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VehicleTypes {
    #[serde(rename = "TYPE_DE_VEHICULE", default)]
    pub entries: Vec<VehicleTypeEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VehicleTypeEntry {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@w")]
    pub w: Option<String>,
    #[serde(rename = "@kx")]
    pub kx: Option<String>,
    #[serde(rename = "@vx")]
    pub vx: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Endpoints {
    #[serde(rename = "EXTREMITE", default)]
    pub entries: Vec<IdEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinkList {
    #[serde(rename = "TRONCON", default)]
    pub entries: Vec<IdEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdEntry {
    #[serde(rename = "@id")]
    pub id: String,
}

// ── Zones ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SensorSettings {
    #[serde(rename = "CAPTEURS", default)]
    pub sensors: Option<Sensors>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Sensors {
    #[serde(rename = "CAPTEUR_MFD", default)]
    pub mfd: Vec<ZoneEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TerminationZones {
    #[serde(rename = "ZONE_DE_TERMINAISON", default)]
    pub entries: Vec<ZoneEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ZoneEntry {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "TRONCONS", default)]
    pub links: Option<LinkList>,
}
