//! `ts-scenario` — the static scenario definition.
//!
//! A scenario document describes everything the engine needs before the
//! first step: the simulated time window, the vehicle-type catalog, network
//! endpoints and links, and named zones (MFD sensors, termination zones).
//! This crate loads that document once and answers read-only queries about
//! it.  Sessions validate vehicle commands against these queries before any
//! foreign call is made.
//!
//! # Crate layout
//!
//! | Module         | Contents                                               |
//! |----------------|--------------------------------------------------------|
//! | [`document`]   | serde model of the XML document (crate-private shape)  |
//! | [`descriptor`] | `ScenarioDescriptor`, `VehicleType`, `Zone`            |
//! | [`loader`]     | `load`, `ScenarioLoader`                               |
//! | [`error`]      | `ScenarioError`, `ScenarioResult<T>`                   |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let scenario = ts_scenario::ScenarioLoader::new()
//!     .max_steps(3_600)
//!     .load("scenarios/bottleneck_001.xml")?;
//! assert!(scenario.has_vehicle_type("VL"));
//! ```

pub mod descriptor;
mod document;
pub mod error;
pub mod loader;


pub use descriptor::{CarFollowing, ScenarioDescriptor, SimulationParameters, VehicleType, Zone};
pub use error::{ScenarioError, ScenarioResult};
pub use loader::{ScenarioLoader, load};
