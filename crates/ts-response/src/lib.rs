//! `ts-response` — turns one step of engine output into a typed snapshot.
//!
//! # Payload shape
//!
//! ```text
//! <INST val="7.00" nbVeh="3">
//!   <CREATIONS><CREATION id="3" entree="E_1" sortie="S_1" type="VL"/></CREATIONS>
//!   <SORTIES><SORTIE id="0" sortie="S_1" type="VL"/></SORTIES>
//!   <TRAJS><TRAJ id="1" tron="L_1" voie="1" dst="31.41" abs=".." ord=".." z="0"
//!               vit="14.00" acc="0.00" type="VL" lead="0"/></TRAJS>
//!   <ENTREES><ENTREE id="E_1" nb_veh_en_attente="0"/></ENTREES>
//!   <STREAMS/><LINKS/><SGTS/><FEUX/><REGULATIONS/>
//! </INST>
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`fields`]   | the wire-name → typed-field coercion table for `TRAJ`       |
//! | [`parser`]   | `parse_step` — pure payload → `StepSnapshot`                |
//! | [`snapshot`] | `StepSnapshot`, `VehicleRecord`, events, spatial queries    |
//! | [`tracker`]  | `VehicleTracker` — id lifecycle across snapshots            |
//! | [`error`]    | `ParseError`, `ParseResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                     |
//! |-----------|------------------------------------------------------------|
//! | `serde`   | Derives `Serialize`/`Deserialize` on snapshot types.       |
//! | `fx-hash` | FxHash for the duplicate-id index built while parsing.     |

pub mod error;
pub mod fields;
pub mod parser;
pub mod snapshot;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use error::{ParseError, ParseResult};
pub use parser::parse_step;
pub use snapshot::{CreationEvent, EntryQueue, ExitEvent, StepSnapshot, VehicleRecord};
pub use tracker::{Lifecycle, TrackerUpdate, VehicleTracker};
