//! `ts-core` — foundational types for the `ts` engine client workspace.
//!
//! Every other `ts-*` crate depends on this one.  It has no `ts-*`
//! dependencies and only `thiserror` (plus optional `serde`) externally.
//!
//! # What lives here
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | [`ids`]    | `VehicleId`, `StepIndex`                              |
//! | [`time`]   | `ClockTime`, `StepClock`                              |
//! | [`geo`]    | `Position` (planar, metres)                           |
//! | [`error`]  | `CoreError`, `CoreResult`                             |
//!
//! # Units
//!
//! Lengths are metres, speeds m/s, accelerations m/s², times seconds.  The
//! engine reports everything in these units already; no conversion happens
//! anywhere in the workspace.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::Position;
pub use ids::{StepIndex, VehicleId};
pub use time::{ClockTime, StepClock, SECONDS_PER_DAY};
