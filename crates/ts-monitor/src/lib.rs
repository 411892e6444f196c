//! `ts-monitor` — indicators computed from step snapshots.
//!
//! A [`Monitor`] turns each snapshot into zero or more samples, one call per
//! *series* (e.g. one series per tracked vehicle, or in/out for a flux).
//! Returning `Ok(None)` means "no data this step"; nothing is recorded.
//! [`MonitorManager`] owns the monitors, records their samples, and plugs
//! into a session as a [`StepObserver`](ts_session::StepObserver).
//!
//! # Monitors
//!
//! | Monitor               | x            | y                                   |
//! |-----------------------|--------------|-------------------------------------|
//! | [`Accumulation`]      | step         | announced vehicle count             |
//! | [`Mfd`]               | vehicle count| mean speed × vehicle count          |
//! | [`VehicleIndicator`]  | step         | speed, acceleration or distance     |
//! | [`TotalTravelTime`]   | step         | time spent on zone links, s         |
//! | [`TotalTravelDistance`]| step        | distance covered on zone links, m   |
//! | [`Flux`]              | step         | vehicles entering / leaving a zone  |
//! | [`ZoneSpeed`]         | step         | distance / time on zone links, m/s  |
//! | [`Flow`]              | abscissa     | ordinate (point cloud)              |

pub mod error;
pub mod manager;
pub mod monitor;
pub mod monitors;

#[cfg(test)]
mod tests;

pub use error::{MonitorError, MonitorResult};
pub use manager::{MonitorId, MonitorManager};
pub use monitor::{Monitor, Sample};
pub use monitors::{
    Accumulation, Flow, Flux, Indicator, Mfd, TotalTravelDistance, TotalTravelTime, VehicleIndicator, ZoneSpeed,
};
