//! Error types for ts-monitor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// A derived quantity divides by an accumulated total that is still zero.
    #[error("no travel time accumulated in zone yet")]
    NoTravelTime,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
