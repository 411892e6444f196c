use std::path::PathBuf;

use thiserror::Error;
use ts_core::CoreError;

#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The document is missing, unreadable, or lacks its top-level sections.
    #[error("cannot load scenario {}: {reason}", path.display())]
    FileLoad { path: PathBuf, reason: String },

    #[error("missing scenario attribute {0}")]
    MissingAttribute(&'static str),

    #[error("invalid value {value:?} for scenario attribute {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("zone {zone:?} references unknown link {link:?}")]
    UnknownZoneLink { zone: String, link: String },

    #[error("scenario time error: {0}")]
    Time(#[from] CoreError),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
