//! Engine-binding error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `ts-engine`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot load engine library {path}: {reason}")]
    LoadLibrary { path: PathBuf, reason: String },

    #[error("engine library does not export {0}")]
    MissingSymbol(&'static str),

    /// An optional entry point the loaded library does not provide.
    #[error("engine library does not support {0}")]
    Unsupported(&'static str),

    #[error("invalid {what} argument: {reason}")]
    InvalidArgument { what: &'static str, reason: String },

    #[error("engine rejected network {0}")]
    NetworkRejected(PathBuf),

    #[error("engine failed to compute the next step")]
    StepFailed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
