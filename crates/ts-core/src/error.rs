//! Shared error type for the primitives in this crate.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid clock time {0:?}: expected HH:MM:SS")]
    InvalidTime(String),

    #[error("step length must be positive and finite, got {0}")]
    InvalidStepLength(f64),
}

/// Shorthand result type for `ts-core`.
pub type CoreResult<T> = Result<T, CoreError>;
