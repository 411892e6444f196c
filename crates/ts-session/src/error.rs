use std::path::PathBuf;

use thiserror::Error;
use ts_core::VehicleId;
use ts_engine::EngineError;
use ts_response::ParseError;
use ts_scenario::ScenarioError;

use crate::SessionState;

/// Why a command was refused, either by validation or by the engine.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("unknown vehicle type {0:?}")]
    UnknownVehicleType(String),

    #[error("unknown network endpoint {0:?}")]
    UnknownEndpoint(String),

    #[error("origin and destination are the same endpoint")]
    SameEndpoints,

    #[error("unknown link {0:?}")]
    UnknownLink(String),

    #[error("{0} is not in the network")]
    VehicleNotFound(VehicleId),

    #[error("engine returned code {0}")]
    EngineCode(i32),

    /// The foreign call itself failed (missing entry point, bad argument).
    #[error("engine call failed: {0}")]
    Engine(#[source] EngineError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine library could not be bound.  Fatal.
    #[error("cannot bind engine library: {0}")]
    LoadLibrary(#[source] EngineError),

    /// The scenario document or the engine's network load failed.  Fatal.
    #[error("cannot load scenario {}: {reason}", path.display())]
    FileLoad { path: PathBuf, reason: String },

    #[error("vehicle creation refused: {0}")]
    VehicleCreation(Rejection),

    #[error("drive command refused: {0}")]
    DriveVehicle(Rejection),

    #[error("route change refused: {0}")]
    Route(Rejection),

    #[error("cannot parse step payload: {0}")]
    Parse(#[from] ParseError),

    /// The operation is not allowed in the session's current state.
    #[error("{operation} is not allowed in state {state}")]
    IllegalState { operation: &'static str, state: SessionState },

    #[error("unknown zone {0:?}")]
    UnknownZone(String),

    #[error("control zone {zone:?} refused by engine (code {code})")]
    ControlZone { zone: String, code: i32 },

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl From<ScenarioError> for SessionError {
    fn from(e: ScenarioError) -> Self {
        match e {
            ScenarioError::FileLoad { path, reason } => SessionError::FileLoad { path, reason },
            other => SessionError::FileLoad { path: PathBuf::new(), reason: other.to_string() },
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
