//! Session configuration.

use serde::Deserialize;
use ts_engine::EngineConfig;

/// Environment variable read by [`SessionConfig::from_env`].
pub const LIBRARY_ENV_VAR: &str = "TS_ENGINE_LIBRARY";

/// What `advance()` does with a payload that fails to parse.
///
/// The engine has already executed the step either way, so the step is
/// always counted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorPolicy {
    /// Log, publish an empty snapshot, and carry on.
    #[default]
    EmptySnapshot,
    /// Publish an empty snapshot and return the parse error to the caller.
    Fail,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    /// Upper bound on the number of steps, on top of the scenario window.
    pub max_iterations: Option<u64>,
    pub parse_errors: ParseErrorPolicy,
}

impl SessionConfig {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine, ..Self::default() }
    }

    /// Default configuration with the library path taken from
    /// `TS_ENGINE_LIBRARY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(LIBRARY_ENV_VAR) {
            config.engine.library_path = path.into();
        }
        config
    }

    pub fn max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn parse_errors(mut self, policy: ParseErrorPolicy) -> Self {
        self.parse_errors = policy;
        self
    }
}
