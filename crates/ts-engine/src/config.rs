//! Engine configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Response buffer size used when none is configured, bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1_000_000;

/// Which step entry point the session drives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Full step: the engine writes the step payload into the buffer.
    #[default]
    Full,
    /// Lite step: the engine advances without producing a payload.
    Lite,
}

/// How to reach and drive the engine library.
///
/// ```rust,ignore
/// let config = EngineConfig::new("/opt/engine/libengine.so")
///     .buffer_capacity(2_000_000)
///     .trace_flow(true);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path of the shared library.
    pub library_path: PathBuf,
    /// Capacity of the response buffer, bytes.  Fixed for the whole session.
    pub buffer_capacity: usize,
    /// Ask the engine to also write its own trajectory trace.
    pub trace_flow: bool,
    pub launch_mode: LaunchMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library_path:    PathBuf::new(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            trace_flow:      false,
            launch_mode:     LaunchMode::Full,
        }
    }
}

impl EngineConfig {
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        Self { library_path: library_path.into(), ..Self::default() }
    }

    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    pub fn trace_flow(mut self, on: bool) -> Self {
        self.trace_flow = on;
        self
    }

    pub fn launch_mode(mut self, mode: LaunchMode) -> Self {
        self.launch_mode = mode;
        self
    }
}
