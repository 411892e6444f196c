//! Session states and step results.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ts_core::StepIndex;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No engine yet.
    Unbound,
    /// Engine library bound, no network.
    Bound,
    /// Network loaded into the engine, buffer not yet allocated.
    NetworkLoaded,
    /// Initialized, no step taken yet.
    Ready,
    /// At least one step taken.
    Stepping,
    /// Iterations exhausted, engine finished, or stop requested.
    Terminated,
    /// An unrecoverable binding error occurred.
    Failed,
}

impl SessionState {
    /// `true` for `Terminated` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Failed)
    }

    /// `true` when commands and steps are allowed.
    pub fn is_running(self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Stepping)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unbound => "Unbound",
            SessionState::Bound => "Bound",
            SessionState::NetworkLoaded => "NetworkLoaded",
            SessionState::Ready => "Ready",
            SessionState::Stepping => "Stepping",
            SessionState::Terminated => "Terminated",
            SessionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Result of [`Session::advance`][crate::Session::advance].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StepStatus {
    /// Step `step` was executed; the snapshot now reports simulated `time`.
    Advanced { step: StepIndex, time: f64 },
    /// Nothing left to do; the session is now `Terminated`.
    Completed,
}

/// Cooperative cancellation flag.
///
/// Clones share the flag.  A stop request is honoured at the next
/// `advance()`; an engine call already in progress is never interrupted.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
