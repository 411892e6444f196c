//! Step observer trait.

use std::cell::RefCell;
use std::rc::Rc;

use ts_core::StepIndex;
use ts_response::StepSnapshot;
use ts_scenario::ScenarioDescriptor;

/// Error an observer may report.  The session logs it and moves on.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;
pub type ObserverResult = Result<(), ObserverError>;

/// Callbacks invoked by a [`Session`][crate::Session].
///
/// All methods have default no-op implementations.  An `Err` from one
/// observer never stops the others from being notified and never changes the
/// session state.
///
/// # Example — vehicle counter
///
/// ```rust,ignore
/// struct Counter(Vec<usize>);
///
/// impl StepObserver for Counter {
///     fn on_step(&mut self, _step: StepIndex, snapshot: &StepSnapshot) -> ObserverResult {
///         self.0.push(snapshot.vehicles().len());
///         Ok(())
///     }
/// }
/// ```
pub trait StepObserver {
    /// Called once when the session becomes `Ready`.
    fn on_session_start(&mut self, _scenario: &ScenarioDescriptor) -> ObserverResult {
        Ok(())
    }

    /// Called after every counted step with the new snapshot.
    fn on_step(&mut self, _step: StepIndex, _snapshot: &StepSnapshot) -> ObserverResult {
        Ok(())
    }

    /// Called once on termination.  `steps` is the number of steps executed.
    fn on_session_end(&mut self, _steps: u64) -> ObserverResult {
        Ok(())
    }
}

/// Shared observers stay readable by the caller after registration.  A
/// notification arriving while the caller holds a borrow is reported as an
/// observer error.
impl<O: StepObserver> StepObserver for Rc<RefCell<O>> {
    fn on_session_start(&mut self, scenario: &ScenarioDescriptor) -> ObserverResult {
        self.try_borrow_mut()?.on_session_start(scenario)
    }

    fn on_step(&mut self, step: StepIndex, snapshot: &StepSnapshot) -> ObserverResult {
        self.try_borrow_mut()?.on_step(step, snapshot)
    }

    fn on_session_end(&mut self, steps: u64) -> ObserverResult {
        self.try_borrow_mut()?.on_session_end(steps)
    }
}

/// A [`StepObserver`] that does nothing.
pub struct NoopObserver;

impl StepObserver for NoopObserver {}
