//! The `Monitor` trait.

use ts_core::StepIndex;
use ts_response::StepSnapshot;

use crate::MonitorResult;

/// One recorded value.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample {
    Point(f64, f64),
    /// A whole cloud of points for one step.
    Cloud(Vec<(f64, f64)>),
}

impl Sample {
    /// The `(x, y)` pairs carried by this sample.
    pub fn points(&self) -> Vec<(f64, f64)> {
        match self {
            Sample::Point(x, y) => vec![(*x, *y)],
            Sample::Cloud(points) => points.clone(),
        }
    }
}

/// An indicator computed step by step.
///
/// Monitors read the snapshot and may keep private running state; they never
/// see the session.
pub trait Monitor {
    fn title(&self) -> &str;

    /// `(x, y)` axis labels.
    fn axes(&self) -> (&str, &str);

    /// Series labels; `update` is called once per series per step.
    fn series(&self) -> Vec<String> {
        vec![self.title().to_owned()]
    }

    /// Sample for `series` at `step`, or `None` when there is no data.
    fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot, series: usize) -> MonitorResult<Option<Sample>>;

    /// Value recorded in place of a failed `update`.
    fn fallback(&self, _step: StepIndex, _series: usize) -> Option<Sample> {
        None
    }
}
