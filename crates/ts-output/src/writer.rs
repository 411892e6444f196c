//! The `OutputWriter` trait implemented by every output backend.

use crate::{OutputResult, StepSummaryRow, TrajectoryRow};

/// A sink for per-step output.
///
/// Implementations must tolerate `finish` being called more than once.
pub trait OutputWriter {
    /// Write all vehicle rows of one step.
    fn write_trajectories(&mut self, rows: &[TrajectoryRow]) -> OutputResult<()>;

    /// Write the summary row of one step.
    fn write_step_summary(&mut self, row: &StepSummaryRow) -> OutputResult<()>;

    /// Flush and close.  Subsequent calls are no-ops.
    fn finish(&mut self) -> OutputResult<()>;
}
