//! `Recorder<W>` — bridges `StepObserver` to an `OutputWriter`.

use std::path::Path;

use tracing::{debug, warn};
use ts_core::StepIndex;
use ts_response::StepSnapshot;
use ts_scenario::ScenarioDescriptor;
use ts_session::{ObserverResult, StepObserver};

use crate::row::{StepSummaryRow, TrajectoryRow};
use crate::writer::OutputWriter;
use crate::{CsvWriter, OutputError, OutputResult};

/// A [`Recorder`] writing CSV files.
pub type CsvRecorder = Recorder<CsvWriter>;

impl CsvRecorder {
    /// Record into `trajectories.csv` and `steps.csv` under `dir`.
    pub fn create(dir: &Path) -> OutputResult<Self> {
        Ok(Self::new(CsvWriter::new(dir)?))
    }
}

/// A [`StepObserver`] that writes every snapshot to an [`OutputWriter`].
///
/// Write errors are stored rather than returned, so a full disk never
/// counts against the session's observer failures.  Check with
/// [`take_error`][Self::take_error] once the session has ended.
pub struct Recorder<W: OutputWriter> {
    writer:     W,
    rows:       u64,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> Recorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, rows: 0, last_error: None }
    }

    /// Take the stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Trajectory rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Flush the writer now.  Also done on session end.
    pub fn finish(&mut self) -> OutputResult<()> {
        self.writer.finish()
    }

    /// Unwrap the inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            warn!(error = %e, "output write failed");
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> StepObserver for Recorder<W> {
    fn on_session_start(&mut self, scenario: &ScenarioDescriptor) -> ObserverResult {
        debug!(scenario = %scenario.path().display(), "recording started");
        Ok(())
    }

    fn on_step(&mut self, step: StepIndex, snapshot: &StepSnapshot) -> ObserverResult {
        let rows: Vec<TrajectoryRow> =
            snapshot.vehicles().iter().map(|v| TrajectoryRow::new(step, snapshot.time, v)).collect();
        if !rows.is_empty() {
            let result = self.writer.write_trajectories(&rows);
            if result.is_ok() {
                self.rows += rows.len() as u64;
            }
            self.store_err(result);
        }
        let result = self.writer.write_step_summary(&StepSummaryRow::new(step, snapshot));
        self.store_err(result);
        Ok(())
    }

    fn on_session_end(&mut self, steps: u64) -> ObserverResult {
        let result = self.writer.finish();
        self.store_err(result);
        debug!(steps, rows = self.rows, "recording finished");
        Ok(())
    }
}
