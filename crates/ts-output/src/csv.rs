//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `trajectories.csv`
//! - `steps.csv`

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{OutputResult, StepSummaryRow, TrajectoryRow};

/// Writes step output to two CSV files.
pub struct CsvWriter {
    trajectories: Writer<File>,
    steps:        Writer<File>,
    finished:     bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the two CSV files and write the headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut trajectories = Writer::from_path(dir.join("trajectories.csv"))?;
        trajectories.write_record([
            "step", "time", "vehicle_id", "type", "link", "lane", "position", "x", "y", "speed", "acceleration",
        ])?;

        let mut steps = Writer::from_path(dir.join("steps.csv"))?;
        steps.write_record(["step", "time", "vehicles", "created", "exited", "mean_speed"])?;

        Ok(Self { trajectories, steps, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_trajectories(&mut self, rows: &[TrajectoryRow]) -> OutputResult<()> {
        for row in rows {
            self.trajectories.write_record(&[
                row.step.to_string(),
                row.time.to_string(),
                row.vehicle_id.to_string(),
                row.vehicle_type.clone(),
                row.link.clone(),
                row.lane.to_string(),
                row.position.to_string(),
                row.x.to_string(),
                row.y.to_string(),
                row.speed.to_string(),
                row.acceleration.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_step_summary(&mut self, row: &StepSummaryRow) -> OutputResult<()> {
        self.steps.write_record(&[
            row.step.to_string(),
            row.time.to_string(),
            row.vehicles.to_string(),
            row.created.to_string(),
            row.exited.to_string(),
            row.mean_speed.map(|s| s.to_string()).unwrap_or_default(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.trajectories.flush()?;
        self.steps.flush()?;
        Ok(())
    }
}
