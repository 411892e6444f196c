//! `MonitorManager` — owns monitors and records their samples.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use ts_core::StepIndex;
use ts_response::StepSnapshot;
use ts_session::{ObserverResult, StepObserver};

use crate::{Monitor, MonitorResult, Sample};

/// Handle returned by [`MonitorManager::add`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MonitorId(pub usize);

struct Entry {
    monitor: Box<dyn Monitor>,
    labels:  Vec<String>,
    /// One sample list per series.
    samples: Vec<Vec<Sample>>,
}

/// Runs every registered monitor on each snapshot.
///
/// A failing monitor is logged and, where it defines one, its fallback value
/// is recorded instead.  It never stops the other monitors.
#[derive(Default)]
pub struct MonitorManager {
    entries:  Vec<Entry>,
    failures: u64,
}

impl MonitorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Monitor + 'static>(&mut self, monitor: M) -> MonitorId {
        let labels = monitor.series();
        let samples = vec![Vec::new(); labels.len()];
        self.entries.push(Entry { monitor: Box::new(monitor), labels, samples });
        MonitorId(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn title(&self, id: MonitorId) -> Option<&str> {
        self.entries.get(id.0).map(|e| e.monitor.title())
    }

    pub fn series(&self, id: MonitorId) -> &[String] {
        self.entries.get(id.0).map_or(&[], |e| e.labels.as_slice())
    }

    /// Samples recorded so far for one series of one monitor.
    pub fn samples(&self, id: MonitorId, series: usize) -> &[Sample] {
        self.entries
            .get(id.0)
            .and_then(|e| e.samples.get(series))
            .map_or(&[], Vec::as_slice)
    }

    /// Number of failed `update` calls so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Feed one snapshot to every monitor and series.
    pub fn update(&mut self, step: StepIndex, snapshot: &StepSnapshot) {
        for entry in &mut self.entries {
            for series in 0..entry.samples.len() {
                let sample = match entry.monitor.update(step, snapshot, series) {
                    Ok(sample) => sample,
                    Err(e) => {
                        self.failures += 1;
                        warn!(monitor = entry.monitor.title(), series, step = step.get(), error = %e, "monitor update failed");
                        entry.monitor.fallback(step, series)
                    }
                };
                if let Some(sample) = sample {
                    entry.samples[series].push(sample);
                }
            }
        }
    }

    /// Write every recorded point to `<dir>/monitors.csv` as
    /// `monitor,series,x,y` rows and return the file path.
    pub fn write_csv(&self, dir: &Path) -> MonitorResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join("monitors.csv");
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["monitor", "series", "x", "y"])?;
        for entry in &self.entries {
            let title = entry.monitor.title();
            for (label, samples) in entry.labels.iter().zip(&entry.samples) {
                for (x, y) in samples.iter().flat_map(Sample::points) {
                    let (x, y) = (x.to_string(), y.to_string());
                    writer.write_record([title, label.as_str(), x.as_str(), y.as_str()])?;
                }
            }
        }
        writer.flush()?;
        Ok(path)
    }
}

impl StepObserver for MonitorManager {
    fn on_step(&mut self, step: StepIndex, snapshot: &StepSnapshot) -> ObserverResult {
        self.update(step, snapshot);
        Ok(())
    }
}
