//! `ts-output` — step output writers.
//!
//! | Backend | Files created                          |
//! |---------|----------------------------------------|
//! | CSV     | `trajectories.csv`, `steps.csv`        |
//!
//! Backends implement [`OutputWriter`] and are driven by [`Recorder`], which
//! implements `ts_session::StepObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ts_output::CsvRecorder;
//!
//! let recorder = Rc::new(RefCell::new(CsvRecorder::create(Path::new("./output"))?));
//! let mut session = SessionBuilder::new(config, NativeBinder)
//!     .scenario_path("scenario.xml")
//!     .observer(recorder.clone())
//!     .open()?;
//! session.run()?;
//! if let Some(e) = recorder.borrow_mut().take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod recorder;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use recorder::{CsvRecorder, Recorder};
pub use row::{StepSummaryRow, TrajectoryRow};
pub use writer::OutputWriter;
