//! `ts-session` — drives one simulation run against an engine.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound ─bind─▶ Bound ─load_network─▶ NetworkLoaded ─initialize─▶ Ready
//!    │              │                         │                       │
//!    └──────────────┴────── Failed ◀──────────┘             advance() │
//!                                                                     ▼
//!                          Terminated ◀── exhausted / stop ──── Stepping
//! ```
//!
//! Each `advance()` performs one engine step, parses the payload into a new
//! [`StepSnapshot`](ts_response::StepSnapshot), notifies observers, and
//! decrements the remaining-iteration counter.  Commands (vehicle creation,
//! driving, control zones, zone metrics) are accepted in `Ready` and
//! `Stepping` only.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`session`]  | `Session<E>` — the state machine and its commands       |
//! | [`builder`]  | `SessionBuilder` — bind, load and initialize in one go  |
//! | [`command`]  | `VehicleRequest`, `DriveRequest`                        |
//! | [`control`]  | `ControlZone`, MFD speed floor                          |
//! | [`observer`] | `StepObserver`, `NoopObserver`                          |
//! | [`state`]    | `SessionState`, `StepStatus`, `StopHandle`              |
//! | [`config`]   | `SessionConfig`, `ParseErrorPolicy`                     |
//! | [`error`]    | `SessionError`, `Rejection`, `SessionResult<T>`         |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ts_engine::NativeBinder;
//! use ts_session::{SessionBuilder, SessionConfig, StepStatus};
//!
//! let mut session = SessionBuilder::new(SessionConfig::from_env(), NativeBinder)
//!     .scenario_path("bottleneck.xml")
//!     .open()?;
//! while let StepStatus::Advanced { time, .. } = session.advance()? {
//!     println!("t = {time}: {} vehicles", session.snapshot().vehicles().len());
//! }
//! ```

pub mod builder;
pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod observer;
pub mod session;
pub mod state;


pub use builder::SessionBuilder;
pub use command::{DriveRequest, VehicleRequest};
pub use config::{LIBRARY_ENV_VAR, ParseErrorPolicy, SessionConfig};
pub use control::{ControlZone, MFD_FLOOR_SPEED};
pub use error::{Rejection, SessionError, SessionResult};
pub use observer::{NoopObserver, ObserverError, ObserverResult, StepObserver};
pub use session::Session;
pub use state::{SessionState, StepStatus, StopHandle};
