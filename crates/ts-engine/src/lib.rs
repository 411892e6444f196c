//! `ts-engine` — the foreign traffic engine behind a Rust trait.
//!
//! The engine is a shared library exposing a C ABI.  Every call is
//! synchronous; the only way to observe its state is the XML payload it
//! writes into a caller-owned buffer after each step.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                      |
//! |------------|---------------------------------------------------------------|
//! | [`engine`] | `Engine` trait (the seam), `EngineBinder`, `StepOutcome`      |
//! | [`native`] | `NativeEngine`, `NativeBinder` — `libloading` implementation  |
//! | [`replay`] | `ReplayEngine` — scripted payloads, call recording            |
//! | [`buffer`] | `ResponseBuffer` — fixed-capacity output buffer               |
//! | [`config`] | `EngineConfig`, `LaunchMode`                                  |
//! | [`error`]  | `EngineError`, `EngineResult<T>`                              |

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod native;
pub mod replay;

#[cfg(test)]
mod tests;

pub use buffer::ResponseBuffer;
pub use config::{DEFAULT_BUFFER_CAPACITY, EngineConfig, LaunchMode};
pub use engine::{Engine, EngineBinder, StepOutcome};
pub use error::{EngineError, EngineResult};
pub use native::{NativeBinder, NativeEngine};
pub use replay::{CallLog, EngineCall, ReplayEngine};
