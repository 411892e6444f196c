//! Simulation time model.
//!
//! # Design
//!
//! Scenario documents express the simulated window as two time-of-day
//! strings (`debut`, `fin`) plus a step length in seconds.  The engine then
//! advances in fixed steps:
//!
//!   time(step) = start + step * step_length
//!
//! Time-of-day values are held as whole seconds since midnight in
//! [`ClockTime`]; simulated instants reported by the engine are `f64`
//! seconds since midnight.  No datetime library is needed for either.

use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Seconds in one day.  A window whose end precedes its start wraps past
/// midnight.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Guard against `30.0 / 0.1 = 299.999…` style truncation when deriving the
/// step count.
const STEP_EPSILON: f64 = 1e-9;

// ── ClockTime ─────────────────────────────────────────────────────────────────

/// A time of day with one-second resolution, parsed from `HH:MM:SS`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockTime(u32);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Build from whole seconds since midnight.  Values past one day wrap.
    #[inline]
    pub fn from_secs(secs: u32) -> Self {
        ClockTime(secs % SECONDS_PER_DAY)
    }

    /// Seconds since midnight.
    #[inline]
    pub fn secs(self) -> u32 {
        self.0
    }

    /// Seconds from `self` forward to `later`, wrapping over midnight.
    #[inline]
    pub fn secs_until(self, later: ClockTime) -> u32 {
        if later.0 >= self.0 {
            later.0 - self.0
        } else {
            later.0 + SECONDS_PER_DAY - self.0
        }
    }
}

impl FromStr for ClockTime {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidTime(s.to_owned());

        let mut parts = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let h: u32 = h.parse().map_err(|_| invalid())?;
        let m: u32 = m.parse().map_err(|_| invalid())?;
        let sec: u32 = sec.parse().map_err(|_| invalid())?;
        if h > 23 || m > 59 || sec > 59 {
            return Err(invalid());
        }
        Ok(ClockTime(h * 3_600 + m * 60 + sec))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.0 / 3_600;
        let m = (self.0 % 3_600) / 60;
        let s = self.0 % 60;
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

// ── StepClock ─────────────────────────────────────────────────────────────────

/// The simulated window of a scenario and its fixed step length.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepClock {
    pub start: ClockTime,
    pub end: ClockTime,
    /// Seconds per step.  Always positive and finite.
    pub step_length: f64,
}

impl StepClock {
    pub fn new(start: ClockTime, end: ClockTime, step_length: f64) -> CoreResult<Self> {
        if !(step_length.is_finite() && step_length > 0.0) {
            return Err(CoreError::InvalidStepLength(step_length));
        }
        Ok(Self { start, end, step_length })
    }

    /// Length of the simulated window in seconds.
    #[inline]
    pub fn span_secs(&self) -> u32 {
        self.start.secs_until(self.end)
    }

    /// Number of whole steps in the window: `floor((end - start) / step)`.
    pub fn step_count(&self) -> u64 {
        (self.span_secs() as f64 / self.step_length + STEP_EPSILON).floor() as u64
    }

    /// Step count clamped to `max` when a cap is configured.
    pub fn capped_step_count(&self, max: Option<u64>) -> u64 {
        match max {
            Some(cap) => self.step_count().min(cap),
            None => self.step_count(),
        }
    }

    /// Simulated time after `steps` steps, in seconds from the window
    /// start.  Same origin as the instant value of a step payload.
    #[inline]
    pub fn time_at(&self, steps: u64) -> f64 {
        steps as f64 * self.step_length
    }

    /// Time of day after `steps` steps, wrapping at midnight.
    pub fn clock_time_at(&self, steps: u64) -> ClockTime {
        let secs = self.start.secs() as f64 + self.time_at(steps);
        ClockTime::from_secs((secs.floor() as u64 % u64::from(SECONDS_PER_DAY)) as u32)
    }
}

impl fmt::Display for StepClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{} every {} s", self.start, self.end, self.step_length)
    }
}
