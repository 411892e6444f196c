//! Strongly typed identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.
//!
//! A [`VehicleId`] is only meaningful within the snapshot it came from.  The
//! engine recycles ids after a vehicle leaves the network, so two records with
//! the same id in different steps may describe different vehicles.  Use
//! `ts_response::VehicleTracker` when identity across steps matters.

use std::fmt;

/// Generate a typed ID wrapper around a primitive unsigned integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// The raw integer value.
            #[inline(always)]
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> $name {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Engine-assigned vehicle identifier, unique within one snapshot.
    pub struct VehicleId(u32);
}

typed_id! {
    /// Zero-based index of a completed simulation step.
    pub struct StepIndex(u64);
}

impl VehicleId {
    /// Convert a signed engine return value into an id.
    ///
    /// The engine signals failures (and "no leader") with negative values,
    /// which map to `None`.
    #[inline]
    pub fn from_raw(raw: i64) -> Option<VehicleId> {
        u32::try_from(raw).ok().map(VehicleId)
    }

    /// Value to hand back across the C ABI (`int`).
    #[inline]
    pub fn as_c_int(self) -> i32 {
        self.0 as i32
    }
}

impl StepIndex {
    pub const ZERO: StepIndex = StepIndex(0);

    /// The following step.
    #[inline]
    pub fn next(self) -> StepIndex {
        StepIndex(self.0 + 1)
    }

    /// `true` when this step falls on an aggregation boundary of `period`
    /// steps.  A period of zero or one matches every step.
    #[inline]
    pub fn is_boundary(self, period: u64) -> bool {
        period <= 1 || self.0.is_multiple_of(period)
    }
}
