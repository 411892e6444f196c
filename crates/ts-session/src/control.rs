//! Access-control zones and zone speed.

/// Speed reported for a zone in which no travel time has accumulated, m/s.
pub const MFD_FLOOR_SPEED: f64 = 10.0;

/// A sensor zone registered with the engine for access control.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlZone {
    pub zone: String,
    /// Engine handle returned at registration.
    pub handle: i32,
    /// Probability that a vehicle is admitted into the zone.
    pub access_probability: f64,
    /// Distance upstream of the zone at which the policy applies, m.
    pub min_distance: f64,
}

/// Space-mean speed from zone totals: `distance / time`, or the floor when
/// no time has accumulated.
pub fn zone_speed(total_distance: f64, total_time: f64) -> f64 {
    if total_time > 0.0 { total_distance / total_time } else { MFD_FLOOR_SPEED }
}
