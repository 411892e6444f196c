//! Command arguments.

use ts_core::VehicleId;

/// A vehicle to inject at a network endpoint.
///
/// ```rust,ignore
/// session.create_vehicle(&VehicleRequest::new("VL", "Ext_In", "Ext_Out").lane(2))?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleRequest {
    pub vehicle_type: String,
    pub origin: String,
    pub destination: String,
    /// Entry lane, 1 = rightmost.
    pub lane: u16,
    /// Creation instant within the coming step, s.
    pub time: f64,
    /// Imposed route as link ids; empty lets the engine choose.
    pub route: Vec<String>,
}

impl VehicleRequest {
    pub fn new(vehicle_type: impl Into<String>, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            vehicle_type: vehicle_type.into(),
            origin:       origin.into(),
            destination:  destination.into(),
            lane:         1,
            time:         0.0,
            route:        Vec::new(),
        }
    }

    pub fn lane(mut self, lane: u16) -> Self {
        self.lane = lane;
        self
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn route<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route = links.into_iter().map(Into::into).collect();
        self
    }
}

/// Impose a position on a vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct DriveRequest {
    pub id: VehicleId,
    /// Longitudinal position on the target link, m.
    pub position: f64,
    /// Target link; the vehicle's current link when `None`.
    pub link: Option<String>,
    pub lane: u16,
}

impl DriveRequest {
    pub fn new(id: VehicleId, position: f64) -> Self {
        Self { id, position, link: None, lane: 1 }
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn lane(mut self, lane: u16) -> Self {
        self.lane = lane;
        self
    }
}
