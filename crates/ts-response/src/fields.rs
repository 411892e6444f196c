//! The `TRAJ` attribute schema.
//!
//! Every vehicle attribute the client understands is listed once in
//! [`TRAJ_FIELDS`], keyed by its wire name, together with the typed field it
//! fills and how its text is coerced.  Attributes not in the table are
//! ignored; a value that fails coercion rejects the whole payload.

use ts_core::VehicleId;

use crate::{ParseError, ParseResult, VehicleRecord};

/// Typed destination of a wire attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrajField {
    Id,
    VehicleType,
    Link,
    Lane,
    Position,
    Abscissa,
    Ordinate,
    Elevation,
    Speed,
    Acceleration,
    Travelled,
    Leader,
    Driven,
}

/// How the attribute text is converted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Coercion {
    /// `f64`.
    Float,
    /// Non-negative integer.
    Unsigned,
    /// Signed integer where negative means "none".
    OptionalId,
    /// Kept verbatim.
    Text,
    /// Non-empty means `true`.
    Presence,
}

/// Wire name → (field, coercion).  `deltaN` and anything else unlisted is
/// skipped.
pub const TRAJ_FIELDS: &[(&str, TrajField, Coercion)] = &[
    ("id",            TrajField::Id,           Coercion::Unsigned),
    ("type",          TrajField::VehicleType,  Coercion::Text),
    ("tron",          TrajField::Link,         Coercion::Text),
    ("voie",          TrajField::Lane,         Coercion::Unsigned),
    ("dst",           TrajField::Position,     Coercion::Float),
    ("abs",           TrajField::Abscissa,     Coercion::Float),
    ("ord",           TrajField::Ordinate,     Coercion::Float),
    ("z",             TrajField::Elevation,    Coercion::Float),
    ("vit",           TrajField::Speed,        Coercion::Float),
    ("acc",           TrajField::Acceleration, Coercion::Float),
    ("dst_parcourue", TrajField::Travelled,    Coercion::Float),
    ("lead",          TrajField::Leader,       Coercion::OptionalId),
    ("etat_pilotage", TrajField::Driven,       Coercion::Presence),
];

/// Look up a wire attribute name.
pub fn lookup(wire: &[u8]) -> Option<(&'static str, TrajField, Coercion)> {
    TRAJ_FIELDS
        .iter()
        .find(|(name, _, _)| name.as_bytes() == wire)
        .copied()
}

// ── Coercion ──────────────────────────────────────────────────────────────────

fn float(name: &'static str, raw: &str) -> ParseResult<f64> {
    raw.trim().parse().map_err(|_| invalid(name, raw))
}

fn unsigned<T: TryFrom<u64>>(name: &'static str, raw: &str) -> ParseResult<T> {
    let n: u64 = raw.trim().parse().map_err(|_| invalid(name, raw))?;
    T::try_from(n).map_err(|_| invalid(name, raw))
}

fn invalid(field: &'static str, raw: &str) -> ParseError {
    ParseError::InvalidValue { field, value: raw.to_owned() }
}

/// Coerce `raw` and store it into `record`.
pub(crate) fn assign(record: &mut VehicleRecord, name: &'static str, field: TrajField, raw: &str) -> ParseResult<()> {
    match field {
        TrajField::Id => record.id = VehicleId(unsigned(name, raw)?),
        TrajField::Lane => record.lane = unsigned(name, raw)?,
        TrajField::VehicleType => record.vehicle_type = raw.to_owned(),
        TrajField::Link => record.link = raw.to_owned(),
        TrajField::Position => record.position = float(name, raw)?,
        TrajField::Abscissa => record.coordinates.x = float(name, raw)?,
        TrajField::Ordinate => record.coordinates.y = float(name, raw)?,
        TrajField::Elevation => record.elevation = float(name, raw)?,
        TrajField::Speed => record.speed = float(name, raw)?,
        TrajField::Acceleration => record.acceleration = float(name, raw)?,
        TrajField::Travelled => record.travelled = Some(float(name, raw)?),
        TrajField::Leader => {
            let n: i64 = raw.trim().parse().map_err(|_| invalid(name, raw))?;
            record.leader = VehicleId::from_raw(n);
        }
        TrajField::Driven => record.driven = !raw.trim().is_empty(),
    }
    Ok(())
}

/// Parse a non-negative integer attribute outside `TRAJ`.
pub(crate) fn count<T: TryFrom<u64>>(name: &'static str, raw: &str) -> ParseResult<T> {
    unsigned(name, raw)
}

/// Parse a float attribute outside `TRAJ`.
pub(crate) fn real(name: &'static str, raw: &str) -> ParseResult<f64> {
    float(name, raw)
}
