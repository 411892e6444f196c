//! Payload → [`StepSnapshot`].
//!
//! The parser is a single forward pass over the XML events.  It allocates
//! only the output snapshot plus a small id index used to resolve duplicate
//! `TRAJ` entries.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use ts_core::VehicleId;

use crate::fields::{self, lookup};
use crate::{CreationEvent, EntryQueue, ExitEvent, ParseError, ParseResult, StepSnapshot, VehicleRecord};

#[cfg(feature = "fx-hash")]
type IdIndex = rustc_hash::FxHashMap<VehicleId, usize>;
#[cfg(not(feature = "fx-hash"))]
type IdIndex = std::collections::HashMap<VehicleId, usize>;

/// Parse one step of engine output.
///
/// `payload` is the raw response buffer; anything from the first NUL byte
/// onwards is ignored.  The function is pure: the same bytes always yield the
/// same snapshot.
///
/// # Errors
///
/// - [`ParseError::Empty`] when nothing precedes the first NUL.
/// - [`ParseError::MissingInstant`] when the root element is not `INST`.
/// - [`ParseError::Truncated`] when the payload ends before `</INST>`.
/// - [`ParseError::MissingField`] / [`ParseError::InvalidValue`] for a
///   required attribute that is absent or does not coerce.
pub fn parse_step(payload: &[u8]) -> ParseResult<StepSnapshot> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    let payload = &payload[..end];
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let mut reader = Reader::from_reader(payload);
    let mut snapshot: Option<StepSnapshot> = None;
    let mut index = IdIndex::default();
    let mut reported: Option<u32> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            // An unterminated tag inside an open instant is a cut-off buffer.
            Err(quick_xml::Error::Syntax(_)) if snapshot.is_some() => return Err(ParseError::Truncated),
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        };
        match event {
            Event::Start(e) | Event::Empty(e) => {
                if snapshot.is_none() {
                    if e.name().as_ref() != b"INST" {
                        let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        return Err(ParseError::MissingInstant(found));
                    }
                    let (time, count) = instant(&e)?;
                    reported = count;
                    snapshot = Some(StepSnapshot::empty(time));
                    continue;
                }
                let Some(snap) = snapshot.as_mut() else { continue };
                match e.name().as_ref() {
                    b"TRAJ" => push_vehicle(snap, &mut index, trajectory(&e)?),
                    b"CREATION" => snap.creations.push(creation(&e)?),
                    b"SORTIE" => snap.exits.push(exit(&e)?),
                    b"ENTREE" => snap.entry_queues.push(entry_queue(&e)?),
                    _ => {}
                }
            }
            Event::End(e) if e.name().as_ref() == b"INST" => {
                let Some(mut snap) = snapshot else {
                    return Err(ParseError::Xml("unexpected </INST>".into()));
                };
                snap.reported_vehicle_count = reported.unwrap_or(snap.vehicles.len() as u32);
                return Ok(snap);
            }
            Event::Eof => {
                return Err(match snapshot {
                    Some(_) => ParseError::Truncated,
                    None => ParseError::MissingInstant(String::new()),
                });
            }
            _ => {}
        }
    }
}

fn push_vehicle(snap: &mut StepSnapshot, index: &mut IdIndex, record: VehicleRecord) {
    match index.get(&record.id) {
        Some(&slot) => {
            warn!(vehicle = record.id.get(), "duplicate TRAJ entry; keeping the last one");
            snap.vehicles[slot] = record;
        }
        None => {
            index.insert(record.id, snap.vehicles.len());
            snap.vehicles.push(record);
        }
    }
}

// ── Element readers ───────────────────────────────────────────────────────────

/// Iterate `(name, unescaped value)` pairs of an element.
fn attributes<'a>(e: &'a BytesStart<'a>) -> impl Iterator<Item = ParseResult<(Vec<u8>, String)>> + 'a {
    e.attributes().map(|attr| {
        let attr = attr.map_err(|err| ParseError::Xml(err.to_string()))?;
        let value = attr.unescape_value().map_err(|err| ParseError::Xml(err.to_string()))?;
        Ok((attr.key.as_ref().to_vec(), value.into_owned()))
    })
}

fn instant(e: &BytesStart<'_>) -> ParseResult<(f64, Option<u32>)> {
    let mut time = None;
    let mut count = None;
    for attr in attributes(e) {
        let (key, value) = attr?;
        match key.as_slice() {
            b"val" => time = Some(fields::real("val", &value)?),
            b"nbVeh" => count = Some(fields::count("nbVeh", &value)?),
            _ => {}
        }
    }
    let time = time.ok_or(ParseError::MissingField { element: "INST", field: "val" })?;
    Ok((time, count))
}

fn trajectory(e: &BytesStart<'_>) -> ParseResult<VehicleRecord> {
    let mut record = VehicleRecord::default();
    let mut has_id = false;
    for attr in attributes(e) {
        let (key, value) = attr?;
        let Some((name, field, _)) = lookup(&key) else {
            continue;
        };
        fields::assign(&mut record, name, field, &value)?;
        has_id |= name == "id";
    }
    if !has_id {
        return Err(ParseError::MissingField { element: "TRAJ", field: "id" });
    }
    Ok(record)
}

fn creation(e: &BytesStart<'_>) -> ParseResult<CreationEvent> {
    let mut id = None;
    let mut event = CreationEvent {
        id:           VehicleId::default(),
        origin:       String::new(),
        destination:  String::new(),
        vehicle_type: String::new(),
    };
    for attr in attributes(e) {
        let (key, value) = attr?;
        match key.as_slice() {
            b"id" => id = Some(VehicleId(fields::count("id", &value)?)),
            b"entree" => event.origin = value,
            b"sortie" => event.destination = value,
            b"type" => event.vehicle_type = value,
            _ => {}
        }
    }
    event.id = id.ok_or(ParseError::MissingField { element: "CREATION", field: "id" })?;
    Ok(event)
}

fn exit(e: &BytesStart<'_>) -> ParseResult<ExitEvent> {
    let mut id = None;
    let mut destination = None;
    let mut vehicle_type = None;
    for attr in attributes(e) {
        let (key, value) = attr?;
        match key.as_slice() {
            b"id" => id = Some(VehicleId(fields::count("id", &value)?)),
            b"sortie" => destination = Some(value),
            b"type" => vehicle_type = Some(value),
            _ => {}
        }
    }
    let id = id.ok_or(ParseError::MissingField { element: "SORTIE", field: "id" })?;
    Ok(ExitEvent { id, destination, vehicle_type })
}

fn entry_queue(e: &BytesStart<'_>) -> ParseResult<EntryQueue> {
    let mut endpoint = None;
    let mut waiting = 0;
    for attr in attributes(e) {
        let (key, value) = attr?;
        match key.as_slice() {
            b"id" => endpoint = Some(value),
            b"nb_veh_en_attente" => waiting = fields::count("nb_veh_en_attente", &value)?,
            _ => {}
        }
    }
    let endpoint = endpoint.ok_or(ParseError::MissingField { element: "ENTREE", field: "id" })?;
    Ok(EntryQueue { endpoint, waiting })
}
