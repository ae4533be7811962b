//! JSON and CSV exports of the pin list, and the session document.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::geometry::{Frame, Position};
use crate::grid::{self, GridSpec};
use crate::pin::{Category, Pin};
use crate::registry::PinRegistry;

pub const CSV_HEADER: &str = "id,category,label,created_at,x,y";

/// Flat export record; field order is the serialized order.
#[derive(Serialize)]
struct PinRecord<'a> {
    id: u32,
    x: f64,
    y: f64,
    category: Category,
    label: &'a str,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Pin> for PinRecord<'a> {
    fn from(pin: &'a Pin) -> Self {
        Self {
            id: pin.id,
            x: pin.position.x,
            y: pin.position.y,
            category: pin.category,
            label: &pin.label,
            created_at: pin.created_at,
        }
    }
}

/// Import side: everything optional so missing fields can be reported by name.
#[derive(Deserialize)]
struct RawPinRecord {
    id: Option<u32>,
    x: Option<f64>,
    y: Option<f64>,
    category: Option<String>,
    label: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct SessionDocument<'a> {
    pins: Vec<PinRecord<'a>>,
    next_id: u32,
}

#[derive(Deserialize)]
struct RawSessionDocument {
    pins: Vec<RawPinRecord>,
    next_id: Option<u32>,
}

pub fn to_json(pins: &[Pin]) -> Vec<u8> {
    let records: Vec<PinRecord<'_>> = pins.iter().map(PinRecord::from).collect();
    // Serializing plain structs with string keys cannot fail.
    serde_json::to_vec_pretty(&records).unwrap_or_default()
}

pub fn from_json(bytes: &[u8]) -> Result<Vec<Pin>, ParseError> {
    let raw: Vec<RawPinRecord> = serde_json::from_slice(bytes)?;
    validate(raw, Utc::now())
}

/// `{ "pins": [...], "next_id": n }`, the persisted form of a registry.
pub fn to_session_json(registry: &PinRegistry) -> Vec<u8> {
    let doc = SessionDocument {
        pins: registry.list().iter().map(PinRecord::from).collect(),
        next_id: registry.next_id(),
    };
    serde_json::to_vec_pretty(&doc).unwrap_or_default()
}

/// Parses a session document. A missing `next_id` is derived from the highest id.
pub fn from_session_json(bytes: &[u8]) -> Result<(Vec<Pin>, u32), ParseError> {
    let raw: RawSessionDocument = serde_json::from_slice(bytes)?;
    let pins = validate(raw.pins, Utc::now())?;
    let highest = pins.iter().map(|p| p.id).max().unwrap_or(0);
    let next_id = raw.next_id.unwrap_or(0).max(highest.saturating_add(1));
    Ok((pins, next_id))
}

fn validate(raw: Vec<RawPinRecord>, now: DateTime<Utc>) -> Result<Vec<Pin>, ParseError> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, r)| {
            let missing = |field| ParseError::MissingField { index, field };
            let id = r.id.ok_or_else(|| missing("id"))?;
            let x = r.x.ok_or_else(|| missing("x"))?;
            let y = r.y.ok_or_else(|| missing("y"))?;
            let category = r.category.ok_or_else(|| missing("category"))?;
            let category =
                Category::parse(&category).ok_or_else(|| ParseError::UnknownCategory {
                    index,
                    value: category.clone(),
                })?;
            if id == 0 {
                return Err(ParseError::ZeroId(index));
            }
            if !seen.insert(id) {
                return Err(ParseError::DuplicateId(id));
            }
            Ok(Pin {
                id,
                position: Position::new(x, y),
                category,
                label: r.label.unwrap_or_default(),
                created_at: r.created_at.unwrap_or(now),
            })
        })
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

fn csv_row(pin: &Pin) -> String {
    format!(
        "{},{},{},{},{:.1},{:.1}",
        pin.id,
        pin.category.key(),
        csv_field(&pin.label),
        pin.created_at.to_rfc3339(),
        pin.position.x,
        pin.position.y
    )
}

pub fn to_csv(pins: &[Pin]) -> Vec<u8> {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for pin in pins {
        out.push_str(&csv_row(pin));
        out.push('\n');
    }
    out.into_bytes()
}

/// Like [`to_csv`] with a trailing `cell` column holding each pin's grid cell.
pub fn to_csv_with_cells(pins: &[Pin], frame: Frame, spec: &GridSpec) -> Vec<u8> {
    let mut out = format!("{CSV_HEADER},cell\n");
    for pin in pins {
        out.push_str(&csv_row(pin));
        out.push(',');
        out.push_str(&grid::cell(pin.position, frame, spec));
        out.push('\n');
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeletionPolicy;

    fn sample_pins() -> Vec<Pin> {
        Category::ALL
            .into_iter()
            .enumerate()
            .map(|(i, category)| Pin {
                id: i as u32 * 3 + 1,
                position: Position::new(12.345_678 * (i as f64 + 1.0), 0.1 + i as f64 / 7.0),
                category,
                label: if i == 1 { String::new() } else { format!("Unit \"{i}\", Süd") },
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_json_round_trip() {
        let pins = sample_pins();
        let back = from_json(&to_json(&pins)).unwrap();
        assert_eq!(back, pins);
    }

    #[test]
    fn test_json_field_order_and_names() {
        let pins = sample_pins();
        let text = String::from_utf8(to_json(&pins[..1])).unwrap();
        let id = text.find("\"id\"").unwrap();
        let x = text.find("\"x\"").unwrap();
        let y = text.find("\"y\"").unwrap();
        let category = text.find("\"category\"").unwrap();
        let label = text.find("\"label\"").unwrap();
        let created = text.find("\"created_at\"").unwrap();
        assert!(id < x && x < y && y < category && category < label && label < created);
        assert!(text.contains("\"ems-primary\""));
        assert!(text.contains('\n'), "export should be indented");
    }

    #[test]
    fn test_from_json_defaults_missing_label() {
        let json = br#"[{"id": 3, "x": 1, "y": 2.5, "category": "foot-patrol"}]"#;
        let pins = from_json(json).unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].id, 3);
        assert_eq!(pins[0].label, "");
        assert_eq!(pins[0].position, Position::new(1.0, 2.5));
        assert_eq!(pins[0].category, Category::FootPatrol);
    }

    #[test]
    fn test_from_json_rejects_missing_required_field() {
        let json = br#"[{"id": 1, "x": 1, "y": 2, "category": "other"}, {"id": 2, "y": 2, "category": "other"}]"#;
        match from_json(json) {
            Err(ParseError::MissingField { index, field }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "x");
            }
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_names_each_missing_required_field() {
        let cases: [(&[u8], &str); 4] = [
            (br#"[{"x": 1, "y": 2, "category": "other"}]"#, "id"),
            (br#"[{"id": 1, "y": 2, "category": "other"}]"#, "x"),
            (br#"[{"id": 1, "x": 1, "category": "other"}]"#, "y"),
            (br#"[{"id": 1, "x": 1, "y": 2, "label": "RTW"}]"#, "category"),
        ];
        for (json, expected) in cases {
            match from_json(json) {
                Err(ParseError::MissingField { index: 0, field }) => assert_eq!(field, expected),
                other => panic!("expected missing {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_from_json_rejects_zero_id() {
        let json = br#"[{"id": 2, "x": 1, "y": 2, "category": "other"}, {"id": 0, "x": 1, "y": 2, "category": "other"}]"#;
        assert!(matches!(from_json(json), Err(ParseError::ZeroId(1))));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(from_json(b"[{\"id\": 1,"), Err(ParseError::Json(_))));
        assert!(matches!(from_json(b"{\"pins\": []}"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_from_json_rejects_unknown_category_and_duplicates() {
        let json = br#"[{"id": 1, "x": 1, "y": 2, "category": "helicopter"}]"#;
        assert!(matches!(
            from_json(json),
            Err(ParseError::UnknownCategory { index: 0, .. })
        ));
        let json = br#"[{"id": 1, "x": 1, "y": 2, "category": "other"}, {"id": 1, "x": 1, "y": 2, "category": "other"}]"#;
        assert!(matches!(from_json(json), Err(ParseError::DuplicateId(1))));
    }

    #[test]
    fn test_csv_header_and_rounding() {
        let pins = vec![Pin {
            id: 7,
            position: Position::new(10.04, 99.96),
            category: Category::EmsTransport,
            label: "KTW, north".to_owned(),
            created_at: DateTime::from_timestamp(0, 0).unwrap_or_default(),
        }];
        let text = String::from_utf8(to_csv(&pins)).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("7,ems-transport,\"KTW, north\",1970-01-01T00:00:00+00:00,10.0,100.0")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_with_cells_appends_grid_column() {
        let pins = vec![Pin {
            id: 1,
            position: Position::new(400.0, 200.0),
            category: Category::Other,
            label: String::new(),
            created_at: Utc::now(),
        }];
        let text =
            String::from_utf8(to_csv_with_cells(&pins, Frame::new(800.0, 400.0), &GridSpec::default()))
                .unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,category,label,created_at,x,y,cell"));
        assert!(lines.next().unwrap().ends_with(",400.0,200.0,E3"));
    }

    #[test]
    fn test_session_document_keeps_next_id() {
        let mut reg = PinRegistry::new(Frame::new(800.0, 400.0), DeletionPolicy::Gap);
        reg.create(Position::new(1.0, 1.0), Category::EmsPrimary, Some("a"));
        reg.create(Position::new(2.0, 2.0), Category::Other, None);
        reg.delete(2).unwrap();

        let (pins, next_id) = from_session_json(&to_session_json(&reg)).unwrap();
        assert_eq!(pins, reg.list());
        assert_eq!(next_id, 3);
    }

    #[test]
    fn test_session_document_without_next_id() {
        let json = br#"{"pins": [{"id": 4, "x": 0, "y": 0, "category": "other", "label": "x"}]}"#;
        let (pins, next_id) = from_session_json(json).unwrap();
        assert_eq!(pins[0].label, "x");
        assert_eq!(next_id, 5);
    }
}
