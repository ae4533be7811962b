//! Merging identity-less surface snapshots back into the pin list.
//!
//! The rendering surface reports its whole marker list on every refresh as
//! bare `(position, color)` pairs. Identity is recovered by index: the i-th
//! observed marker is assumed to be the i-th known pin. That holds for plain
//! moves as long as the surface keeps its object order, which is the common
//! case but not guaranteed. If the surface reorders objects, ids and labels
//! follow the new order; this is a known limitation and is not corrected here.

use chrono::{DateTime, Utc};

use crate::geometry::{Frame, Position};
use crate::pin::{Category, Pin};

/// One marker as the surface sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub position: Position,
    pub color: String,
}

impl Observation {
    pub fn new(position: Position, color: impl Into<String>) -> Self {
        Self {
            position,
            color: color.into(),
        }
    }
}

/// What kind of change a snapshot represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Same number of markers: positions and colors only.
    Update,
    Added(usize),
    Removed(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reconciled {
    pub pins: Vec<Pin>,
    pub next_id: u32,
    pub kind: ChangeKind,
}

/// Rebuilds the pin list from `observed`.
///
/// Pin `i` keeps the id, label and creation time of `previous[i]` where one
/// exists; position comes from the observation (clamped into `frame`) and the
/// category is re-derived from its color. Observations past the end of
/// `previous` become new pins numbered from `next_id`; previous pins past the
/// end of `observed` are dropped. Pure: the caller applies the result.
pub fn reconcile(
    previous: &[Pin],
    observed: &[Observation],
    next_id: u32,
    frame: &Frame,
    now: DateTime<Utc>,
) -> Reconciled {
    let kind = match observed.len().cmp(&previous.len()) {
        std::cmp::Ordering::Equal => ChangeKind::Update,
        std::cmp::Ordering::Greater => ChangeKind::Added(observed.len() - previous.len()),
        std::cmp::Ordering::Less => ChangeKind::Removed(previous.len() - observed.len()),
    };

    let highest_kept = previous
        .iter()
        .take(observed.len())
        .map(|p| p.id)
        .max()
        .unwrap_or(0);
    let mut next_id = next_id.max(highest_kept.saturating_add(1)).max(1);

    let pins = observed
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let position = frame.clamp(obs.position);
            let category = Category::from_color(&obs.color);
            match previous.get(i) {
                Some(prev) => Pin {
                    id: prev.id,
                    position,
                    category,
                    label: prev.label.clone(),
                    created_at: prev.created_at,
                },
                None => {
                    let id = next_id;
                    next_id = next_id.saturating_add(1);
                    Pin {
                        id,
                        position,
                        category,
                        label: String::new(),
                        created_at: now,
                    }
                }
            }
        })
        .collect();

    Reconciled {
        pins,
        next_id,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(id: u32, x: f64, y: f64, label: &str) -> Pin {
        Pin {
            id,
            position: Position::new(x, y),
            category: Category::Other,
            label: label.to_owned(),
            created_at: DateTime::from_timestamp(1_700_000_000 + i64::from(id), 0).unwrap_or_default(),
        }
    }

    fn frame() -> Frame {
        Frame::new(800.0, 400.0)
    }

    #[test]
    fn test_same_count_is_a_pure_update() {
        let previous = vec![pin(1, 10.0, 10.0, "RTW 1"), pin(2, 20.0, 20.0, "")];
        let observed = vec![
            Observation::new(Position::new(15.0, 15.0), "red"),
            Observation::new(Position::new(25.0, 25.0), "blue"),
        ];
        let out = reconcile(&previous, &observed, 3, &frame(), Utc::now());

        assert_eq!(out.kind, ChangeKind::Update);
        assert_eq!(out.next_id, 3);
        assert_eq!(out.pins.len(), 2);
        assert_eq!(out.pins[0].id, 1);
        assert_eq!(out.pins[0].position, Position::new(15.0, 15.0));
        assert_eq!(out.pins[0].category, Category::EmsPrimary);
        assert_eq!(out.pins[0].label, "RTW 1");
        assert_eq!(out.pins[1].id, 2);
        assert_eq!(out.pins[1].position, Position::new(25.0, 25.0));
        assert_eq!(out.pins[1].category, Category::FootPatrol);
        assert_eq!(out.pins[1].label, "");
    }

    #[test]
    fn test_update_preserves_ids_labels_and_creation_time() {
        let previous = vec![pin(4, 1.0, 1.0, "a"), pin(9, 2.0, 2.0, "b"), pin(12, 3.0, 3.0, "c")];
        let observed: Vec<_> = previous
            .iter()
            .map(|p| Observation::new(Position::new(p.position.x + 5.0, 7.0), "#ff8c00"))
            .collect();
        let out = reconcile(&previous, &observed, 13, &frame(), Utc::now());

        for (before, after) in previous.iter().zip(&out.pins) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.label, after.label);
            assert_eq!(before.created_at, after.created_at);
            assert_eq!(after.category, Category::EmsTransport);
        }
    }

    #[test]
    fn test_added_markers_get_fresh_ids() {
        let previous = vec![pin(1, 10.0, 10.0, "first")];
        let observed = vec![
            Observation::new(Position::new(10.0, 10.0), "#000000"),
            Observation::new(Position::new(50.0, 60.0), "#ff0000"),
            Observation::new(Position::new(70.0, 80.0), "#0066ff"),
        ];
        let now = Utc::now();
        let out = reconcile(&previous, &observed, 2, &frame(), now);

        assert_eq!(out.kind, ChangeKind::Added(2));
        let ids: Vec<u32> = out.pins.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(out.next_id, 4);
        assert_eq!(out.pins[0].label, "first");
        assert_eq!(out.pins[1].label, "");
        assert_eq!(out.pins[2].created_at, now);
    }

    #[test]
    fn test_removed_markers_drop_the_tail() {
        let previous = vec![pin(1, 1.0, 1.0, "a"), pin(2, 2.0, 2.0, "b"), pin(3, 3.0, 3.0, "c")];
        let observed = vec![Observation::new(Position::new(3.0, 3.0), "black")];
        let out = reconcile(&previous, &observed, 4, &frame(), Utc::now());

        assert_eq!(out.kind, ChangeKind::Removed(2));
        assert_eq!(out.pins.len(), 1);
        // Index pairing: the survivor inherits the first pin's identity.
        assert_eq!(out.pins[0].id, 1);
        assert_eq!(out.pins[0].label, "a");
        assert_eq!(out.next_id, 4);
    }

    #[test]
    fn test_next_id_advances_past_highest_id_in_use() {
        let previous = vec![pin(7, 1.0, 1.0, "")];
        let observed = vec![
            Observation::new(Position::new(1.0, 1.0), "#000000"),
            Observation::new(Position::new(2.0, 2.0), "#000000"),
        ];
        let out = reconcile(&previous, &observed, 1, &frame(), Utc::now());
        assert_eq!(out.pins[1].id, 8);
        assert_eq!(out.next_id, 9);
    }

    #[test]
    fn test_observations_are_clamped_into_frame() {
        let observed = vec![Observation::new(Position::new(-4.0, 900.0), "#ff0000")];
        let out = reconcile(&[], &observed, 1, &frame(), Utc::now());
        assert_eq!(out.pins[0].position, Position::new(0.0, 400.0));
        assert_eq!(out.pins[0].id, 1);
    }

    #[test]
    fn test_unknown_color_becomes_other() {
        let previous = vec![Pin {
            category: Category::EmsPrimary,
            ..pin(1, 1.0, 1.0, "")
        }];
        let observed = vec![Observation::new(Position::new(1.0, 1.0), "#abcdef")];
        let out = reconcile(&previous, &observed, 2, &frame(), Utc::now());
        assert_eq!(out.pins[0].category, Category::Other);
    }

    #[test]
    fn test_empty_snapshot_clears_everything() {
        let previous = vec![pin(1, 1.0, 1.0, "a")];
        let out = reconcile(&previous, &[], 2, &frame(), Utc::now());
        assert!(out.pins.is_empty());
        assert_eq!(out.kind, ChangeKind::Removed(1));
        assert_eq!(out.next_id, 2);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let previous = vec![pin(1, 10.0, 10.0, "x")];
        let observed = vec![
            Observation::new(Position::new(11.0, 12.0), "#ff0000"),
            Observation::new(Position::new(30.0, 40.0), "#0066ff"),
        ];
        let now = Utc::now();
        let a = reconcile(&previous, &observed, 2, &frame(), now);
        let b = reconcile(&previous, &observed, 2, &frame(), now);
        assert_eq!(a, b);
    }
}
