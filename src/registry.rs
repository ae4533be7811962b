use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::geometry::{Frame, Position};
use crate::pin::{Category, Pin};
use crate::reconcile::{self, ChangeKind, Observation, Reconciled};

/// What happens to the remaining ids when a pin is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Ids stay as they are; gaps are allowed.
    #[default]
    Gap,
    /// Remaining pins are renumbered `1..=count` in their current order.
    Renumber,
}

impl DeletionPolicy {
    pub const ALL: [Self; 2] = [Self::Gap, Self::Renumber];

    pub fn name(self) -> &'static str {
        match self {
            Self::Gap => "gap",
            Self::Renumber => "renumber",
        }
    }
}

/// Fields to change on an existing pin; `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PinUpdate {
    pub label: Option<String>,
    pub category: Option<Category>,
    pub position: Option<Position>,
}

impl PinUpdate {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

/// The authoritative, ordered list of pins of one session.
///
/// Ids come from a monotonic counter starting at 1. Positions are clamped
/// into the registry's frame on every write.
#[derive(Clone, Debug)]
pub struct PinRegistry {
    pins: Vec<Pin>,
    next_id: u32,
    frame: Frame,
    policy: DeletionPolicy,
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new(Frame::default(), DeletionPolicy::default())
    }
}

impl PinRegistry {
    pub fn new(frame: Frame, policy: DeletionPolicy) -> Self {
        Self {
            pins: Vec::new(),
            next_id: 1,
            frame,
            policy,
        }
    }

    pub fn list(&self) -> &[Pin] {
        &self.pins
    }

    pub fn get(&self, id: u32) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn policy(&self) -> DeletionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DeletionPolicy) {
        self.policy = policy;
    }

    /// Switches to a new frame, scaling every pin proportionally.
    pub fn set_frame(&mut self, frame: Frame) {
        if frame == self.frame {
            return;
        }
        let old = self.frame;
        for pin in &mut self.pins {
            pin.position = frame.map_from(&old, pin.position);
        }
        log::debug!(
            "frame changed from {}x{} to {}x{}, rescaled {} pins",
            old.width,
            old.height,
            frame.width,
            frame.height,
            self.pins.len()
        );
        self.frame = frame;
    }

    pub fn create(&mut self, position: Position, category: Category, label: Option<&str>) -> Pin {
        let pin = Pin {
            id: self.next_id,
            position: self.frame.clamp(position),
            category,
            label: label.unwrap_or_default().to_owned(),
            created_at: Utc::now(),
        };
        self.next_id = self.next_id.saturating_add(1);
        log::info!(
            "created pin #{} ({}) at ({:.1}, {:.1})",
            pin.id,
            category.key(),
            pin.position.x,
            pin.position.y
        );
        self.pins.push(pin.clone());
        pin
    }

    pub fn update(&mut self, id: u32, fields: PinUpdate) -> Result<Pin, MapError> {
        let frame = self.frame;
        let Some(pin) = self.pins.iter_mut().find(|p| p.id == id) else {
            log::warn!("update of unknown pin #{id}");
            return Err(MapError::NotFound(id));
        };
        if let Some(label) = fields.label {
            pin.label = label;
        }
        if let Some(category) = fields.category {
            pin.category = category;
        }
        if let Some(position) = fields.position {
            pin.position = frame.clamp(position);
        }
        log::debug!("updated pin #{id}");
        Ok(pin.clone())
    }

    pub fn delete(&mut self, id: u32) -> Result<(), MapError> {
        let Some(index) = self.pins.iter().position(|p| p.id == id) else {
            log::warn!("delete of unknown pin #{id}");
            return Err(MapError::NotFound(id));
        };
        self.pins.remove(index);
        if self.policy == DeletionPolicy::Renumber {
            self.renumber();
        }
        log::info!(
            "deleted pin #{id} ({} left, policy {})",
            self.pins.len(),
            self.policy.name()
        );
        Ok(())
    }

    fn renumber(&mut self) {
        for (pin, id) in self.pins.iter_mut().zip(1..) {
            pin.id = id;
        }
        self.next_id = self.pins.len() as u32 + 1;
    }

    /// Removes every pin and restarts ids at 1. Idempotent.
    pub fn clear(&mut self) {
        if !self.pins.is_empty() {
            log::info!("cleared {} pins", self.pins.len());
        }
        self.pins.clear();
        self.next_id = 1;
    }

    /// Merges a full surface snapshot into the registry.
    pub fn reconcile(&mut self, observed: &[Observation]) -> ChangeKind {
        let result =
            reconcile::reconcile(&self.pins, observed, self.next_id, &self.frame, Utc::now());
        let kind = result.kind;
        self.apply(result);
        kind
    }

    /// Replaces the pin list with a reconciliation result.
    pub fn apply(&mut self, reconciled: Reconciled) {
        match reconciled.kind {
            ChangeKind::Update => log::debug!("surface moved {} pins", reconciled.pins.len()),
            ChangeKind::Added(n) => log::info!("surface added {n} pins"),
            ChangeKind::Removed(n) => log::info!("surface removed {n} pins"),
        }
        self.pins = reconciled.pins;
        self.next_id = reconciled.next_id;
        self.bump_next_id();
    }

    /// Replaces the whole registry with imported pins.
    ///
    /// `next_id` is raised past the highest imported id if needed.
    pub fn restore(&mut self, pins: Vec<Pin>, next_id: u32) {
        let frame = self.frame;
        self.pins = pins
            .into_iter()
            .map(|mut p| {
                p.position = frame.clamp(p.position);
                p
            })
            .collect();
        self.next_id = next_id.max(1);
        self.bump_next_id();
        log::info!(
            "restored {} pins, next id {}",
            self.pins.len(),
            self.next_id
        );
    }

    fn bump_next_id(&mut self) {
        if let Some(max) = self.pins.iter().map(|p| p.id).max() {
            self.next_id = self.next_id.max(max.saturating_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(policy: DeletionPolicy) -> PinRegistry {
        PinRegistry::new(Frame::new(800.0, 400.0), policy)
    }

    fn ids(reg: &PinRegistry) -> Vec<u32> {
        reg.list().iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_create_then_list_ends_with_created_pin() {
        let mut reg = registry(DeletionPolicy::Gap);
        reg.create(Position::new(1.0, 1.0), Category::Other, None);
        let pin = reg.create(Position::new(10.0, 20.0), Category::EmsPrimary, Some("RTW 1"));
        assert_eq!(reg.list().last(), Some(&pin));
        assert_eq!(pin.id, 2);
        assert_eq!(reg.next_id(), 3);
    }

    #[test]
    fn test_create_clamps_position() {
        let mut reg = registry(DeletionPolicy::Gap);
        let pin = reg.create(Position::new(-10.0, 1000.0), Category::Other, None);
        assert_eq!(pin.position, Position::new(0.0, 400.0));
        assert_eq!(pin.label, "");
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let mut reg = registry(DeletionPolicy::Gap);
        let pin = reg.create(Position::new(5.0, 5.0), Category::Other, Some("old"));

        let updated = reg
            .update(pin.id, PinUpdate::category(Category::FootPatrol))
            .unwrap();
        assert_eq!(updated.label, "old");
        assert_eq!(updated.position, pin.position);
        assert_eq!(updated.color(), "#0066ff");
        assert_eq!(updated.created_at, pin.created_at);

        let updated = reg.update(pin.id, PinUpdate::label("new")).unwrap();
        assert_eq!(updated.label, "new");
        assert_eq!(updated.category, Category::FootPatrol);

        let updated = reg
            .update(pin.id, PinUpdate::position(Position::new(900.0, 50.0)))
            .unwrap();
        assert_eq!(updated.position, Position::new(800.0, 50.0));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let mut reg = registry(DeletionPolicy::Gap);
        let err = reg.update(42, PinUpdate::label("x")).unwrap_err();
        assert!(matches!(err, MapError::NotFound(42)));
    }

    #[test]
    fn test_delete_with_gap_policy_keeps_ids() {
        let mut reg = registry(DeletionPolicy::Gap);
        for i in 0..4 {
            reg.create(Position::new(f64::from(i), 0.0), Category::Other, None);
        }
        reg.delete(2).unwrap();
        assert_eq!(ids(&reg), vec![1, 3, 4]);
        assert_eq!(reg.next_id(), 5);
        assert_eq!(reg.create(Position::default(), Category::Other, None).id, 5);
    }

    #[test]
    fn test_delete_with_renumber_policy_is_dense() {
        let mut reg = registry(DeletionPolicy::Renumber);
        for i in 0..4 {
            reg.create(Position::new(f64::from(i), 0.0), Category::Other, Some(i.to_string().as_str()));
        }
        reg.delete(2).unwrap();
        assert_eq!(ids(&reg), vec![1, 2, 3]);
        let labels: Vec<&str> = reg.list().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "2", "3"]);
        assert_eq!(reg.next_id(), 4);

        reg.delete(1).unwrap();
        assert_eq!(ids(&reg), vec![1, 2]);
        assert_eq!(reg.next_id(), 3);
    }

    #[test]
    fn test_delete_unknown_id_is_not_found() {
        for policy in DeletionPolicy::ALL {
            let mut reg = registry(policy);
            reg.create(Position::default(), Category::Other, None);
            assert!(matches!(reg.delete(7), Err(MapError::NotFound(7))));
            assert_eq!(reg.len(), 1);
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut reg = registry(DeletionPolicy::Gap);
        reg.create(Position::default(), Category::Other, None);
        reg.create(Position::default(), Category::Other, None);
        reg.clear();
        assert!(reg.is_empty());
        assert_eq!(reg.next_id(), 1);
        reg.clear();
        assert!(reg.is_empty());
        assert_eq!(reg.next_id(), 1);
    }

    #[test]
    fn test_reconcile_scenario_keeps_ids_and_labels() {
        let mut reg = registry(DeletionPolicy::Gap);
        reg.create(Position::new(10.0, 10.0), Category::Other, Some("alpha"));
        reg.create(Position::new(20.0, 20.0), Category::Other, Some("bravo"));

        let kind = reg.reconcile(&[
            Observation::new(Position::new(15.0, 15.0), "red"),
            Observation::new(Position::new(25.0, 25.0), "blue"),
        ]);
        assert_eq!(kind, ChangeKind::Update);
        let pins = reg.list();
        assert_eq!(pins[0].id, 1);
        assert_eq!(pins[0].position, Position::new(15.0, 15.0));
        assert_eq!(pins[0].label, "alpha");
        assert_eq!(pins[1].id, 2);
        assert_eq!(pins[1].position, Position::new(25.0, 25.0));
        assert_eq!(pins[1].label, "bravo");
    }

    #[test]
    fn test_reconcile_add_continues_numbering_after_gap_delete() {
        let mut reg = registry(DeletionPolicy::Gap);
        for _ in 0..3 {
            reg.create(Position::default(), Category::Other, None);
        }
        reg.delete(3).unwrap();
        reg.reconcile(&[
            Observation::new(Position::default(), "#000000"),
            Observation::new(Position::default(), "#000000"),
            Observation::new(Position::new(9.0, 9.0), "#ff0000"),
        ]);
        assert_eq!(ids(&reg), vec![1, 2, 4]);
        assert_eq!(reg.next_id(), 5);
    }

    #[test]
    fn test_restore_raises_next_id() {
        let mut reg = registry(DeletionPolicy::Gap);
        let mut donor = registry(DeletionPolicy::Gap);
        for _ in 0..5 {
            donor.create(Position::default(), Category::Other, None);
        }
        reg.restore(donor.list().to_vec(), 2);
        assert_eq!(reg.len(), 5);
        assert_eq!(reg.next_id(), 6);
    }

    #[test]
    fn test_set_frame_rescales_pins() {
        let mut reg = registry(DeletionPolicy::Gap);
        reg.create(Position::new(400.0, 200.0), Category::Other, None);
        reg.set_frame(Frame::new(100.0, 50.0));
        assert_eq!(reg.list()[0].position, Position::new(50.0, 25.0));
    }
}
