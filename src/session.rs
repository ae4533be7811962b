//! One user's map session: settings plus the pin registry, passed around
//! explicitly instead of living in globals.

use crate::config::MapConfig;
use crate::error::{MapError, ParseError};
use crate::export;
use crate::geometry::Position;
use crate::pin::{Category, Pin};
use crate::reconcile::ChangeKind;
use crate::registry::{PinRegistry, PinUpdate};
use crate::surface::{self, Interaction, Marker, SurfaceEvent};

/// Result of feeding one interaction into the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Created(Pin),
    Reconciled(ChangeKind),
}

#[derive(Clone, Debug)]
pub struct MapSession {
    config: MapConfig,
    registry: PinRegistry,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

impl MapSession {
    pub fn new(config: MapConfig) -> Self {
        config.validate();
        let registry = PinRegistry::new(config.frame(), config.deletion_policy);
        Self { config, registry }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    pub fn pins(&self) -> &[Pin] {
        self.registry.list()
    }

    /// Applies new settings. A frame change rescales existing pins.
    pub fn set_config(&mut self, config: MapConfig) {
        if config == self.config {
            return;
        }
        config.validate();
        self.registry.set_frame(config.frame());
        self.registry.set_policy(config.deletion_policy);
        self.config = config;
    }

    /// A click places a new pin of `category`; a snapshot is reconciled.
    pub fn handle(&mut self, interaction: Interaction, category: Category) -> Outcome {
        match interaction {
            Interaction::Click(pos) => Outcome::Created(self.registry.create(pos, category, None)),
            Interaction::Snapshot(observed) => {
                Outcome::Reconciled(self.registry.reconcile(&observed))
            }
        }
    }

    /// The pin a placement produced: the created pin, or the newest one when a
    /// snapshot added circles.
    pub fn placed_pin(&self, outcome: &Outcome) -> Option<u32> {
        match outcome {
            Outcome::Created(pin) => Some(pin.id),
            Outcome::Reconciled(ChangeKind::Added(_)) => self.pins().last().map(|p| p.id),
            Outcome::Reconciled(_) => None,
        }
    }

    /// Parses and applies a raw surface event.
    pub fn handle_event(&mut self, bytes: &[u8], category: Category) -> Result<Outcome, ParseError> {
        let interaction = SurfaceEvent::from_json(bytes)?.interaction()?;
        Ok(self.handle(interaction, category))
    }

    pub fn cell(&self, pin: &Pin) -> String {
        crate::grid::cell(pin.position, self.config.frame(), &self.config.grid_spec())
    }

    pub fn markers(&self) -> Vec<Marker> {
        surface::draw_list(
            self.registry.list(),
            self.config.frame(),
            &self.config.grid_spec(),
        )
    }

    pub fn rename(&mut self, id: u32, label: &str) -> Result<Pin, MapError> {
        self.registry.update(id, PinUpdate::label(label))
    }

    pub fn recategorize(&mut self, id: u32, category: Category) -> Result<Pin, MapError> {
        self.registry.update(id, PinUpdate::category(category))
    }

    pub fn move_pin(&mut self, id: u32, position: Position) -> Result<Pin, MapError> {
        self.registry.update(id, PinUpdate::position(position))
    }

    pub fn delete(&mut self, id: u32) -> Result<(), MapError> {
        self.registry.delete(id)
    }

    /// Deletes the pin drawn as the `index`-th marker.
    ///
    /// The surface knows which circle it removed, so the pin is deleted by id
    /// rather than reconciled, and the pins after it keep their names.
    pub fn delete_at(&mut self, index: usize) -> Option<u32> {
        let id = self.pins().get(index)?.id;
        self.registry.delete(id).ok()?;
        Some(id)
    }

    pub fn clear(&mut self) {
        self.registry.clear();
    }

    pub fn export_json(&self) -> Vec<u8> {
        export::to_json(self.registry.list())
    }

    pub fn export_csv(&self) -> Vec<u8> {
        export::to_csv_with_cells(
            self.registry.list(),
            self.config.frame(),
            &self.config.grid_spec(),
        )
    }

    /// Replaces all pins with an exported pin array. On error nothing changes.
    pub fn import_json(&mut self, bytes: &[u8]) -> Result<usize, MapError> {
        let pins = export::from_json(bytes).inspect_err(|e| log::warn!("import rejected: {e}"))?;
        let count = pins.len();
        self.registry.restore(pins, 1);
        Ok(count)
    }

    pub fn save_document(&self) -> Vec<u8> {
        export::to_session_json(&self.registry)
    }

    /// Restores a session document. On error nothing changes.
    pub fn load_document(&mut self, bytes: &[u8]) -> Result<usize, MapError> {
        let (pins, next_id) = export::from_session_json(bytes)?;
        let count = pins.len();
        self.registry.restore(pins, next_id);
        Ok(count)
    }
}
