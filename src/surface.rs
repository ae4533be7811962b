//! Boundary with the rendering surface.
//!
//! Inbound, the surface sends either a single click or its complete list of
//! drawn objects. Only circles are pins; a circle's `left`/`top` is the
//! corner of its bounding box, so the pin sits at `(left + r, top + r)`.
//! Outbound, the surface gets a declarative list of markers to draw.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::geometry::{Frame, Position};
use crate::grid::{self, GridSpec};
use crate::pin::{Category, Pin};
use crate::reconcile::Observation;

const DEFAULT_RADIUS: f64 = 8.0;
const CIRCLE: &str = "circle";

fn default_radius() -> f64 {
    DEFAULT_RADIUS
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Click {
    pub x: f64,
    pub y: f64,
}

/// One object drawn on the surface. Carries no identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceObject {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default)]
    pub fill: Option<String>,
}

impl SurfaceObject {
    pub fn circle(center: Position, radius: f64, fill: impl Into<String>) -> Self {
        Self {
            kind: Some(CIRCLE.to_owned()),
            left: center.x - radius,
            top: center.y - radius,
            radius,
            fill: Some(fill.into()),
        }
    }

    pub fn is_circle(&self) -> bool {
        self.kind.as_deref() == Some(CIRCLE)
    }

    pub fn center(&self) -> Position {
        Position::new(self.left + self.radius, self.top + self.radius)
    }

    pub fn set_center(&mut self, center: Position) {
        self.left = center.x - self.radius;
        self.top = center.y - self.radius;
    }

    pub fn contains(&self, point: Position) -> bool {
        let c = self.center();
        let (dx, dy) = (point.x - c.x, point.y - c.y);
        dx * dx + dy * dy <= self.radius * self.radius
    }

    /// The pin observation for this object, if it is a circle.
    pub fn observation(&self) -> Option<Observation> {
        self.is_circle().then(|| {
            Observation::new(
                self.center(),
                self.fill.as_deref().unwrap_or(Category::Other.color()),
            )
        })
    }
}

/// A raw event as delivered by the surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceEvent {
    #[serde(default)]
    pub last_click: Option<Click>,
    #[serde(default)]
    pub objects: Option<Vec<SurfaceObject>>,
}

/// A validated surface event.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    /// A single click in frame-local coordinates.
    Click(Position),
    /// The surface's complete current marker list, in surface order.
    Snapshot(Vec<Observation>),
}

impl SurfaceEvent {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// An object list wins over a click: it already reflects the click.
    pub fn interaction(&self) -> Result<Interaction, ParseError> {
        if let Some(objects) = &self.objects {
            return Ok(Interaction::Snapshot(observations(objects)));
        }
        match self.last_click {
            Some(click) => Ok(Interaction::Click(Position::new(click.x, click.y))),
            None => Err(ParseError::EmptyEvent),
        }
    }
}

pub fn observations(objects: &[SurfaceObject]) -> Vec<Observation> {
    objects.iter().filter_map(SurfaceObject::observation).collect()
}

/// What the surface should draw for one pin.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: u32,
    pub position: Position,
    pub tooltip_text: String,
    pub popup_text: String,
    pub color: &'static str,
    pub cell: String,
}

pub fn draw_list(pins: &[Pin], frame: Frame, spec: &GridSpec) -> Vec<Marker> {
    pins.iter()
        .map(|pin| {
            let cell = grid::cell(pin.position, frame, spec);
            Marker {
                id: pin.id,
                position: pin.position,
                tooltip_text: format!("#{} {}", pin.id, pin.display_label()),
                popup_text: format!(
                    "{} ({})\n{} @ ({:.1}, {:.1})",
                    pin.display_label(),
                    pin.category.display_name(),
                    cell,
                    pin.position.x,
                    pin.position.y
                ),
                color: pin.color(),
                cell,
            }
        })
        .collect()
}

/// Surface objects for a draw list, in the same order.
pub fn to_objects(markers: &[Marker], radius: f64) -> Vec<SurfaceObject> {
    markers
        .iter()
        .map(|m| SurfaceObject::circle(m.position, radius, m.color))
        .collect()
}
