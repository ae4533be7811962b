use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ParseError};
use crate::geometry::{CoordinateSpace, Frame};
use crate::grid::{GridLayout, GridSpec, Padding};
use crate::registry::DeletionPolicy;

const DEFAULT_MARKER_RADIUS: f64 = 8.0;

/// Map settings. Every field has a default so partial files and older
/// persisted state still load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub frame_width: f64,
    pub frame_height: f64,
    pub coordinate_space: CoordinateSpace,
    pub padding: Padding,
    pub invert_y: bool,
    pub grid: GridLayout,
    pub deletion_policy: DeletionPolicy,
    /// Radius of the circles drawn for pins, in frame units.
    pub marker_radius: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        let frame = Frame::default();
        Self {
            frame_width: frame.width,
            frame_height: frame.height,
            coordinate_space: CoordinateSpace::Pixel,
            padding: Padding::default(),
            invert_y: false,
            grid: GridLayout::default(),
            deletion_policy: DeletionPolicy::Gap,
            marker_radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

impl MapConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }

    pub fn frame(&self) -> Frame {
        Frame::new(self.frame_width, self.frame_height)
    }

    /// Adopts the frame of a freshly loaded background image. Padding is
    /// stretched along with the frame so grid cells keep their place.
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        let old = self.frame();
        let frame = Frame::for_image(self.coordinate_space, width, height);
        if !old.is_degenerate() {
            self.padding = self
                .padding
                .scaled(frame.width / old.width, frame.height / old.height);
        }
        self.frame_width = frame.width;
        self.frame_height = frame.height;
    }

    pub fn grid_spec(&self) -> GridSpec {
        GridSpec {
            padding: self.padding,
            invert_y: self.invert_y,
            layout: self.grid,
        }
    }

    /// Problems the grid mapper will work around. Each one is logged.
    pub fn validate(&self) -> Vec<ConfigurationError> {
        let problems = self.grid_spec().validate(self.frame());
        for problem in &problems {
            log::warn!("configuration: {problem}");
        }
        problems
    }
}
