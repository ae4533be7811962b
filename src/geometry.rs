//! Coordinates and the rectangular frame they live in.
//!
//! A frame is either the raw pixel rectangle of the background image or a
//! normalized `100 × 100·aspect` rectangle. Positions are always kept inside
//! the frame by clamping.

use serde::{Deserialize, Serialize};

/// Width of a normalized frame; its height follows the image aspect ratio.
pub const NORMALIZED_WIDTH: f64 = 100.0;

/// A point in frame coordinates. The origin is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which coordinate space the frame describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Raw pixel space of the source image.
    #[default]
    Pixel,
    /// `0..100` horizontally, `0..100·aspect` vertically.
    Normalized,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
        }
    }
}

impl Frame {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Frame for an image of `image_width × image_height` pixels in the given space.
    pub fn for_image(space: CoordinateSpace, image_width: u32, image_height: u32) -> Self {
        let (w, h) = (f64::from(image_width.max(1)), f64::from(image_height.max(1)));
        match space {
            CoordinateSpace::Pixel => Self::new(w, h),
            CoordinateSpace::Normalized => Self::new(NORMALIZED_WIDTH, NORMALIZED_WIDTH * h / w),
        }
    }

    /// A frame with zero, negative or non-finite extent cannot hold positions.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    /// Clamps `pos` into `[0, width] × [0, height]`. Non-finite coordinates land on the origin.
    pub fn clamp(&self, pos: Position) -> Position {
        let axis = |v: f64, max: f64| {
            if v.is_finite() {
                v.clamp(0.0, max.max(0.0))
            } else {
                0.0
            }
        };
        Position::new(axis(pos.x, self.width), axis(pos.y, self.height))
    }

    /// Maps `pos` from `from` into this frame proportionally, e.g. pixel → normalized.
    pub fn map_from(&self, from: &Self, pos: Position) -> Position {
        if from.is_degenerate() {
            return self.clamp(pos);
        }
        self.clamp(Position::new(
            pos.x / from.width * self.width,
            pos.y / from.height * self.height,
        ))
    }
}
