//! Coarse alphanumeric grid designations ("C3") for radio dispatch.
//!
//! The frame minus its padding is split into `cols × rows` equal cells.
//! Columns are lettered A, B, C, … from the left; rows are numbered from 1,
//! with row 1 at the top unless `invert_y` is set.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::geometry::{Frame, Position};

/// Keeps a fraction of exactly 1.0 inside the last cell.
const EDGE_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Padding {
    /// Padding for a frame stretched by `sx` horizontally and `sy` vertically.
    pub fn scaled(self, sx: f64, sy: f64) -> Self {
        Self {
            left: self.left * sx,
            right: self.right * sx,
            top: self.top * sy,
            bottom: self.bottom * sy,
        }
    }
}

/// Which part of the label comes first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridFormat {
    #[default]
    #[serde(rename = "COL-ROW")]
    ColRow,
    #[serde(rename = "ROW-COL")]
    RowCol,
}

impl GridFormat {
    pub const ALL: [Self; 2] = [Self::ColRow, Self::RowCol];

    pub fn name(self) -> &'static str {
        match self {
            Self::ColRow => "COL-ROW",
            Self::RowCol => "ROW-COL",
        }
    }
}

/// Column/row counts and label format, the `grid` section of the config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
    pub format: GridFormat,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 4,
            format: GridFormat::ColRow,
        }
    }
}

/// Everything the mapper needs besides the frame itself.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridSpec {
    pub padding: Padding,
    pub invert_y: bool,
    pub layout: GridLayout,
}

/// A resolved cell. Both indices are zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub col: usize,
    pub row: usize,
}

impl GridCell {
    pub fn column_name(&self) -> String {
        column_letters(self.col)
    }

    pub fn row_number(&self) -> usize {
        self.row + 1
    }

    pub fn label(&self, format: GridFormat) -> String {
        match format {
            GridFormat::ColRow => format!("{}{}", self.column_name(), self.row_number()),
            GridFormat::RowCol => format!("{}{}", self.row_number(), self.column_name()),
        }
    }
}

/// Spreadsheet-style column name: 0 → A, 25 → Z, 26 → AA.
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Label of the cell containing `pos`.
pub fn cell(pos: Position, frame: Frame, spec: &GridSpec) -> String {
    spec.locate(frame, pos).label(spec.layout.format)
}

fn unit_fraction(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn bucket(fraction: f64, count: usize) -> usize {
    let f = fraction.clamp(0.0, 1.0 - EDGE_EPSILON);
    ((f * count as f64).floor() as usize).min(count - 1)
}

impl GridSpec {
    pub fn cols(&self) -> usize {
        self.layout.cols.max(1) as usize
    }

    pub fn rows(&self) -> usize {
        self.layout.rows.max(1) as usize
    }

    /// Usable width and height: frame minus padding, never below 1.
    pub fn usable(&self, frame: Frame) -> (f64, f64) {
        let p = &self.padding;
        let w = frame.width - p.left - p.right;
        let h = frame.height - p.top - p.bottom;
        (
            if w.is_finite() { w.max(1.0) } else { 1.0 },
            if h.is_finite() { h.max(1.0) } else { 1.0 },
        )
    }

    pub fn locate(&self, frame: Frame, pos: Position) -> GridCell {
        let (usable_w, usable_h) = self.usable(frame);
        let fx = unit_fraction((pos.x - self.padding.left) / usable_w);
        let mut fy = unit_fraction((pos.y - self.padding.top) / usable_h);
        if self.invert_y {
            fy = 1.0 - fy;
        }
        GridCell {
            col: bucket(fx, self.cols()),
            row: bucket(fy, self.rows()),
        }
    }

    /// Row number shown for the `visual_index`-th row counted from the top.
    pub fn row_number_at(&self, visual_index: usize) -> usize {
        if self.invert_y {
            self.rows() - visual_index.min(self.rows() - 1)
        } else {
            visual_index.min(self.rows() - 1) + 1
        }
    }

    /// Vertical then horizontal grid line offsets in frame coordinates, edges included.
    pub fn lines(&self, frame: Frame) -> (Vec<f64>, Vec<f64>) {
        let (usable_w, usable_h) = self.usable(frame);
        let (cols, rows) = (self.cols(), self.rows());
        let xs = (0..=cols)
            .map(|i| self.padding.left + usable_w * i as f64 / cols as f64)
            .collect();
        let ys = (0..=rows)
            .map(|j| self.padding.top + usable_h * j as f64 / rows as f64)
            .collect();
        (xs, ys)
    }

    /// Reports settings the mapper has to degrade. Empty when everything is usable.
    pub fn validate(&self, frame: Frame) -> Vec<ConfigurationError> {
        let mut problems = Vec::new();
        if frame.is_degenerate() {
            problems.push(ConfigurationError::DegenerateFrame {
                width: frame.width,
                height: frame.height,
            });
        }
        let p = &self.padding;
        if p.left + p.right >= frame.width {
            problems.push(ConfigurationError::PaddingExceedsFrame {
                axis: "horizontal",
                padding: p.left + p.right,
                extent: frame.width,
            });
        }
        if p.top + p.bottom >= frame.height {
            problems.push(ConfigurationError::PaddingExceedsFrame {
                axis: "vertical",
                padding: p.top + p.bottom,
                extent: frame.height,
            });
        }
        if self.layout.cols == 0 {
            problems.push(ConfigurationError::EmptyGrid("column"));
        }
        if self.layout.rows == 0 {
            problems.push(ConfigurationError::EmptyGrid("row"));
        }
        problems
    }
}
