use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum MapError {
    /// The operation referenced a pin id that is not in the registry.
    #[error("no pin with id {0}")]
    NotFound(u32),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A rejected import file or rendering-surface event.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("record {index} has unknown category {value:?}")]
    UnknownCategory { index: usize, value: String },
    #[error("pin id {0} appears more than once")]
    DuplicateId(u32),
    #[error("pin id must be at least 1 (record {0})")]
    ZeroId(usize),
    #[error("surface event carries neither a click nor an object list")]
    EmptyEvent,
}

/// A configuration the grid mapper can only honour in degenerate form.
///
/// These are never fatal: the mapper clamps and keeps going.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{axis} padding {padding} consumes the whole frame extent {extent}")]
    PaddingExceedsFrame {
        axis: &'static str,
        padding: f64,
        extent: f64,
    },
    #[error("grid needs at least one {0}")]
    EmptyGrid(&'static str),
    #[error("frame {width}x{height} has no area")]
    DegenerateFrame { width: f64, height: f64 },
}
