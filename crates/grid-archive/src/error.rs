//! Error types for archive assembly.

use thiserror::Error;

use crate::types::GridShape;

/// Errors that can occur while assembling a raster time-series archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The grid's affine transform cannot be expressed as lon/lat axes.
    #[error("unsupported geotransform: {0}")]
    UnsupportedTransform(String),

    /// A grid's dimensions disagree with the established schema.
    #[error("grid shape {actual} does not match archive shape {expected}")]
    ShapeMismatch { expected: GridShape, actual: GridShape },

    /// A matched identifier's date token is not a valid calendar date.
    #[error("invalid date in '{identifier}': {reason}")]
    DateParse { identifier: String, reason: String },

    /// A computed day offset does not exceed the previously accepted one.
    #[error("time step of '{identifier}' ({current} days) does not follow previous step ({previous} days)")]
    NonMonotonicTime {
        identifier: String,
        previous: f64,
        current: f64,
    },

    /// A quantized sample does not fit the storage integer type.
    #[error("quantized value {value} at row {row}, col {col} is not representable: {reason}")]
    RangeOverflow {
        value: f64,
        row: usize,
        col: usize,
        reason: &'static str,
    },

    /// Underlying store write or flush failure.
    #[error("failed to write archive: {0}")]
    StoreWrite(String),

    /// Failure surfaced by the raster reader.
    #[error("failed to read raster '{path}': {reason}")]
    RasterRead { path: String, reason: String },

    /// Invalid archive configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No source identifier matched the date pattern.
    #[error("no input matched the date pattern")]
    NoInputs,
}

impl ArchiveError {
    /// Create an UnsupportedTransform error.
    pub fn unsupported_transform(msg: impl Into<String>) -> Self {
        Self::UnsupportedTransform(msg.into())
    }

    /// Create a StoreWrite error.
    pub fn store_write(msg: impl Into<String>) -> Self {
        Self::StoreWrite(msg.into())
    }

    /// Create a RasterRead error.
    pub fn raster_read(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RasterRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        Self::StoreWrite(err.to_string())
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
