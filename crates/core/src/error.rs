//! Error types for hydromon

use thiserror::Error;

/// Main error type for hydromon operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Nominal extent contains no pixels")]
    EmptyNominalExtent,

    #[error("Frame timestamp {next} precedes previous frame at {previous}")]
    UnorderedTimestamps { previous: String, next: String },

    #[error("Missing {kind} layer: {name}")]
    MissingLayer { kind: &'static str, name: String },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shape mismatch between an expected `(rows, cols)` and an actual one
    pub fn size_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Error::SizeMismatch {
            er: expected.0,
            ec: expected.1,
            ar: actual.0,
            ac: actual.1,
        }
    }
}

/// Result type alias for hydromon operations
pub type Result<T> = std::result::Result<T, Error>;
