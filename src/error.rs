use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Classifier deserialization error: {0}")]
    Deserialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid classifier: {0}")]
    InvalidClassifier(String),

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer length mismatch: expected {expected} bytes (RGBA), got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("At least one integral table must be requested")]
    NoTablesRequested,

    #[error("Integral table `{0}` was not computed")]
    MissingTable(&'static str),

    #[error("Invalid disjoint set size: {0}")]
    InvalidSetSize(i64),

    #[error("Scan cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
