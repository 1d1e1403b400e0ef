use thiserror::Error;

use crate::math::dimensions::Dimensions;

/// Every failure the engine can report.
///
/// Variants are grouped the way callers need to react to them:
/// configuration problems (`Configuration`, `ShapeMismatch`) are fixed by
/// changing the topology or the command line, data problems (`Data`,
/// `EmptyDataset`, `Image`) by changing the input files, persistence problems
/// by fixing the model files, and `Precondition` is a programming error.
#[derive(Debug, Error)]
pub enum CnnError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("shape mismatch in {layer}: expected {expected}, got {actual}")]
    ShapeMismatch {
        layer: String,
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("data error: {0}")]
    Data(String),

    #[error("no data in {0} dataset")]
    EmptyDataset(&'static str),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, CnnError>;
