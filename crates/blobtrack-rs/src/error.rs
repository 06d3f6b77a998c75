use thiserror::Error;

/// Errors that can occur while tracking blobs or matching signatures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown track: {0}")]
    UnknownTrack(usize),

    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transportation solver did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Detector(#[from] anyhow::Error),
}

/// Result type for blobtrack operations
pub type Result<T> = std::result::Result<T, Error>;
