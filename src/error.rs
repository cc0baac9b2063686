//! Error types for fitsdata operations

use thiserror::Error;

/// Main error type for raster, column and transfer operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Storage protocol violation: {0}")]
    StorageProtocol(String),
}

/// Specialized Result type for fitsdata operations
pub type Result<T> = std::result::Result<T, FitsError>;
