//! Error types for tile rendering.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Primary error type for tile rendering and dispatch.
#[derive(Debug, Error)]
pub enum TileError {
    // === Request Errors ===
    #[error("Invalid tile request: {0}")]
    InvalidRequest(String),

    #[error("Layer does not exist: {0}")]
    UnknownLayer(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    // === Source Errors ===
    #[error("Affine transform is not invertible (determinant {0})")]
    DegenerateTransform(f64),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Failed to read raster: {0}")]
    RasterRead(String),

    #[error("Invalid source array: {0}")]
    InvalidSource(String),

    // === Output Errors ===
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TileError {
    /// Get the HTTP status code for this error.
    ///
    /// `UnknownLayer` never reaches a client as an error; the dispatcher
    /// answers it with a placeholder tile.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::InvalidRequest(_) | TileError::UnsupportedFormat(_) => 400,

            TileError::UnknownLayer(_) => 200,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::RasterRead(err.to_string())
    }
}
