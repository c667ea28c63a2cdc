//! Error types for raster access.

use thiserror::Error;
use tile_common::TileError;

/// Errors that can occur while opening or reading a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Failed to open the raster file.
    #[error("failed to open raster: {0}")]
    OpenFailed(String),

    /// The file could not be decoded.
    #[error("failed to decode raster: {0}")]
    DecodeFailed(String),

    /// The raster carries no usable georeferencing.
    #[error("invalid georeferencing: {0}")]
    InvalidGeoreference(String),

    /// Sample layout or type not handled.
    #[error("unsupported raster layout: {0}")]
    Unsupported(String),

    /// A bounded read asked for pixels outside the raster.
    #[error("window {window} is outside raster of {cols}x{rows}")]
    WindowOutOfBounds {
        window: String,
        cols: usize,
        rows: usize,
    },

    /// Coordinate handling failed.
    #[error("projection error: {0}")]
    Projection(String),
}

impl RasterError {
    /// Create a DecodeFailed error.
    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::DecodeFailed(msg.into())
    }

    /// Create an InvalidGeoreference error.
    pub fn invalid_georeference(msg: impl Into<String>) -> Self {
        Self::InvalidGeoreference(msg.into())
    }
}

impl From<std::io::Error> for RasterError {
    fn from(err: std::io::Error) -> Self {
        Self::OpenFailed(err.to_string())
    }
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        Self::DecodeFailed(err.to_string())
    }
}

impl From<TileError> for RasterError {
    fn from(err: TileError) -> Self {
        match err {
            TileError::DegenerateTransform(det) => {
                Self::InvalidGeoreference(format!("affine transform is not invertible (determinant {})", det))
            }
            other => Self::Projection(other.to_string()),
        }
    }
}

impl From<RasterError> for TileError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::Projection(msg) => TileError::Projection(msg),
            other => TileError::RasterRead(other.to_string()),
        }
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
