//! Common types shared across the livemaptiles crates.

pub mod affine;
pub mod bbox;
pub mod crs;
pub mod error;
pub mod tile;

pub use affine::AffineTransform;
pub use bbox::BoundingBox;
pub use crs::CrsIdentifier;
pub use error::{TileError, TileResult};
pub use tile::{TileCoord, TileKey, MAX_ZOOM, TILE_SIZE, WEB_MERCATOR_EXTENT};
