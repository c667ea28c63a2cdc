//! XYZ ("slippy map") tile addressing in spherical Mercator.
//!
//! Tiles use the top-left origin convention: `y = 0` is the northernmost row.

use crate::{BoundingBox, TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half the width of the EPSG:3857 world square, in metres.
pub const WEB_MERCATOR_EXTENT: f64 = 20037508.342789244;

/// Edge length of every tile, in pixels.
pub const TILE_SIZE: usize = 256;

/// Highest zoom level accepted.
pub const MAX_ZOOM: u32 = 30;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), counted from the top
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along each axis at this zoom.
    pub fn matrix_size(&self) -> u64 {
        1u64 << self.z.min(63)
    }

    /// Check `z <= MAX_ZOOM` and `x, y < 2^z`.
    pub fn validate(&self) -> TileResult<()> {
        if self.z > MAX_ZOOM {
            return Err(TileError::InvalidRequest(format!(
                "zoom {} exceeds maximum {}",
                self.z, MAX_ZOOM
            )));
        }
        let n = self.matrix_size();
        if u64::from(self.x) >= n || u64::from(self.y) >= n {
            return Err(TileError::InvalidRequest(format!(
                "tile {}/{}/{} outside the {}x{} matrix",
                self.z, self.x, self.y, n, n
            )));
        }
        Ok(())
    }

    /// Span of one tile in metres.
    pub fn span(&self) -> f64 {
        2.0 * WEB_MERCATOR_EXTENT / self.matrix_size() as f64
    }

    /// Bounds of this tile in EPSG:3857 metres.
    ///
    /// Every edge is computed from the world origin, so neighbouring tiles
    /// share edges bit-for-bit.
    pub fn xy_bounds(&self) -> BoundingBox {
        let span = self.span();
        let edge_x = |i: u32| -WEB_MERCATOR_EXTENT + f64::from(i) * span;
        let edge_y = |i: u32| WEB_MERCATOR_EXTENT - f64::from(i) * span;
        BoundingBox::new(
            edge_x(self.x),
            edge_y(self.y + 1),
            edge_x(self.x + 1),
            edge_y(self.y),
        )
    }
}

/// Identifies one rendered tile of one layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub layer: String,
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(layer: impl Into<String>, z: u32, x: u32, y: u32) -> Self {
        Self {
            layer: layer.into(),
            z,
            x,
            y,
        }
    }

    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.z, self.x, self.y)
    }

    pub fn validate(&self) -> TileResult<()> {
        self.coord().validate()
    }

    pub fn xy_bounds(&self) -> BoundingBox {
        self.coord().xy_bounds()
    }
}

impl fmt::Display for TileKey {
    /// Renders as the tuple `('layer', z, x, y)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', {}, {}, {})", self.layer, self.z, self.x, self.y)
    }
}
