//! Raster source access for file-backed tile layers.
//!
//! Rasters are opened per request, read through a virtual reprojection onto
//! the target CRS grid and sampled into fixed-size blocks.

pub mod error;
pub mod geotiff;
pub mod handle;
pub mod interpolation;
pub mod warp;
pub mod window;

pub use error::{RasterError, Result};
pub use geotiff::{read_geotiff, GeoTiff, GeoTiffProvider};
pub use handle::{RasterBlock, RasterData, RasterHandle, RasterProvider, Resampling};
pub use warp::{warp, WarpedRaster};
pub use window::Window;
