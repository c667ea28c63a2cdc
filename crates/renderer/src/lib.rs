//! Tile rendering: resampling, colour mapping, producers and encoding.
//!
//! - Nearest-neighbour resampling of in-memory and Zarr grids onto XYZ tiles
//! - Colour ramps for scalar data
//! - File, array and debug tile producers
//! - PNG and BMP encoding

pub mod codec;
pub mod colormap;
pub mod gather;
pub mod layer;
pub mod png;
pub mod resample;
pub mod style;
pub mod text;
pub mod tile_image;
pub mod zarr;

pub use codec::{encode, TileFormat};
pub use colormap::{colourize, Alpha, Color, ColourRamp, ColourStyle};
pub use gather::Gatherable;
pub use tile_image::TileImage;
pub use layer::{ArrayData, ArrayLayer, FileLayer, SharedArray, TileProducer};
pub use resample::{resample, SampledGrid};
pub use style::{ColorStop, StyleConfig};
pub use text::{debug_tile, missing_layer_tile, text_tile};
pub use zarr::ZarrGrid;
