//! Nearest-neighbour tile resampling of in-memory grids.

use crate::gather::Gatherable;
use ndarray::{Array2, Array3};
use num_traits::Zero;
use projection::{map_tile_to_source, ProjectionService, SourceGeoreference};
use tile_common::{TileCoord, TileResult, TILE_SIZE};
use tracing::debug;

/// A tile's worth of gathered source values.
#[derive(Debug, Clone)]
pub struct SampledGrid<T> {
    /// (bands, rows, cols); zero where `mask` is false.
    pub data: Array3<T>,
    /// Row-major, true where the pixel maps inside the source.
    pub mask: Vec<bool>,
}

impl<T: Copy> SampledGrid<T> {
    pub fn bands(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|v| **v).count()
    }

    /// One band as a 2-D grid.
    pub fn band(&self, band: usize) -> Option<Array2<T>> {
        (band < self.bands()).then(|| self.data.index_axis(ndarray::Axis(0), band).to_owned())
    }
}

/// Sample `source` for one tile.
///
/// Every output pixel takes the value of the source cell containing its
/// centre; pixels outside the source stay zero and are masked out.
pub fn resample<T, G>(
    coord: &TileCoord,
    georef: &SourceGeoreference,
    source: &G,
    projection: &dyn ProjectionService,
) -> TileResult<SampledGrid<T>>
where
    T: Copy + Zero,
    G: Gatherable<T> + ?Sized,
{
    let (rows, cols) = source.grid_shape();
    debug!(
        z = coord.z,
        x = coord.x,
        y = coord.y,
        fast_path = %georef.fast_path(),
        rows,
        cols,
        "Resampling tile"
    );

    let map = map_tile_to_source(coord, georef, rows, cols, projection)?;
    let mut data = Array3::<T>::zeros((source.bands(), TILE_SIZE, TILE_SIZE));
    source.gather(&map, data.view_mut())?;

    Ok(SampledGrid { data, mask: map.mask() })
}
