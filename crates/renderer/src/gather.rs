//! Gathering source cells into a tile buffer.
//!
//! A [`Gatherable`] grid copies the cells named by a [`SourceIndexMap`] into a
//! band-first output buffer. Pixels that are not valid in the map are left
//! untouched, so the caller decides the fill value.

use ndarray::{Array2, Array3, ArrayViewMut3};
use projection::SourceIndexMap;
use tile_common::{TileError, TileResult};

/// A 2-D source grid with one or more bands that can be indexed by cell.
pub trait Gatherable<T: Copy> {
    /// (rows, cols)
    fn grid_shape(&self) -> (usize, usize);

    fn bands(&self) -> usize;

    /// Copy every valid mapped cell into `out` of shape (bands, height, width).
    fn gather(&self, map: &SourceIndexMap, out: ArrayViewMut3<'_, T>) -> TileResult<()>;
}

pub(crate) fn check_output<T>(map: &SourceIndexMap, bands: usize, out: &ArrayViewMut3<'_, T>) -> TileResult<()> {
    let expected = (bands, map.height, map.width);
    if out.dim() != expected {
        return Err(TileError::InvalidSource(format!(
            "output buffer {:?} does not match {:?}",
            out.dim(),
            expected
        )));
    }
    Ok(())
}

impl<T: Copy> Gatherable<T> for Array2<T> {
    fn grid_shape(&self) -> (usize, usize) {
        self.dim()
    }

    fn bands(&self) -> usize {
        1
    }

    fn gather(&self, map: &SourceIndexMap, mut out: ArrayViewMut3<'_, T>) -> TileResult<()> {
        check_output(map, 1, &out)?;
        let width = map.width;
        for (idx, row, col) in map.valid_cells() {
            out[[0, idx / width, idx % width]] = self[[row, col]];
        }
        Ok(())
    }
}

/// Band-first `(bands, rows, cols)`.
impl<T: Copy> Gatherable<T> for Array3<T> {
    fn grid_shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.dim();
        (rows, cols)
    }

    fn bands(&self) -> usize {
        self.dim().0
    }

    fn gather(&self, map: &SourceIndexMap, mut out: ArrayViewMut3<'_, T>) -> TileResult<()> {
        let bands = Gatherable::<T>::bands(self);
        check_output(map, bands, &out)?;
        let width = map.width;
        for (idx, row, col) in map.valid_cells() {
            let (r, c) = (idx / width, idx % width);
            for band in 0..bands {
                out[[band, r, c]] = self[[band, row, col]];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use projection::FractionalIndices;

    fn map_2x2() -> SourceIndexMap {
        // out pixel -> source (col, row): (0,0), (2,1), outside, (1,2)
        FractionalIndices {
            width: 2,
            height: 2,
            cols: vec![0.5, 2.5, 9.0, 1.5],
            rows: vec![0.5, 1.5, 0.5, 2.5],
        }
        .floor_and_mask(3, 3)
    }

    fn source() -> Array2<f32> {
        Array2::from_shape_fn((3, 3), |(r, c)| (r * 10 + c) as f32)
    }

    #[test]
    fn test_dense_gather() {
        let mut out = Array3::<f32>::zeros((1, 2, 2));
        source().gather(&map_2x2(), out.view_mut()).unwrap();
        assert_eq!(out.as_slice().unwrap(), &[0.0, 12.0, 0.0, 21.0]);
    }

    #[test]
    fn test_band_first_gather() {
        let src = Array3::from_shape_fn((3, 3, 3), |(b, r, c)| (b * 100 + r * 10 + c) as u8);
        let mut out = Array3::<u8>::zeros((3, 2, 2));
        src.gather(&map_2x2(), out.view_mut()).unwrap();
        assert_eq!(out[[0, 0, 1]], 12);
        assert_eq!(out[[2, 1, 1]], 221);
        assert_eq!(out[[1, 1, 0]], 0);
    }

    #[test]
    fn test_wrong_output_shape() {
        let mut out = Array3::<f32>::zeros((2, 2, 2));
        assert!(source().gather(&map_2x2(), out.view_mut()).is_err());
    }
}
