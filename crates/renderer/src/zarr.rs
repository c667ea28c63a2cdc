//! Scalar grids stored as Zarr arrays.
//!
//! Nothing is held in memory between renders. Each gather fetches only the
//! chunks the tile touches, once per chunk, so writers can update the store
//! between tiles.

use crate::gather::{check_output, Gatherable};
use ndarray::ArrayViewMut3;
use projection::SourceIndexMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tile_common::{TileError, TileResult};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;

/// A 2-D `float32` Zarr array, indexed `[row, col]`.
#[derive(Clone)]
pub struct ZarrGrid {
    array: Arc<Array<dyn ReadableStorageTraits>>,
    rows: usize,
    cols: usize,
    chunk_rows: usize,
    chunk_cols: usize,
}

impl ZarrGrid {
    /// Open the array at `path` inside `storage`.
    pub fn open(storage: Arc<dyn ReadableStorageTraits>, path: &str) -> TileResult<Self> {
        let array = Array::open(storage, path)
            .map_err(|e| TileError::InvalidSource(format!("zarr array {}: {}", path, e)))?;

        if !matches!(array.data_type(), DataType::Float32) {
            return Err(TileError::InvalidSource(format!(
                "zarr array {} is {:?}, expected float32",
                path,
                array.data_type()
            )));
        }
        let shape = array.shape().to_vec();
        if shape.len() != 2 || shape.contains(&0) {
            return Err(TileError::InvalidSource(format!(
                "zarr array {} has shape {:?}, expected a non-empty 2-D grid",
                path, shape
            )));
        }

        let chunk_shape = array
            .chunk_grid()
            .chunk_shape(&[0, 0], array.shape())
            .map_err(|e| TileError::InvalidSource(e.to_string()))?
            .ok_or_else(|| TileError::InvalidSource("missing chunk shape".into()))?;

        Ok(Self {
            rows: shape[0] as usize,
            cols: shape[1] as usize,
            chunk_rows: chunk_shape[0].get() as usize,
            chunk_cols: chunk_shape[1].get() as usize,
            array: Arc::new(array),
        })
    }

    /// Open a Zarr array stored in a local directory.
    pub fn open_dir(dir: impl AsRef<Path>) -> TileResult<Self> {
        let dir = dir.as_ref();
        let store = FilesystemStore::new(dir)
            .map_err(|e| TileError::InvalidSource(format!("{}: {}", dir.display(), e)))?;
        Self::open(Arc::new(store), "/")
    }

    /// (rows, cols) of one regular chunk.
    pub fn chunk_shape(&self) -> (usize, usize) {
        (self.chunk_rows, self.chunk_cols)
    }

    fn chunks_across(&self) -> usize {
        self.cols.div_ceil(self.chunk_cols)
    }

    /// Cells of chunk `index`, cut at the grid edge: (start row, start col, rows, cols).
    fn chunk_bounds(&self, index: usize) -> (usize, usize, usize, usize) {
        let across = self.chunks_across();
        let row0 = (index / across) * self.chunk_rows;
        let col0 = (index % across) * self.chunk_cols;
        (
            row0,
            col0,
            self.chunk_rows.min(self.rows - row0),
            self.chunk_cols.min(self.cols - col0),
        )
    }

    fn read_chunk(&self, index: usize) -> TileResult<(usize, usize, usize, Vec<f32>)> {
        let (row0, col0, rows, cols) = self.chunk_bounds(index);
        let subset = ArraySubset::new_with_start_shape(
            vec![row0 as u64, col0 as u64],
            vec![rows as u64, cols as u64],
        )
        .map_err(|e| TileError::InvalidSource(e.to_string()))?;
        let values = self
            .array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|e| TileError::RasterRead(format!("zarr chunk {}: {}", index, e)))?;
        Ok((row0, col0, cols, values))
    }
}

impl fmt::Debug for ZarrGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZarrGrid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("chunk_rows", &self.chunk_rows)
            .field("chunk_cols", &self.chunk_cols)
            .finish()
    }
}

impl Gatherable<f32> for ZarrGrid {
    fn grid_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn bands(&self) -> usize {
        1
    }

    /// Reads each touched chunk once, in chunk order.
    fn gather(&self, map: &SourceIndexMap, mut out: ArrayViewMut3<'_, f32>) -> TileResult<()> {
        check_output(map, 1, &out)?;
        let width = map.width;
        let across = self.chunks_across();

        let mut requests: Vec<(usize, usize, usize, usize)> = map
            .valid_cells()
            .map(|(idx, row, col)| {
                let chunk = (row / self.chunk_rows) * across + col / self.chunk_cols;
                (chunk, idx, row, col)
            })
            .collect();
        requests.sort_unstable_by_key(|r| r.0);

        for group in requests.chunk_by(|a, b| a.0 == b.0) {
            let (row0, col0, chunk_cols, values) = self.read_chunk(group[0].0)?;
            for &(_, idx, row, col) in group {
                out[[0, idx / width, idx % width]] = values[(row - row0) * chunk_cols + (col - col0)];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use projection::FractionalIndices;
    use test_utils::TempZarr;

    #[test]
    fn test_zarr_matches_dense() {
        let dense = Array2::from_shape_fn((7, 5), |(r, c)| (r * 10 + c) as f32);
        let store = TempZarr::float(&dense, 3, 2);
        let grid = ZarrGrid::open_dir(store.path()).unwrap();
        assert_eq!(grid.grid_shape(), (7, 5));
        assert_eq!(grid.chunk_shape(), (3, 2));

        let map = FractionalIndices {
            width: 3,
            height: 2,
            cols: vec![0.0, 4.9, 2.2, 1.0, 3.0, 5.0],
            rows: vec![6.5, 0.0, 3.1, 2.9, 6.0, 0.0],
        }
        .floor_and_mask(7, 5);

        let mut a = Array3::<f32>::zeros((1, 2, 3));
        let mut b = Array3::<f32>::zeros((1, 2, 3));
        dense.gather(&map, a.view_mut()).unwrap();
        grid.gather(&map, b.view_mut()).unwrap();
        assert_eq!(a, b);
        // Edge chunk (rows 6.., cols 4..) is one cell wide
        assert_eq!(b[[0, 0, 1]], 4.0);
        assert_eq!(b[[0, 0, 0]], 60.0);
        assert_eq!(b[[0, 1, 2]], 0.0);
    }

    #[test]
    fn test_chunk_bounds_cut_at_edge() {
        let store = TempZarr::float(&Array2::zeros((7, 5)), 3, 2);
        let grid = ZarrGrid::open_dir(store.path()).unwrap();
        assert_eq!(grid.chunk_bounds(0), (0, 0, 3, 2));
        assert_eq!(grid.chunk_bounds(2), (0, 4, 3, 1));
        assert_eq!(grid.chunk_bounds(8), (6, 4, 1, 1));
    }

    #[test]
    fn test_store_updates_are_visible() {
        let store = TempZarr::float(&Array2::from_elem((4, 4), 1.0), 2, 2);
        let grid = ZarrGrid::open_dir(store.path()).unwrap();
        let map = FractionalIndices {
            width: 1,
            height: 1,
            cols: vec![3.5],
            rows: vec![0.5],
        }
        .floor_and_mask(4, 4);

        let mut out = Array3::<f32>::zeros((1, 1, 1));
        grid.gather(&map, out.view_mut()).unwrap();
        assert_eq!(out[[0, 0, 0]], 1.0);

        store.write(&Array2::from_elem((4, 4), 9.0));
        grid.gather(&map, out.view_mut()).unwrap();
        assert_eq!(out[[0, 0, 0]], 9.0);
    }

    #[test]
    fn test_missing_store() {
        assert!(ZarrGrid::open_dir("/nonexistent/grid.zarr").is_err());
    }
}
