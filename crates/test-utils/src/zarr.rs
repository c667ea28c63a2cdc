//! Zarr array fixtures.

use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

/// Write `data` as a float32 Zarr V3 array rooted at `path`.
pub fn write_zarr_grid(
    path: &Path,
    data: &Array2<f32>,
    chunk_rows: usize,
    chunk_cols: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);
    let (rows, cols) = data.dim();

    let array = ArrayBuilder::new(
        vec![rows as u64, cols as u64],
        DataType::Float32,
        vec![chunk_rows as u64, chunk_cols as u64].try_into()?,
        FillValue::from(f32::NAN),
    )
    .build(store, "/")?;
    array.store_metadata()?;
    store_grid(&array, data)
}

fn store_grid(array: &Array<FilesystemStore>, data: &Array2<f32>) -> Result<(), Box<dyn std::error::Error>> {
    let (rows, cols) = data.dim();
    let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![rows as u64, cols as u64])?;
    let values: Vec<f32> = data.iter().copied().collect();
    array.store_array_subset_elements(&subset, &values)?;
    Ok(())
}

/// A Zarr array written into its own temporary directory.
pub struct TempZarr {
    _dir: TempDir,
    path: PathBuf,
}

impl TempZarr {
    pub fn float(data: &Array2<f32>, chunk_rows: usize, chunk_cols: usize) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("grid.zarr");
        write_zarr_grid(&path, data, chunk_rows, chunk_cols).expect("write Zarr array");
        Self { _dir: dir, path }
    }

    /// Overwrite every cell, keeping shape and chunking.
    pub fn write(&self, data: &Array2<f32>) {
        let store = Arc::new(FilesystemStore::new(&self.path).expect("open store"));
        let array = Array::open(store, "/").expect("open Zarr array");
        store_grid(&array, data).expect("write Zarr array");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
