//! Raster handle abstraction and the decoded in-memory raster.

use crate::error::{RasterError, Result};
use crate::interpolation;
use crate::window::Window;
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tile_common::{AffineTransform, CrsIdentifier};

/// Resampling used when reading through a warped view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    #[default]
    Nearest,
    Bilinear,
}

impl FromStr for Resampling {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            other => Err(RasterError::Unsupported(format!("resampling '{}'", other))),
        }
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resampling::Nearest => write!(f, "nearest"),
            Resampling::Bilinear => write!(f, "bilinear"),
        }
    }
}

/// Pixels read from a raster, band-first, with per-pixel validity.
#[derive(Debug, Clone)]
pub struct RasterBlock {
    /// Shape (bands, rows, cols).
    pub data: Array3<f32>,
    /// Row-major, one flag per (row, col).
    pub valid: Vec<bool>,
}

impl RasterBlock {
    /// Block of `bands` x `rows` x `cols` filled with `fill`, all invalid.
    pub fn filled(bands: usize, rows: usize, cols: usize, fill: f32) -> Self {
        Self {
            data: Array3::from_elem((bands, rows, cols), fill),
            valid: vec![false; rows * cols],
        }
    }

    pub fn bands(&self) -> usize {
        self.data.dim().0
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }
}

/// An open raster.
pub trait RasterHandle: Send + Sync {
    /// Pixel to CRS coordinates.
    fn affine(&self) -> AffineTransform;

    fn crs(&self) -> &CrsIdentifier;

    /// (bands, rows, cols)
    fn shape(&self) -> (usize, usize, usize);

    /// Read `window` resampled into `out_shape` (rows, cols).
    ///
    /// With `boundless`, pixels outside the raster are set to `fill` and marked
    /// invalid; otherwise a window reaching outside is an error.
    fn read(&self, window: &Window, out_shape: (usize, usize), boundless: bool, fill: f32) -> Result<RasterBlock>;

    /// Sample every band at a pixel-space position into `out`.
    ///
    /// Returns false when the position has no data. Errors come from reading
    /// the underlying file.
    fn sample(&self, col: f64, row: f64, resampling: Resampling, out: &mut [f32]) -> Result<bool>;
}

/// Window read of a raster in its own pixel grid, nearest neighbour.
pub(crate) fn read_nearest<H: RasterHandle + ?Sized>(
    raster: &H,
    window: &Window,
    out_shape: (usize, usize),
    boundless: bool,
    fill: f32,
) -> Result<RasterBlock> {
    let (bands, rows, cols) = raster.shape();
    if !boundless && !window.is_within(rows, cols) {
        return Err(RasterError::WindowOutOfBounds {
            window: window.to_string(),
            cols,
            rows,
        });
    }

    let (out_rows, out_cols) = out_shape;
    let mut block = RasterBlock::filled(bands, out_rows, out_cols, fill);
    let mut values = vec![0.0f32; bands];

    for r in 0..out_rows {
        for c in 0..out_cols {
            let (col, row) = window.sample_position(r, c, out_rows, out_cols);
            if raster.sample(col, row, Resampling::Nearest, &mut values)? {
                for (band, v) in values.iter().enumerate() {
                    block.data[[band, r, c]] = *v;
                }
                block.valid[r * out_cols + c] = true;
            }
        }
    }
    Ok(block)
}

/// Opens rasters by path.
pub trait RasterProvider: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterHandle>>;
}

/// A fully decoded raster held in memory.
#[derive(Debug, Clone)]
pub struct RasterData {
    data: Array3<f32>,
    affine: AffineTransform,
    crs: CrsIdentifier,
    nodata: Option<f32>,
}

impl RasterData {
    /// `data` is (bands, rows, cols).
    pub fn new(data: Array3<f32>, affine: AffineTransform, crs: CrsIdentifier) -> Result<Self> {
        affine.ensure_invertible()?;
        let (bands, rows, cols) = data.dim();
        if bands == 0 || rows == 0 || cols == 0 {
            return Err(RasterError::Unsupported(format!(
                "empty raster {}x{}x{}",
                bands, rows, cols
            )));
        }
        Ok(Self {
            data,
            affine,
            crs,
            nodata: None,
        })
    }

    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }
}

impl RasterHandle for RasterData {
    fn affine(&self) -> AffineTransform {
        self.affine
    }

    fn crs(&self) -> &CrsIdentifier {
        &self.crs
    }

    fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    fn read(&self, window: &Window, out_shape: (usize, usize), boundless: bool, fill: f32) -> Result<RasterBlock> {
        read_nearest(self, window, out_shape, boundless, fill)
    }

    fn sample(&self, col: f64, row: f64, resampling: Resampling, out: &mut [f32]) -> Result<bool> {
        let view = self.data.view();
        Ok(match resampling {
            Resampling::Nearest => interpolation::nearest(&view, col, row, self.nodata, out),
            Resampling::Bilinear => interpolation::bilinear(&view, col, row, self.nodata, out),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster() -> RasterData {
        let data = Array3::from_shape_fn((2, 4, 4), |(b, r, c)| (b * 100 + r * 4 + c) as f32);
        RasterData::new(
            data,
            AffineTransform::from_bounds(0.0, 0.0, 4.0, 4.0, 4, 4),
            CrsIdentifier::web_mercator(),
        )
        .unwrap()
    }

    #[test]
    fn test_read_full_window() {
        let r = raster();
        let block = r.read(&Window::full(4, 4), (4, 4), false, 0.0).unwrap();
        assert_eq!(block.valid_count(), 16);
        assert_eq!(block.data[[0, 2, 3]], 11.0);
        assert_eq!(block.data[[1, 0, 0]], 100.0);
    }

    #[test]
    fn test_boundless_fill() {
        let r = raster();
        let block = r.read(&Window::new(-2.0, -2.0, 4.0, 4.0), (4, 4), true, -1.0).unwrap();
        assert_eq!(block.valid_count(), 4);
        assert_eq!(block.data[[0, 0, 0]], -1.0);
        assert_eq!(block.data[[0, 2, 2]], 0.0);
        assert!(!block.valid[0]);
        assert!(block.valid[2 * 4 + 2]);
    }

    #[test]
    fn test_bounded_read_rejects_overhang() {
        let r = raster();
        let result = r.read(&Window::new(2.0, 2.0, 4.0, 4.0), (2, 2), false, 0.0);
        assert!(matches!(result, Err(RasterError::WindowOutOfBounds { .. })));
    }

    #[test]
    fn test_resampling_parse() {
        assert_eq!("Nearest".parse::<Resampling>().unwrap(), Resampling::Nearest);
        assert_eq!("bilinear".parse::<Resampling>().unwrap(), Resampling::Bilinear);
        assert!("cubic".parse::<Resampling>().is_err());
    }
}
