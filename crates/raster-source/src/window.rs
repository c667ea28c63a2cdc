//! Pixel windows into a raster.

use serde::{Deserialize, Serialize};
use std::fmt;
use tile_common::{AffineTransform, BoundingBox};

/// A rectangular region of a raster in (possibly fractional) pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub col_off: f64,
    pub row_off: f64,
    pub width: f64,
    pub height: f64,
}

impl Window {
    pub fn new(col_off: f64, row_off: f64, width: f64, height: f64) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// The whole of a `rows` x `cols` raster.
    pub fn full(rows: usize, cols: usize) -> Self {
        Self::new(0.0, 0.0, cols as f64, rows as f64)
    }

    /// Window covering `bbox` for a raster with the given inverse affine
    /// (coordinates to pixels).
    ///
    /// The window may extend beyond the raster; reads decide what to do with
    /// the overhang.
    pub fn from_bounds(bbox: &BoundingBox, inverse_affine: &AffineTransform) -> Self {
        let corners = [
            inverse_affine.apply(bbox.min_x, bbox.max_y),
            inverse_affine.apply(bbox.max_x, bbox.max_y),
            inverse_affine.apply(bbox.min_x, bbox.min_y),
            inverse_affine.apply(bbox.max_x, bbox.min_y),
        ];
        let cols: Vec<f64> = corners.iter().map(|c| c.0).collect();
        let rows: Vec<f64> = corners.iter().map(|c| c.1).collect();

        match BoundingBox::enclosing(&cols, &rows) {
            Some(b) => Self::new(b.min_x, b.min_y, b.width(), b.height()),
            None => Self::new(f64::NAN, f64::NAN, 0.0, 0.0),
        }
    }

    /// Raster pixel position of the centre of output cell (`out_row`, `out_col`)
    /// when this window is read into `out_rows` x `out_cols` cells.
    #[inline]
    pub fn sample_position(&self, out_row: usize, out_col: usize, out_rows: usize, out_cols: usize) -> (f64, f64) {
        let col = self.col_off + (out_col as f64 + 0.5) * self.width / out_cols as f64;
        let row = self.row_off + (out_row as f64 + 0.5) * self.height / out_rows as f64;
        (col, row)
    }

    /// True if the window lies entirely inside a `rows` x `cols` raster.
    pub fn is_within(&self, rows: usize, cols: usize) -> bool {
        self.col_off >= 0.0
            && self.row_off >= 0.0
            && self.col_off + self.width <= cols as f64
            && self.row_off + self.height <= rows as f64
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(col_off={}, row_off={}, width={}, height={})",
            self.col_off, self.row_off, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds() {
        // 1 unit pixels, origin (0, 100)
        let affine = AffineTransform::new(1.0, 0.0, 0.0, 0.0, -1.0, 100.0);
        let inverse = affine.invert().unwrap();
        let window = Window::from_bounds(&BoundingBox::new(10.0, 50.0, 30.0, 90.0), &inverse);
        assert_eq!(window, Window::new(10.0, 10.0, 20.0, 40.0));
        assert!(window.is_within(100, 100));
        assert!(!window.is_within(40, 100));
    }

    #[test]
    fn test_sample_position() {
        let window = Window::new(10.0, 20.0, 4.0, 8.0);
        assert_eq!(window.sample_position(0, 0, 2, 2), (11.0, 22.0));
        assert_eq!(window.sample_position(1, 1, 2, 2), (13.0, 26.0));
    }
}
