//! Point sampling of band-first rasters.
//!
//! Positions are in raster pixel units with pixel `(c, r)` covering
//! `[c, c+1) x [r, r+1)`. Every sampler writes one value per band into `out`
//! and returns false when the position has no data.

use ndarray::ArrayView3;

/// Random access to the cells of a band-first raster.
pub trait Cells {
    /// (bands, rows, cols)
    fn dim(&self) -> (usize, usize, usize);

    fn cell(&self, band: usize, row: usize, col: usize) -> f32;
}

impl Cells for ArrayView3<'_, f32> {
    fn dim(&self) -> (usize, usize, usize) {
        ArrayView3::dim(self)
    }

    #[inline]
    fn cell(&self, band: usize, row: usize, col: usize) -> f32 {
        self[[band, row, col]]
    }
}

#[inline]
fn is_nodata(value: f32, nodata: Option<f32>) -> bool {
    value.is_nan() || nodata.map_or(false, |nd| value == nd)
}

/// Nearest neighbour: the cell containing the position.
pub fn nearest<C: Cells + ?Sized>(data: &C, col: f64, row: f64, nodata: Option<f32>, out: &mut [f32]) -> bool {
    let (_, rows, cols) = data.dim();
    let (c, r) = (col.floor(), row.floor());
    if !(c >= 0.0 && c < cols as f64 && r >= 0.0 && r < rows as f64) {
        return false;
    }
    let (c, r) = (c as usize, r as usize);

    let mut valid = true;
    for (band, slot) in out.iter_mut().enumerate() {
        let value = data.cell(band, r, c);
        if is_nodata(value, nodata) {
            valid = false;
        }
        *slot = value;
    }
    valid
}

/// Bilinear interpolation between the four surrounding cell centres.
///
/// Falls back to nearest neighbour when any corner has no data.
pub fn bilinear<C: Cells + ?Sized>(data: &C, col: f64, row: f64, nodata: Option<f32>, out: &mut [f32]) -> bool {
    let (_, rows, cols) = data.dim();
    if !(col >= 0.0 && col < cols as f64 && row >= 0.0 && row < rows as f64) {
        return false;
    }

    // Shift to cell-centre space and clamp at the raster edge
    let x = (col - 0.5).clamp(0.0, (cols - 1) as f64);
    let y = (row - 0.5).clamp(0.0, (rows - 1) as f64);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(cols - 1);
    let y1 = (y0 + 1).min(rows - 1);
    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    for (band, slot) in out.iter_mut().enumerate() {
        let v00 = data.cell(band, y0, x0);
        let v10 = data.cell(band, y0, x1);
        let v01 = data.cell(band, y1, x0);
        let v11 = data.cell(band, y1, x1);

        if [v00, v10, v01, v11].iter().any(|&v| is_nodata(v, nodata)) {
            return nearest(data, col, row, nodata, out);
        }

        let top = v00 * (1.0 - xf) + v10 * xf;
        let bottom = v01 * (1.0 - xf) + v11 * xf;
        *slot = top * (1.0 - yf) + bottom * yf;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn grid() -> Array3<f32> {
        // one band, 2x2: [[0, 10], [20, 30]]
        Array3::from_shape_vec((1, 2, 2), vec![0.0, 10.0, 20.0, 30.0]).unwrap()
    }

    #[test]
    fn test_nearest() {
        let g = grid();
        let mut out = [0.0];
        assert!(nearest(&g.view(), 1.2, 0.9, None, &mut out));
        assert_eq!(out[0], 10.0);
        assert!(!nearest(&g.view(), 2.0, 0.0, None, &mut out));
        assert!(!nearest(&g.view(), -0.1, 0.0, None, &mut out));
    }

    #[test]
    fn test_bilinear_centre() {
        let g = grid();
        let mut out = [0.0];
        assert!(bilinear(&g.view(), 1.0, 1.0, None, &mut out));
        assert!((out[0] - 15.0).abs() < 1e-6);
        // At a cell centre the value is exact
        assert!(bilinear(&g.view(), 0.5, 0.5, None, &mut out));
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_nodata() {
        let g = grid();
        let mut out = [0.0];
        assert!(!nearest(&g.view(), 0.5, 0.5, Some(0.0), &mut out));
        // Bilinear touching the nodata corner falls back to nearest
        assert!(bilinear(&g.view(), 1.2, 1.2, Some(0.0), &mut out));
        assert_eq!(out[0], 30.0);
    }
}
