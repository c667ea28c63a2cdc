//! Affine geotransforms.
//!
//! Maps pixel coordinates (col, row) to projected coordinates (x, y):
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! GDAL stores the same six numbers as `[c, a, b, f, d, e]`.

use crate::{BoundingBox, TileError, TileResult};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Relative tolerance under which a determinant counts as zero.
const SINGULAR_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// Transform covering `bounds` with a `width` x `height` pixel grid,
    /// north-up, origin at the top-left corner.
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64, width: usize, height: usize) -> Self {
        Self {
            a: (east - west) / width as f64,
            b: 0.0,
            c: west,
            d: 0.0,
            e: (south - north) / height as f64,
            f: north,
        }
    }

    pub fn from_bbox(bbox: &BoundingBox, width: usize, height: usize) -> Self {
        Self::from_bounds(bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y, width, height)
    }

    /// Create from a GDAL-style geotransform array [c, a, b, f, d, e].
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            a: gt[1],
            b: gt[2],
            c: gt[0],
            d: gt[4],
            e: gt[5],
            f: gt[3],
        }
    }

    /// Convert to GDAL-style geotransform array [c, a, b, f, d, e].
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Apply the forward transform: (col, row) -> (x, y).
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Apply the transform in place to parallel coordinate slices.
    pub fn apply_in_place(&self, xs: &mut [f64], ys: &mut [f64]) {
        for (x, y) in xs.iter_mut().zip(ys.iter_mut()) {
            let (tx, ty) = self.apply(*x, *y);
            *x = tx;
            *y = ty;
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Fails with `DegenerateTransform` when the linear part is singular.
    pub fn ensure_invertible(&self) -> TileResult<()> {
        let det = self.determinant();
        let scale = (self.a.abs() + self.b.abs()) * (self.d.abs() + self.e.abs());
        if !det.is_finite() || det == 0.0 || det.abs() <= scale * SINGULAR_TOLERANCE {
            return Err(TileError::DegenerateTransform(det));
        }
        if ![self.c, self.f].iter().all(|v| v.is_finite()) {
            return Err(TileError::DegenerateTransform(det));
        }
        Ok(())
    }

    /// Compute the inverse transform, mapping (x, y) back to (col, row).
    pub fn invert(&self) -> TileResult<AffineTransform> {
        self.ensure_invertible()?;
        let inv = self
            .to_matrix()
            .try_inverse()
            .ok_or(TileError::DegenerateTransform(self.determinant()))?;
        Ok(Self::from_matrix(&inv))
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        Self::from_matrix(&(self.to_matrix() * other.to_matrix()))
    }

    /// Size of one pixel along x and y, in target units.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            (self.a * self.a + self.d * self.d).sqrt(),
            (self.b * self.b + self.e * self.e).sqrt(),
        )
    }

    /// Bounding box covered by a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        let xs: Vec<f64> = corners.iter().map(|c| c.0).collect();
        let ys: Vec<f64> = corners.iter().map(|c| c.1).collect();
        BoundingBox::enclosing(&xs, &ys)
            .unwrap_or_else(|| BoundingBox::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN))
    }

    fn to_matrix(self) -> Matrix3<f64> {
        Matrix3::new(self.a, self.b, self.c, self.d, self.e, self.f, 0.0, 0.0, 1.0)
    }

    fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self {
            a: m[(0, 0)],
            b: m[(0, 1)],
            c: m[(0, 2)],
            d: m[(1, 0)],
            e: m[(1, 1)],
            f: m[(1, 2)],
        }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn test_apply_with_offset_and_scale() {
        // 10m resolution, top-left at (500000, 6000000), north-up
        let aff = AffineTransform::new(10.0, 0.0, 500000.0, 0.0, -10.0, 6000000.0);
        assert_eq!(aff.apply(0.0, 0.0), (500000.0, 6000000.0));
        assert_eq!(aff.apply(100.0, 100.0), (501000.0, 5999000.0));
    }

    #[test]
    fn test_from_bounds() {
        let aff = AffineTransform::from_bounds(-180.0, -90.0, 180.0, 90.0, 360, 180);
        assert_eq!(aff, AffineTransform::new(1.0, 0.0, -180.0, 0.0, -1.0, 90.0));
    }

    #[test]
    fn test_invert_roundtrip() {
        let aff = AffineTransform::new(10.0, 0.5, 500000.0, -0.25, -10.0, 6000000.0);
        let inv = aff.invert().unwrap();
        let (x, y) = aff.apply(37.5, 12.25);
        let (col, row) = inv.apply(x, y);
        assert!(close(col, 37.5, 1e-9));
        assert!(close(row, 12.25, 1e-9));
    }

    #[test]
    fn test_tiny_pixels_are_invertible() {
        let aff = AffineTransform::new(1e-9, 0.0, 10.0, 0.0, -1e-9, 50.0);
        assert!(aff.invert().is_ok());
    }

    #[test]
    fn test_singular_transform() {
        let zero = AffineTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(zero.invert(), Err(TileError::DegenerateTransform(_))));

        let collinear = AffineTransform::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0);
        assert!(collinear.invert().is_err());

        let nan = AffineTransform::new(f64::NAN, 0.0, 0.0, 0.0, 1.0, 0.0);
        assert!(nan.invert().is_err());
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let aff = AffineTransform::from_bounds(100.0, 200.0, 300.0, 400.0, 50, 80);
        let id = aff.invert().unwrap().compose(&aff);
        let (x, y) = id.apply(3.0, 7.0);
        assert!(close(x, 3.0, 1e-9));
        assert!(close(y, 7.0, 1e-9));
    }

    #[test]
    fn test_gdal_roundtrip() {
        let gt = [500000.0, 10.0, 0.0, 6000000.0, 0.0, -10.0];
        assert_eq!(AffineTransform::from_gdal(&gt).to_gdal(), gt);
    }
}
