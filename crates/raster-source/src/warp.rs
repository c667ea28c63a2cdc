//! Virtual reprojection of a raster onto a target CRS grid.
//!
//! Nothing is resampled up front. The warped view only fixes a target grid
//! (affine + size) and maps each requested output pixel back to the source on
//! read.

use crate::error::{RasterError, Result};
use crate::handle::{RasterBlock, RasterHandle, Resampling};
use crate::window::Window;
use projection::{mercator, project_to_source, ProjectionService, SourceGeoreference};
use tile_common::{AffineTransform, BoundingBox, CrsIdentifier, WEB_MERCATOR_EXTENT};
use tracing::debug;

/// Samples taken along each source edge when estimating the target extent.
const EDGE_SAMPLES: usize = 21;

/// A raster seen through a target CRS.
pub struct WarpedRaster<'p> {
    source: Box<dyn RasterHandle>,
    georef: SourceGeoreference,
    dst_crs: CrsIdentifier,
    dst_affine: AffineTransform,
    dst_inverse: AffineTransform,
    width: usize,
    height: usize,
    resampling: Resampling,
    projection: &'p dyn ProjectionService,
}

/// Wrap `source` in a virtual reprojection to `dst_crs`.
pub fn warp<'p>(
    source: Box<dyn RasterHandle>,
    dst_crs: &CrsIdentifier,
    resampling: Resampling,
    projection: &'p dyn ProjectionService,
) -> Result<WarpedRaster<'p>> {
    WarpedRaster::new(source, dst_crs.clone(), resampling, projection)
}

impl<'p> WarpedRaster<'p> {
    pub fn new(
        source: Box<dyn RasterHandle>,
        dst_crs: CrsIdentifier,
        resampling: Resampling,
        projection: &'p dyn ProjectionService,
    ) -> Result<Self> {
        let georef = SourceGeoreference::new(source.affine(), source.crs().clone())?;
        let (_, rows, cols) = source.shape();

        let bbox = target_bounds(&georef, rows, cols, &dst_crs, projection)?;

        // Keep roughly the source pixel count
        let res = (bbox.width() * bbox.height() / (rows * cols) as f64).sqrt();
        if !res.is_finite() || res <= 0.0 {
            return Err(RasterError::invalid_georeference(format!(
                "cannot derive target resolution from {:?}",
                bbox
            )));
        }
        let width = ((bbox.width() / res).ceil() as usize).max(1);
        let height = ((bbox.height() / res).ceil() as usize).max(1);
        let dst_affine = AffineTransform::new(res, 0.0, bbox.min_x, 0.0, -res, bbox.max_y);
        let dst_inverse = dst_affine.invert()?;

        debug!(
            src_crs = %georef.crs(),
            dst_crs = %dst_crs,
            fast_path = %georef.fast_path(),
            width,
            height,
            resolution = res,
            "Created warped view"
        );

        Ok(Self {
            source,
            georef,
            dst_crs,
            dst_affine,
            dst_inverse,
            width,
            height,
            resampling,
            projection,
        })
    }

    pub fn resampling(&self) -> Resampling {
        self.resampling
    }

    pub fn source_georeference(&self) -> &SourceGeoreference {
        &self.georef
    }

    /// Window of this view covering `bbox` (in the target CRS).
    pub fn window(&self, bbox: &BoundingBox) -> Window {
        Window::from_bounds(bbox, &self.dst_inverse)
    }

    /// Map target CRS coordinates into fractional source pixels, in place.
    fn to_source_pixels(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<()> {
        if self.dst_crs.is_spherical_mercator() {
            project_to_source(self.georef.fast_path(), &self.georef, self.projection, xs, ys)?;
        } else {
            self.projection.transform(&self.dst_crs, self.georef.crs(), xs, ys)?;
            self.georef.inverse_affine().apply_in_place(xs, ys);
        }
        Ok(())
    }
}

/// Extent of the source footprint in the target CRS.
fn target_bounds(
    georef: &SourceGeoreference,
    rows: usize,
    cols: usize,
    dst_crs: &CrsIdentifier,
    projection: &dyn ProjectionService,
) -> Result<BoundingBox> {
    let (w, h) = (cols as f64, rows as f64);
    let mut xs = Vec::with_capacity(EDGE_SAMPLES * 4);
    let mut ys = Vec::with_capacity(EDGE_SAMPLES * 4);
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / (EDGE_SAMPLES - 1) as f64;
        for (c, r) in [(t * w, 0.0), (t * w, h), (0.0, t * h), (w, t * h)] {
            let (x, y) = georef.affine().apply(c, r);
            xs.push(x);
            ys.push(y);
        }
    }
    // Poles have no Mercator image
    if georef.crs().is_wgs84_geographic() && dst_crs.is_spherical_mercator() {
        for y in ys.iter_mut() {
            *y = y.clamp(-mercator::MAX_LATITUDE, mercator::MAX_LATITUDE);
        }
    }
    projection.transform(georef.crs(), dst_crs, &mut xs, &mut ys)?;

    let mut bbox = BoundingBox::enclosing(&xs, &ys).ok_or_else(|| {
        RasterError::invalid_georeference(format!("raster footprint has no extent in {}", dst_crs))
    })?;

    if dst_crs.is_spherical_mercator() {
        let world = BoundingBox::new(
            -WEB_MERCATOR_EXTENT,
            -WEB_MERCATOR_EXTENT,
            WEB_MERCATOR_EXTENT,
            WEB_MERCATOR_EXTENT,
        );
        bbox = bbox.intersection(&world).ok_or_else(|| {
            RasterError::invalid_georeference("raster footprint outside the Mercator world")
        })?;
    }
    Ok(bbox)
}

impl RasterHandle for WarpedRaster<'_> {
    fn affine(&self) -> AffineTransform {
        self.dst_affine
    }

    fn crs(&self) -> &CrsIdentifier {
        &self.dst_crs
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.source.shape().0, self.height, self.width)
    }

    fn read(&self, window: &Window, out_shape: (usize, usize), boundless: bool, fill: f32) -> Result<RasterBlock> {
        if !boundless && !window.is_within(self.height, self.width) {
            return Err(RasterError::WindowOutOfBounds {
                window: window.to_string(),
                cols: self.width,
                rows: self.height,
            });
        }

        let (out_rows, out_cols) = out_shape;
        let n = out_rows * out_cols;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for r in 0..out_rows {
            for c in 0..out_cols {
                let (col, row) = window.sample_position(r, c, out_rows, out_cols);
                let (x, y) = self.dst_affine.apply(col, row);
                xs.push(x);
                ys.push(y);
            }
        }
        self.to_source_pixels(&mut xs, &mut ys)?;

        let bands = self.source.shape().0;
        let mut block = RasterBlock::filled(bands, out_rows, out_cols, fill);
        let mut values = vec![0.0f32; bands];
        for (idx, (&col, &row)) in xs.iter().zip(&ys).enumerate() {
            if self.source.sample(col, row, self.resampling, &mut values)? {
                let (r, c) = (idx / out_cols, idx % out_cols);
                for (band, v) in values.iter().enumerate() {
                    block.data[[band, r, c]] = *v;
                }
                block.valid[idx] = true;
            }
        }
        Ok(block)
    }

    fn sample(&self, col: f64, row: f64, resampling: Resampling, out: &mut [f32]) -> Result<bool> {
        let (x, y) = self.dst_affine.apply(col, row);
        let (mut xs, mut ys) = ([x], [y]);
        if self.to_source_pixels(&mut xs, &mut ys).is_err() {
            return Ok(false);
        }
        self.source.sample(xs[0], ys[0], resampling, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RasterData;
    use ndarray::Array3;
    use projection::Proj4Service;

    fn world_geographic() -> Box<dyn RasterHandle> {
        // 1 degree cells, value = row index
        let data = Array3::from_shape_fn((1, 180, 360), |(_, r, _)| r as f32);
        Box::new(
            RasterData::new(
                data,
                AffineTransform::from_bounds(-180.0, -90.0, 180.0, 90.0, 360, 180),
                CrsIdentifier::wgs84(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_geographic_world_warps_to_mercator_world() {
        let service = Proj4Service::new();
        let warped = warp(world_geographic(), &CrsIdentifier::web_mercator(), Resampling::Nearest, &service)
            .unwrap();
        let bbox = warped.affine().bounds(warped.shape().2, warped.shape().1);
        assert!(bbox.min_x <= -WEB_MERCATOR_EXTENT + 1.0);
        assert!(bbox.max_x >= WEB_MERCATOR_EXTENT - 1.0);
        assert!(bbox.max_y <= WEB_MERCATOR_EXTENT + bbox.height() / warped.shape().1 as f64);
    }

    #[test]
    fn test_window_read_of_northern_tile() {
        let service = Proj4Service::new();
        let warped = warp(world_geographic(), &CrsIdentifier::web_mercator(), Resampling::Nearest, &service)
            .unwrap();
        // Tile 1/0/0 is the north-west quadrant: rows 0..~85 of the source
        let bbox = BoundingBox::new(-WEB_MERCATOR_EXTENT, 0.0, 0.0, WEB_MERCATOR_EXTENT);
        let block = warped.read(&warped.window(&bbox), (256, 256), true, 0.0).unwrap();
        assert_eq!(block.valid_count(), 256 * 256);
        // Last output row sits just north of the equator: source row 89
        assert_eq!(block.data[[0, 255, 0]], 89.0);
        // First output row sits near 85°N: source row 4
        assert_eq!(block.data[[0, 0, 0]], 4.0);
    }

    #[test]
    fn test_boundless_read_outside_footprint_is_fill() {
        let service = Proj4Service::new();
        let data = Array3::from_elem((3, 10, 10), 200.0);
        let small = RasterData::new(
            data,
            AffineTransform::from_bounds(0.0, 0.0, 1000.0, 1000.0, 10, 10),
            CrsIdentifier::web_mercator(),
        )
        .unwrap();
        let warped = warp(Box::new(small), &CrsIdentifier::web_mercator(), Resampling::Bilinear, &service)
            .unwrap();

        let bbox = BoundingBox::new(-1000.0, -1000.0, 1000.0, 1000.0);
        let block = warped.read(&warped.window(&bbox), (4, 4), true, 0.0).unwrap();
        assert_eq!(block.bands(), 3);
        // Only the north-east quadrant overlaps the raster
        assert_eq!(block.valid_count(), 4);
        assert_eq!(block.data[[0, 0, 3]], 200.0);
        assert_eq!(block.data[[2, 3, 0]], 0.0);
    }
}
