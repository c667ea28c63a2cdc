//! Common georeferenced grid fixtures.

use tile_common::{AffineTransform, CrsIdentifier, WEB_MERCATOR_EXTENT};

/// A raster footprint: size, CRS and geotransform.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub epsg: u32,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GridSpec {
    pub fn affine(&self) -> AffineTransform {
        AffineTransform::from_bounds(self.min_x, self.min_y, self.max_x, self.max_y, self.width, self.height)
    }

    pub fn crs(&self) -> CrsIdentifier {
        CrsIdentifier::epsg(self.epsg)
    }
}

/// Whole world at 1 degree.
pub const WORLD_GEOGRAPHIC: GridSpec = GridSpec {
    width: 360,
    height: 180,
    epsg: 4326,
    min_x: -180.0,
    min_y: -90.0,
    max_x: 180.0,
    max_y: 90.0,
};

/// Whole Mercator square, one zoom-0 tile.
pub const WORLD_MERCATOR: GridSpec = GridSpec {
    width: 256,
    height: 256,
    epsg: 3857,
    min_x: -WEB_MERCATOR_EXTENT,
    min_y: -WEB_MERCATOR_EXTENT,
    max_x: WEB_MERCATOR_EXTENT,
    max_y: WEB_MERCATOR_EXTENT,
};

/// 100 km square in UTM zone 33N at 100 m cells.
pub const UTM33_SQUARE: GridSpec = GridSpec {
    width: 1000,
    height: 1000,
    epsg: 32633,
    min_x: 450_000.0,
    min_y: -50_000.0,
    max_x: 550_000.0,
    max_y: 50_000.0,
};

/// Small European box in geographic coordinates.
pub const EUROPE_GEOGRAPHIC: GridSpec = GridSpec {
    width: 60,
    height: 37,
    epsg: 4326,
    min_x: -15.0,
    min_y: 35.0,
    max_x: 45.0,
    max_y: 72.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_geographic_affine() {
        let aff = WORLD_GEOGRAPHIC.affine();
        assert_eq!(aff.apply(0.0, 0.0), (-180.0, 90.0));
        assert_eq!(aff.apply(360.0, 180.0), (180.0, -90.0));
    }

    #[test]
    fn test_utm_square_pixel_size() {
        let aff = UTM33_SQUARE.affine();
        assert_eq!(aff.a, 100.0);
        assert_eq!(aff.e, -100.0);
        assert_eq!(UTM33_SQUARE.crs().epsg_code(), Some(32633));
    }
}
