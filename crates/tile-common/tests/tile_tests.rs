//! Tests for tile addressing and the affine transforms built from it.

use tile_common::tile::{TileCoord, TileKey, TILE_SIZE, WEB_MERCATOR_EXTENT};
use tile_common::AffineTransform;

// ============================================================================
// Tile bounds
// ============================================================================

#[test]
fn test_bounds_inside_mercator_extent() {
    for z in 0..=6u32 {
        let n = 1u32 << z;
        for x in 0..n {
            for y in 0..n {
                let b = TileCoord::new(z, x, y).xy_bounds();
                assert!(b.min_x >= -WEB_MERCATOR_EXTENT && b.max_x <= WEB_MERCATOR_EXTENT);
                assert!(b.min_y >= -WEB_MERCATOR_EXTENT && b.max_y <= WEB_MERCATOR_EXTENT);
                assert!(b.min_x < b.max_x);
                assert!(b.min_y < b.max_y);
            }
        }
    }
}

#[test]
fn test_adjacent_tiles_share_edges_exactly() {
    for z in [1u32, 5, 12, 22, 30] {
        let n = 1u32 << z;
        for x in [0, n / 3, n / 2, n - 2] {
            let left = TileCoord::new(z, x, 0).xy_bounds();
            let right = TileCoord::new(z, x + 1, 0).xy_bounds();
            assert_eq!(left.max_x, right.min_x, "z={} x={}", z, x);

            let upper = TileCoord::new(z, 0, x).xy_bounds();
            let lower = TileCoord::new(z, 0, x + 1).xy_bounds();
            assert_eq!(upper.min_y, lower.max_y, "z={} y={}", z, x);
        }
    }
}

#[test]
fn test_last_tile_reaches_extent() {
    let z = 17;
    let n = 1u32 << z;
    let b = TileCoord::new(z, n - 1, n - 1).xy_bounds();
    assert_eq!(b.max_x, WEB_MERCATOR_EXTENT);
    assert_eq!(b.min_y, -WEB_MERCATOR_EXTENT);
}

#[test]
fn test_key_validation_delegates_to_coord() {
    assert!(TileKey::new("a", 2, 3, 3).validate().is_ok());
    assert!(TileKey::new("a", 2, 4, 3).validate().is_err());
}

// ============================================================================
// Pixel-centre round trip
// ============================================================================

#[test]
fn test_from_bounds_inverse_maps_pixel_centres_to_themselves() {
    for coord in [
        TileCoord::new(0, 0, 0),
        TileCoord::new(4, 3, 9),
        TileCoord::new(15, 17000, 11000),
    ] {
        let aff = AffineTransform::from_bbox(&coord.xy_bounds(), TILE_SIZE, TILE_SIZE);
        let inv = aff.invert().unwrap();
        for &(col, row) in &[(0.5, 0.5), (127.5, 64.5), (255.5, 255.5)] {
            let (x, y) = aff.apply(col, row);
            let (c2, r2) = inv.apply(x, y);
            assert!((c2 - col).abs() < 1e-6, "{:?} col {} -> {}", coord, col, c2);
            assert!((r2 - row).abs() < 1e-6, "{:?} row {} -> {}", coord, row, r2);
        }
    }
}
