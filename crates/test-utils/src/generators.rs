//! Synthetic raster generators.
//!
//! These generators create predictable, verifiable patterns so tests can
//! check which source cell ended up in which output pixel.

use ndarray::{Array2, Array3};

/// Grid where each cell holds `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.dim(), (5, 10));
/// assert_eq!(grid[[0, 1]], 1000.0);
/// assert_eq!(grid[[1, 0]], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(row, col)| (col * 1000 + row) as f32)
}

/// Alternating 0/1 blocks of `cell` x `cell` pixels.
pub fn create_checkerboard(width: usize, height: usize, cell: usize) -> Array2<f32> {
    let cell = cell.max(1);
    Array2::from_shape_fn((height, width), |(row, col)| ((row / cell + col / cell) % 2) as f32)
}

/// Band-first RGB grid: red = col, green = row, blue = constant `blue`.
///
/// Values wrap at 256.
pub fn create_rgb_grid(width: usize, height: usize, blue: u8) -> Array3<u8> {
    Array3::from_shape_fn((3, height, width), |(band, row, col)| match band {
        0 => (col % 256) as u8,
        1 => (row % 256) as u8,
        _ => blue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard() {
        let g = create_checkerboard(4, 4, 2);
        assert_eq!(g[[0, 0]], 0.0);
        assert_eq!(g[[0, 2]], 1.0);
        assert_eq!(g[[2, 2]], 0.0);
    }

    #[test]
    fn test_rgb_grid() {
        let g = create_rgb_grid(3, 2, 7);
        assert_eq!(g.dim(), (3, 2, 3));
        assert_eq!(g[[0, 1, 2]], 2);
        assert_eq!(g[[1, 1, 2]], 1);
        assert_eq!(g[[2, 0, 0]], 7);
    }
}
