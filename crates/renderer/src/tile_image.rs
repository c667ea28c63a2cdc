//! Rendered tile images.

use image::{RgbImage, RgbaImage};
use ndarray::ArrayView3;
use tile_common::{TileError, TileResult};

/// A rendered tile, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum TileImage {
    /// Three-band pass-through and text tiles.
    Rgb(RgbImage),
    /// Colour-mapped scalar tiles and four-band pass-through.
    Rgba(RgbaImage),
}

impl TileImage {
    /// Interleave a band-first byte array.
    ///
    /// Three bands give RGB; four or more give RGBA from the first four.
    pub fn from_bands(data: ArrayView3<'_, u8>) -> TileResult<Self> {
        let (bands, rows, cols) = data.dim();
        let (w, h) = (cols as u32, rows as u32);
        match bands {
            3 => Ok(TileImage::Rgb(RgbImage::from_fn(w, h, |x, y| {
                let (r, c) = (y as usize, x as usize);
                image::Rgb([data[[0, r, c]], data[[1, r, c]], data[[2, r, c]]])
            }))),
            n if n >= 4 => Ok(TileImage::Rgba(RgbaImage::from_fn(w, h, |x, y| {
                let (r, c) = (y as usize, x as usize);
                image::Rgba([data[[0, r, c]], data[[1, r, c]], data[[2, r, c]], data[[3, r, c]]])
            }))),
            n => Err(TileError::InvalidSource(format!(
                "RGB output needs 3 bands, source has {}",
                n
            ))),
        }
    }

    /// Same as [`TileImage::from_bands`] for float samples, clamped to `0..=255`.
    pub fn from_float_bands(data: ArrayView3<'_, f32>) -> TileResult<Self> {
        let bytes = data.mapv(|v| if v.is_nan() { 0 } else { v.clamp(0.0, 255.0) as u8 });
        Self::from_bands(bytes.view())
    }

    pub fn width(&self) -> u32 {
        match self {
            TileImage::Rgb(img) => img.width(),
            TileImage::Rgba(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            TileImage::Rgb(img) => img.height(),
            TileImage::Rgba(img) => img.height(),
        }
    }

    /// Bytes per pixel.
    pub fn channels(&self) -> usize {
        match self {
            TileImage::Rgb(_) => 3,
            TileImage::Rgba(_) => 4,
        }
    }

    /// Interleaved pixel bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TileImage::Rgb(img) => img.as_raw(),
            TileImage::Rgba(img) => img.as_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_from_bands_interleaves() {
        let data = Array3::from_shape_fn((3, 2, 2), |(b, r, c)| (b * 100 + r * 10 + c) as u8);
        let img = TileImage::from_bands(data.view()).unwrap();
        assert_eq!(img.channels(), 3);
        assert_eq!(&img.as_bytes()[..6], &[0, 100, 200, 1, 101, 201]);
        let TileImage::Rgb(rgb) = img else { panic!("expected RGB") };
        assert_eq!(rgb.get_pixel(0, 1).0, [10, 110, 210]);
    }

    #[test]
    fn test_float_bands_clamp() {
        let data = Array3::from_shape_vec((3, 1, 1), vec![-5.0, 300.0, f32::NAN]).unwrap();
        let img = TileImage::from_float_bands(data.view()).unwrap();
        assert_eq!(img.as_bytes(), &[0, 255, 0]);
    }

    #[test]
    fn test_four_bands_keep_alpha() {
        let data = Array3::from_shape_fn((4, 1, 2), |(b, _, c)| if b == 3 { (c * 255) as u8 } else { 9 });
        let img = TileImage::from_bands(data.view()).unwrap();
        let TileImage::Rgba(rgba) = img else { panic!("expected RGBA") };
        assert_eq!(rgba.get_pixel(0, 0).0, [9, 9, 9, 0]);
        assert_eq!(rgba.get_pixel(1, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn test_too_few_bands() {
        let data = Array3::<u8>::zeros((2, 4, 4));
        assert!(TileImage::from_bands(data.view()).is_err());
    }
}
