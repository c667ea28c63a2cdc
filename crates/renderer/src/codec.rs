//! Tile image encoding.

use crate::tile_image::TileImage;
use crate::png;
use image::codecs::bmp::BmpEncoder;
use image::ColorType;
use std::fmt;
use std::str::FromStr;
use tile_common::{TileError, TileResult};

/// Output file format of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Png,
    Bmp,
}

impl TileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Bmp => "bmp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Bmp => "image/bmp",
        }
    }
}

impl FromStr for TileFormat {
    type Err = TileError;

    fn from_str(s: &str) -> TileResult<Self> {
        match s {
            "png" => Ok(TileFormat::Png),
            "bmp" => Ok(TileFormat::Bmp),
            other => Err(TileError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode `image` as `format`.
///
/// `level` is the PNG compression level (0..=9, 9 also optimises the
/// encoding). BMP ignores it.
pub fn encode(image: &TileImage, format: TileFormat, level: u32) -> TileResult<Vec<u8>> {
    let (width, height) = (image.width(), image.height());
    match format {
        TileFormat::Png => png::encode_png(
            image.as_bytes(),
            width as usize,
            height as usize,
            image.channels(),
            level,
        ),
        TileFormat::Bmp => {
            let color = match image {
                TileImage::Rgb(_) => ColorType::Rgb8,
                TileImage::Rgba(_) => ColorType::Rgba8,
            };
            let mut out = Vec::new();
            BmpEncoder::new(&mut out)
                .encode(image.as_bytes(), width, height, color)
                .map_err(|e| TileError::Encode(e.to_string()))?;
            Ok(out)
        }
    }
}
