//! Text tiles: debug tiles and the missing-layer placeholder.

use crate::tile_image::TileImage;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use once_cell::sync::Lazy;
use rusttype::{Font, Scale};
use tile_common::{TileKey, TILE_SIZE};

/// Embedded font data - DejaVu Sans Mono (a clean, readable monospace font)
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

static FONT: Lazy<Option<Font<'static>>> = Lazy::new(|| Font::try_from_bytes(FONT_DATA));

const TEXT_ORIGIN: (i32, i32) = (50, 120);
const FONT_SIZE: f32 = 12.0;

/// Text shown for a request to an unregistered layer.
pub const MISSING_LAYER_TEXT: &str = "layer does not exist";

/// `text` in white on a black 256x256 RGB tile.
pub fn text_tile(text: &str) -> TileImage {
    let mut img = RgbImage::from_pixel(TILE_SIZE as u32, TILE_SIZE as u32, Rgb([0, 0, 0]));
    match FONT.as_ref() {
        Some(font) => draw_text_mut(
            &mut img,
            Rgb([255, 255, 255]),
            TEXT_ORIGIN.0,
            TEXT_ORIGIN.1,
            Scale::uniform(FONT_SIZE),
            font,
            text,
        ),
        None => tracing::warn!("Failed to load font for text tile"),
    }
    TileImage::Rgb(img)
}

/// Tile showing its own key, e.g. `('debug', 3, 1, 2)`.
pub fn debug_tile(key: &TileKey) -> TileImage {
    text_tile(&key.to_string())
}

/// Placeholder for unknown layers.
pub fn missing_layer_tile() -> TileImage {
    text_tile(MISSING_LAYER_TEXT)
}
