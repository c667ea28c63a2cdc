//! PNG encoding for tile images.
//!
//! Supports three color types:
//! - **Truecolor (color type 2)** for RGB tiles.
//! - **Truecolor with alpha (color type 6)** for RGBA tiles.
//! - **Indexed (color type 3)**: chosen at compression level 9 when the image
//!   has ≤256 unique colors. Smaller files for flat, colour-mapped tiles.

use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use tile_common::{TileError, TileResult};

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Highest zlib level; also switches on palette optimisation.
pub const MAX_LEVEL: u32 = 9;

type Palette = Vec<(u8, u8, u8, u8)>;

/// Encode interleaved RGB (`channels == 3`) or RGBA (`channels == 4`) pixels.
///
/// `level` is the zlib level, clamped to 0..=9. Level 9 also tries an
/// indexed encoding first.
pub fn encode_png(pixels: &[u8], width: usize, height: usize, channels: usize, level: u32) -> TileResult<Vec<u8>> {
    if !(channels == 3 || channels == 4) {
        return Err(TileError::Encode(format!("PNG cannot encode {} channels", channels)));
    }
    if pixels.len() != width * height * channels {
        return Err(TileError::Encode(format!(
            "{} bytes do not fill a {}x{}x{} image",
            pixels.len(),
            width,
            height,
            channels
        )));
    }
    let level = level.min(MAX_LEVEL);

    if level == MAX_LEVEL {
        let num_pixels = width * height;
        // Try to extract a palette (use parallel version for larger images)
        let palette_result = if num_pixels >= PARALLEL_THRESHOLD {
            extract_palette_parallel(pixels, channels)
        } else {
            extract_palette_sequential(pixels, channels)
        };
        if let Some((palette, indices)) = palette_result {
            return create_png_indexed(width, height, &palette, &indices, level);
        }
    }

    create_png_truecolor(pixels, width, height, channels, level)
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(px: &[u8]) -> u32 {
    let a = if px.len() == 4 { px[3] } else { 255 };
    (px[0] as u32) | ((px[1] as u32) << 8) | ((px[2] as u32) << 16) | ((a as u32) << 24)
}

/// Unpack u32 back to RGBA tuple
#[inline(always)]
fn unpack_color(packed: u32) -> (u8, u8, u8, u8) {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

/// Sequential palette extraction for small images.
fn extract_palette_sequential(pixels: &[u8], channels: usize) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / channels);

    for px in pixels.chunks_exact(channels) {
        let packed = pack_color(px);

        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push(unpack_color(packed));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for larger images.
///
/// Collects unique colours per chunk in parallel, merges them into one
/// palette, then maps pixels to indices in parallel.
fn extract_palette_parallel(pixels: &[u8], channels: usize) -> Option<(Palette, Vec<u8>)> {
    let num_pixels = pixels.len() / channels;
    let pixels_per_chunk = (num_pixels / rayon::current_num_threads()).max(256);

    let unique_colors: Vec<u32> = pixels
        .par_chunks(pixels_per_chunk * channels)
        .flat_map(|chunk| {
            let mut local_colors: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(channels) {
                local_colors.insert(pack_color(px), ());
                // Early exit if we definitely have too many colors
                if local_colors.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            local_colors.into_keys().collect::<Vec<_>>()
        })
        .collect();

    let mut global_colors: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in unique_colors {
        if !global_colors.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            global_colors.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let indices: Vec<u8> = pixels
        .par_chunks_exact(channels)
        .map(|px| global_colors.get(&pack_color(px)).copied().unwrap_or(0))
        .collect();

    Some((palette, indices))
}

/// Create an indexed PNG (color type 3) from palette and indices.
fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
    level: u32,
) -> TileResult<Vec<u8>> {
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    // PLTE chunk (palette)
    let mut plte_data = Vec::with_capacity(palette.len() * 3);
    for (r, g, b, _) in palette {
        plte_data.extend_from_slice(&[*r, *g, *b]);
    }
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS chunk (transparency) - only if any color has alpha < 255
    if palette.iter().any(|(_, _, _, a)| *a < 255) {
        let trns_data: Vec<u8> = palette.iter().map(|(_, _, _, a)| *a).collect();
        write_chunk(&mut png, b"tRNS", &trns_data);
    }

    let idat_data = deflate_scanlines(indices, width, height, level)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a truecolor PNG (color type 2 or 6).
fn create_png_truecolor(pixels: &[u8], width: usize, height: usize, channels: usize, level: u32) -> TileResult<Vec<u8>> {
    let color_type = if channels == 4 { 6 } else { 2 };

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, color_type));

    let idat_data = deflate_scanlines(pixels, width * channels, height, level)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color_type);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    ihdr_data
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate rows of `row_bytes` for the IDAT chunk.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize, level: u32) -> TileResult<Vec<u8>> {
    // Add filter byte (0 = no filter) to each scanline
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes.max(1)).take(height) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
    encoder
        .write_all(&uncompressed)
        .and_then(|_| encoder.finish())
        .map_err(|e| TileError::Encode(format!("IDAT compression failed: {}", e)))
}
