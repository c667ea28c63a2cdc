//! Minimal GeoTIFF writer for tests.
//!
//! Writes strip-organised, uncompressed images with tiepoint, pixel scale and
//! a GeoKey directory carrying the EPSG code.

use ndarray::Array3;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiff::encoder::colortype::{Gray32Float, RGB8, RGBA8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::TiffResult;
use tile_common::AffineTransform;

use crate::fixtures::GridSpec;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const GDAL_NODATA: u16 = 42113;

/// Write a single-band float GeoTIFF.
///
/// `rows_per_strip` overrides the encoder's default strip height.
pub fn write_float_geotiff(
    path: &Path,
    data: &ndarray::Array2<f32>,
    affine: &AffineTransform,
    epsg: u16,
    nodata: Option<f32>,
    rows_per_strip: Option<u32>,
) -> TiffResult<()> {
    let (rows, cols) = data.dim();
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    if let Some(n) = rows_per_strip {
        image.rows_per_strip(n)?;
    }
    write_geo_tags(image.encoder(), affine, epsg)?;
    if let Some(nd) = nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), nd.to_string().as_str())?;
    }
    let samples: Vec<f32> = data.iter().copied().collect();
    image.write_data(&samples)
}

/// Write a band-first `(3 | 4, rows, cols)` byte raster as RGB or RGBA.
pub fn write_rgb_geotiff(path: &Path, data: &Array3<u8>, affine: &AffineTransform, epsg: u16) -> TiffResult<()> {
    let (bands, rows, cols) = data.dim();
    // Chunky layout: (rows, cols, bands)
    let interleaved: Vec<u8> = data.view().permuted_axes([1, 2, 0]).iter().copied().collect();
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    if bands == 4 {
        let mut image = encoder.new_image::<RGBA8>(cols as u32, rows as u32)?;
        write_geo_tags(image.encoder(), affine, epsg)?;
        image.write_data(&interleaved)
    } else {
        let mut image = encoder.new_image::<RGB8>(cols as u32, rows as u32)?;
        write_geo_tags(image.encoder(), affine, epsg)?;
        image.write_data(&interleaved)
    }
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    affine: &AffineTransform,
    epsg: u16,
) -> TiffResult<()> {
    dir.write_tag(Tag::ModelPixelScaleTag, &[affine.a, -affine.e, 0.0][..])?;
    dir.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, affine.c, affine.f, 0.0][..])?;

    let geographic = epsg == 4326 || (4000..5000).contains(&epsg);
    let (model, cs_key) = if geographic {
        (2, GEOGRAPHIC_TYPE)
    } else {
        (1, PROJECTED_CS_TYPE)
    };
    let keys: [u16; 16] = [
        1, 1, 0, 3, //
        GT_MODEL_TYPE, 0, 1, model, //
        GT_RASTER_TYPE, 0, 1, 1, //
        cs_key, 0, 1, epsg,
    ];
    dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..])
}

/// A GeoTIFF written into its own temporary directory.
///
/// The file lives as long as the fixture.
pub struct TempGeoTiff {
    _dir: TempDir,
    path: PathBuf,
}

impl TempGeoTiff {
    /// Single-band float raster covering `spec`.
    pub fn float(spec: &GridSpec, data: &ndarray::Array2<f32>, nodata: Option<f32>) -> Self {
        Self::write_float(spec, data, nodata, None)
    }

    /// Single-band float raster split into strips of `rows_per_strip` rows.
    pub fn float_striped(spec: &GridSpec, data: &ndarray::Array2<f32>, rows_per_strip: u32) -> Self {
        Self::write_float(spec, data, None, Some(rows_per_strip))
    }

    fn write_float(spec: &GridSpec, data: &ndarray::Array2<f32>, nodata: Option<f32>, rows_per_strip: Option<u32>) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("raster.tif");
        write_float_geotiff(&path, data, &spec.affine(), spec.epsg as u16, nodata, rows_per_strip)
            .expect("write GeoTIFF");
        Self { _dir: dir, path }
    }

    /// Byte RGB(A) raster covering `spec`.
    pub fn rgb(spec: &GridSpec, data: &Array3<u8>) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("raster.tif");
        write_rgb_geotiff(&path, data, &spec.affine(), spec.epsg as u16).expect("write GeoTIFF");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
