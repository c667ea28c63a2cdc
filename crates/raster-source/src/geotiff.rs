//! GeoTIFF access.
//!
//! Opening a file reads only its tags: the model transformation or tiepoint +
//! pixel scale, the EPSG code from the GeoKey directory and the GDAL nodata
//! tag. Pixels are decoded one strip or tile at a time, the first time a read
//! touches it, and kept until the handle is dropped.
//! http://geotiff.maptools.org/spec/geotiff2.4.html

use crate::error::{RasterError, Result};
use crate::handle::{read_nearest, RasterBlock, RasterData, RasterHandle, RasterProvider, Resampling};
use crate::interpolation::{self, Cells};
use crate::window::Window;
use ndarray::Array3;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tile_common::{AffineTransform, CrsIdentifier};
use tracing::debug;

/// ModelTransformationTag
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
/// GDAL_NODATA, an ASCII number
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_RASTER_TYPE: u64 = 1025;
const KEY_GEOGRAPHIC_TYPE: u64 = 2048;
const KEY_PROJECTED_CS_TYPE: u64 = 3072;
const RASTER_PIXEL_IS_POINT: u64 = 2;
const USER_DEFINED: u64 = 32767;

/// Opens GeoTIFF files from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoTiffProvider;

impl GeoTiffProvider {
    pub fn new() -> Self {
        Self
    }
}

impl RasterProvider for GeoTiffProvider {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterHandle>> {
        Ok(Box::new(GeoTiff::open(path)?))
    }
}

/// Decode a whole GeoTIFF file into memory.
pub fn read_geotiff(path: &Path) -> Result<RasterData> {
    GeoTiff::open(path)?.into_raster_data()
}

/// Strip or tile grid of the first image.
#[derive(Debug, Clone, Copy)]
struct ChunkLayout {
    bands: usize,
    rows: usize,
    cols: usize,
    chunk_rows: usize,
    chunk_cols: usize,
}

impl ChunkLayout {
    fn across(&self) -> usize {
        self.cols.div_ceil(self.chunk_cols)
    }

    fn count(&self) -> usize {
        self.rows.div_ceil(self.chunk_rows) * self.across()
    }

    /// Chunk holding pixel (row, col); strips are one chunk wide.
    fn index(&self, row: usize, col: usize) -> u32 {
        ((row / self.chunk_rows) * self.across() + col / self.chunk_cols) as u32
    }
}

/// The decoder and every chunk it has produced so far.
struct ChunkCache<R: Read + Seek> {
    decoder: Decoder<R>,
    /// Chunky (rows, cols, bands) per chunk index.
    chunks: HashMap<u32, Array3<f32>>,
}

impl<R: Read + Seek> ChunkCache<R> {
    fn load(&mut self, layout: &ChunkLayout, index: u32) -> Result<()> {
        if self.chunks.contains_key(&index) {
            return Ok(());
        }
        let samples = to_f32(self.decoder.read_chunk(index)?)?;
        let (width, _) = self.decoder.chunk_data_dimensions(index);
        let per_row = width as usize * layout.bands;
        if per_row == 0 || samples.len() % per_row != 0 {
            return Err(RasterError::decode_failed(format!(
                "chunk {} holds {} samples, not a multiple of {}",
                index,
                samples.len(),
                per_row
            )));
        }
        let chunk = Array3::from_shape_vec((samples.len() / per_row, width as usize, layout.bands), samples)
            .map_err(|e| RasterError::decode_failed(e.to_string()))?;
        self.chunks.insert(index, chunk);
        Ok(())
    }
}

/// Decoded chunks seen as one raster. Cells of chunks not loaded read as NaN.
struct LoadedCells<'a> {
    layout: &'a ChunkLayout,
    chunks: &'a HashMap<u32, Array3<f32>>,
}

impl Cells for LoadedCells<'_> {
    fn dim(&self) -> (usize, usize, usize) {
        (self.layout.bands, self.layout.rows, self.layout.cols)
    }

    fn cell(&self, band: usize, row: usize, col: usize) -> f32 {
        let l = self.layout;
        self.chunks
            .get(&l.index(row, col))
            .and_then(|chunk| chunk.get([row % l.chunk_rows, col % l.chunk_cols, band]))
            .copied()
            .unwrap_or(f32::NAN)
    }
}

/// First cell and last cell a sample at `v` reads along one axis.
fn footprint(v: f64, n: usize, resampling: Resampling) -> (usize, usize) {
    match resampling {
        Resampling::Nearest => (v.floor() as usize, v.floor() as usize),
        Resampling::Bilinear => {
            let first = (v - 0.5).max(0.0).floor() as usize;
            (first, (first + 1).min(n - 1))
        }
    }
}

/// An open GeoTIFF, decoded lazily by strip or tile.
pub struct GeoTiff<R: Read + Seek = BufReader<File>> {
    affine: AffineTransform,
    crs: CrsIdentifier,
    nodata: Option<f32>,
    layout: ChunkLayout,
    cache: Mutex<ChunkCache<R>>,
}

impl GeoTiff {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| RasterError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        let raster = Self::new(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            shape = ?raster.shape(),
            chunks = raster.layout.count(),
            crs = %raster.crs(),
            "Opened GeoTIFF"
        );
        Ok(raster)
    }
}

impl<R: Read + Seek> GeoTiff<R> {
    /// Read the tags of the first image of any seekable reader.
    pub fn new(reader: R) -> Result<Self> {
        let mut decoder = Decoder::new(reader)?;

        let planar = decoder
            .find_tag(Tag::PlanarConfiguration)?
            .map(|v| v.into_u16())
            .transpose()?;
        if planar == Some(2) {
            return Err(RasterError::Unsupported("planar (band-separate) layout".into()));
        }

        let (width, height) = decoder.dimensions()?;
        let bands = decoder
            .find_tag(Tag::SamplesPerPixel)?
            .map(|v| v.into_u16())
            .transpose()?
            .unwrap_or(1) as usize;
        let (chunk_cols, chunk_rows) = decoder.chunk_dimensions();
        let layout = ChunkLayout {
            bands,
            rows: height as usize,
            cols: width as usize,
            chunk_rows: chunk_rows as usize,
            chunk_cols: chunk_cols as usize,
        };
        if layout.bands == 0 || layout.rows == 0 || layout.cols == 0 || layout.chunk_rows == 0 || layout.chunk_cols == 0 {
            return Err(RasterError::Unsupported(format!(
                "empty raster {}x{}x{}",
                layout.bands, layout.rows, layout.cols
            )));
        }

        let geokeys = decoder
            .find_tag(Tag::GeoKeyDirectoryTag)?
            .map(|v| v.into_u64_vec())
            .transpose()?
            .ok_or_else(|| RasterError::invalid_georeference("missing GeoKeyDirectoryTag"))?;
        let keys = GeoKeys::parse(&geokeys)?;

        let affine = read_affine(&mut decoder, &keys)?;
        affine.ensure_invertible()?;
        let crs = keys.crs()?;

        let nodata = decoder
            .find_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))?
            .map(|v| v.into_string())
            .transpose()?
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f32>().ok());

        Ok(Self {
            affine,
            crs,
            nodata,
            layout,
            cache: Mutex::new(ChunkCache {
                decoder,
                chunks: HashMap::new(),
            }),
        })
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Strips or tiles in the image.
    pub fn chunk_count(&self) -> usize {
        self.layout.count()
    }

    /// Strips or tiles decoded so far.
    pub fn decoded_chunks(&self) -> usize {
        self.lock().map(|cache| cache.chunks.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChunkCache<R>>> {
        self.cache
            .lock()
            .map_err(|_| RasterError::decode_failed("chunk cache lock poisoned"))
    }

    /// Decode every chunk into a band-first in-memory raster.
    pub fn into_raster_data(self) -> Result<RasterData> {
        let layout = self.layout;
        let mut cache = self
            .cache
            .into_inner()
            .map_err(|_| RasterError::decode_failed("chunk cache lock poisoned"))?;
        for index in 0..layout.count() {
            cache.load(&layout, index as u32)?;
        }

        let cells = LoadedCells {
            layout: &layout,
            chunks: &cache.chunks,
        };
        let data = Array3::from_shape_fn((layout.bands, layout.rows, layout.cols), |(b, r, c)| cells.cell(b, r, c));
        Ok(RasterData::new(data, self.affine, self.crs)?.with_nodata(self.nodata))
    }
}

impl<R: Read + Seek + Send> RasterHandle for GeoTiff<R> {
    fn affine(&self) -> AffineTransform {
        self.affine
    }

    fn crs(&self) -> &CrsIdentifier {
        &self.crs
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.layout.bands, self.layout.rows, self.layout.cols)
    }

    fn read(&self, window: &Window, out_shape: (usize, usize), boundless: bool, fill: f32) -> Result<RasterBlock> {
        read_nearest(self, window, out_shape, boundless, fill)
    }

    fn sample(&self, col: f64, row: f64, resampling: Resampling, out: &mut [f32]) -> Result<bool> {
        let layout = &self.layout;
        if !(col >= 0.0 && col < layout.cols as f64 && row >= 0.0 && row < layout.rows as f64) {
            return Ok(false);
        }

        let (r0, r1) = footprint(row, layout.rows, resampling);
        let (c0, c1) = footprint(col, layout.cols, resampling);
        let mut cache = self.lock()?;
        for r in [r0, r1] {
            for c in [c0, c1] {
                cache.load(layout, layout.index(r, c))?;
            }
        }

        let cells = LoadedCells {
            layout,
            chunks: &cache.chunks,
        };
        Ok(match resampling {
            Resampling::Nearest => interpolation::nearest(&cells, col, row, self.nodata, out),
            Resampling::Bilinear => interpolation::bilinear(&cells, col, row, self.nodata, out),
        })
    }
}

fn read_affine<R: Read + Seek>(decoder: &mut Decoder<R>, keys: &GeoKeys) -> Result<AffineTransform> {
    let transformation = decoder
        .find_tag(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION))?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    let affine = if let Some(m) = transformation {
        if m.len() < 8 {
            return Err(RasterError::invalid_georeference("short ModelTransformationTag"));
        }
        AffineTransform::new(m[0], m[1], m[3], m[4], m[5], m[7])
    } else {
        let tiepoint = decoder
            .find_tag(Tag::ModelTiepointTag)?
            .map(|v| v.into_f64_vec())
            .transpose()?
            .ok_or_else(|| RasterError::invalid_georeference("missing ModelTiepointTag"))?;
        let scale = decoder
            .find_tag(Tag::ModelPixelScaleTag)?
            .map(|v| v.into_f64_vec())
            .transpose()?
            .ok_or_else(|| RasterError::invalid_georeference("missing ModelPixelScaleTag"))?;
        if tiepoint.len() < 6 || scale.len() < 2 {
            return Err(RasterError::invalid_georeference("short tiepoint or pixel scale"));
        }

        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);
        AffineTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy)
    };

    // PixelIsPoint tiepoints refer to pixel centres
    if keys.get(KEY_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
        let (cx, cy) = affine.apply(-0.5, -0.5);
        return Ok(AffineTransform { c: cx, f: cy, ..affine });
    }
    Ok(affine)
}

fn to_f32(result: DecodingResult) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return Err(RasterError::Unsupported("sample format".into())),
    })
}

/// Short-valued entries of a GeoKey directory.
#[derive(Debug, Default)]
struct GeoKeys {
    entries: Vec<(u64, u64)>,
}

impl GeoKeys {
    fn parse(directory: &[u64]) -> Result<Self> {
        if directory.len() < 4 || directory.len() % 4 != 0 {
            return Err(RasterError::invalid_georeference("GeoKeyDirectoryTag has an invalid length"));
        }
        let entries = directory[4..]
            .chunks(4)
            // location 0 means the value is stored inline
            .filter(|key| key[1] == 0)
            .map(|key| (key[0], key[3]))
            .collect();
        Ok(Self { entries })
    }

    fn get(&self, id: u64) -> Option<u64> {
        self.entries.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
    }

    fn crs(&self) -> Result<CrsIdentifier> {
        let code = self
            .get(KEY_PROJECTED_CS_TYPE)
            .or_else(|| self.get(KEY_GEOGRAPHIC_TYPE))
            .ok_or_else(|| RasterError::invalid_georeference("no EPSG code in GeoKey directory"))?;
        if code == USER_DEFINED {
            return Err(RasterError::Unsupported("user-defined coordinate system".into()));
        }
        Ok(CrsIdentifier::epsg(code as u32))
    }
}
