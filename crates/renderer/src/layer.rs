//! Tile producers.
//!
//! A producer turns a [`TileKey`] into a [`TileImage`]. File layers reopen
//! their raster on every call; array layers read caller-owned memory or a
//! Zarr store that can change between calls; the debug layer draws the key
//! itself.

use crate::colormap::ColourStyle;
use crate::tile_image::TileImage;
use crate::resample::{resample, SampledGrid};
use crate::text::debug_tile;
use crate::zarr::ZarrGrid;
use ndarray::{Array2, Array3};
use projection::{Proj4Service, ProjectionService, SourceGeoreference};
use raster_source::{warp, GeoTiffProvider, RasterHandle, RasterProvider, Resampling};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tile_common::{AffineTransform, CrsIdentifier, TileError, TileKey, TileResult, TILE_SIZE};
use tracing::debug;

fn read_lock<T>(lock: &RwLock<T>) -> TileResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| TileError::Internal("layer lock poisoned".into()))
}

fn write_lock<T>(lock: &RwLock<T>) -> TileResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| TileError::Internal("layer lock poisoned".into()))
}

/// Something that can render tiles for a layer.
pub enum TileProducer {
    File(FileLayer),
    Array(ArrayLayer),
    Debug,
}

impl TileProducer {
    pub fn kind(&self) -> &'static str {
        match self {
            TileProducer::File(_) => "file",
            TileProducer::Array(_) => "array",
            TileProducer::Debug => "debug",
        }
    }

    /// Render `key` with the default projection service.
    pub fn produce(&self, key: &TileKey) -> TileResult<TileImage> {
        self.produce_with(key, &Proj4Service::new())
    }

    pub fn produce_with(&self, key: &TileKey, projection: &dyn ProjectionService) -> TileResult<TileImage> {
        key.validate()?;
        debug!(layer = %key.layer, z = key.z, x = key.x, y = key.y, kind = self.kind(), "Producing tile");
        match self {
            TileProducer::File(layer) => layer.produce(key, projection),
            TileProducer::Array(layer) => layer.produce(key, projection),
            TileProducer::Debug => Ok(debug_tile(key)),
        }
    }
}

impl From<FileLayer> for TileProducer {
    fn from(layer: FileLayer) -> Self {
        TileProducer::File(layer)
    }
}

impl From<ArrayLayer> for TileProducer {
    fn from(layer: ArrayLayer) -> Self {
        TileProducer::Array(layer)
    }
}

/// A raster file, warped to Web Mercator on every request.
pub struct FileLayer {
    path: RwLock<PathBuf>,
    resampling: RwLock<Resampling>,
    /// Used for single-band files.
    style: RwLock<ColourStyle>,
    provider: Arc<dyn RasterProvider>,
}

impl FileLayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_provider(path, Arc::new(GeoTiffProvider::new()))
    }

    pub fn with_provider(path: impl Into<PathBuf>, provider: Arc<dyn RasterProvider>) -> Self {
        Self {
            path: RwLock::new(path.into()),
            resampling: RwLock::new(Resampling::default()),
            style: RwLock::new(ColourStyle::default()),
            provider,
        }
    }

    pub fn path(&self) -> TileResult<PathBuf> {
        Ok(read_lock(&self.path)?.clone())
    }

    pub fn set_path(&self, path: impl AsRef<Path>) -> TileResult<()> {
        *write_lock(&self.path)? = path.as_ref().to_path_buf();
        Ok(())
    }

    pub fn resampling(&self) -> TileResult<Resampling> {
        Ok(*read_lock(&self.resampling)?)
    }

    pub fn set_resampling(&self, resampling: Resampling) -> TileResult<()> {
        *write_lock(&self.resampling)? = resampling;
        Ok(())
    }

    pub fn style(&self) -> TileResult<ColourStyle> {
        Ok(read_lock(&self.style)?.clone())
    }

    pub fn set_style(&self, style: ColourStyle) -> TileResult<()> {
        *write_lock(&self.style)? = style;
        Ok(())
    }

    fn produce(&self, key: &TileKey, projection: &dyn ProjectionService) -> TileResult<TileImage> {
        let path = self.path()?;
        let resampling = self.resampling()?;

        // Handle and warped view are dropped on every return path
        let source = self.provider.open(&path)?;
        let warped = warp(source, &CrsIdentifier::web_mercator(), resampling, projection)?;
        let window = warped.window(&key.xy_bounds());
        let block = warped.read(&window, (TILE_SIZE, TILE_SIZE), true, 0.0)?;

        match block.bands() {
            1 => {
                let grid = SampledGrid {
                    data: block.data,
                    mask: block.valid,
                };
                read_lock(&self.style)?.colourize(&grid)
            }
            n if n >= 3 => TileImage::from_float_bands(block.data.view()),
            n => Err(TileError::InvalidSource(format!(
                "{}: cannot render a {}-band raster",
                path.display(),
                n
            ))),
        }
    }
}

/// In-memory source data of an array layer.
#[derive(Debug, Clone)]
pub enum ArrayData {
    /// Scalar grid, colour mapped on render.
    Scalar(Array2<f32>),
    /// Scalar Zarr array, read chunk by chunk on every render.
    Zarr(ZarrGrid),
    /// Band-first RGB bytes, rendered as is.
    Rgb(Array3<u8>),
}

impl ArrayData {
    fn validate(&self) -> TileResult<()> {
        if let ArrayData::Rgb(data) = self {
            if data.dim().0 != 3 {
                return Err(TileError::InvalidSource(format!(
                    "RGB array must have 3 bands, has {}",
                    data.dim().0
                )));
            }
        }
        Ok(())
    }
}

/// Array shared between a layer and its owner.
pub type SharedArray = Arc<RwLock<ArrayData>>;

/// A caller-owned array rendered with nearest-neighbour sampling.
pub struct ArrayLayer {
    data: SharedArray,
    georef: RwLock<SourceGeoreference>,
    style: RwLock<ColourStyle>,
}

impl ArrayLayer {
    pub fn new(data: ArrayData, affine: AffineTransform, crs: CrsIdentifier) -> TileResult<Self> {
        Self::from_shared(Arc::new(RwLock::new(data)), affine, crs)
    }

    pub fn from_shared(data: SharedArray, affine: AffineTransform, crs: CrsIdentifier) -> TileResult<Self> {
        read_lock(&data)?.validate()?;
        let georef = SourceGeoreference::new(affine, crs)?;
        debug!(crs = %georef.crs(), fast_path = %georef.fast_path(), "Created array layer");
        Ok(Self {
            data,
            georef: RwLock::new(georef),
            style: RwLock::new(ColourStyle::default()),
        })
    }

    pub fn with_style(self, style: ColourStyle) -> Self {
        Self {
            style: RwLock::new(style),
            ..self
        }
    }

    /// Handle for mutating the array in place.
    pub fn shared(&self) -> SharedArray {
        Arc::clone(&self.data)
    }

    pub fn replace_data(&self, data: ArrayData) -> TileResult<()> {
        data.validate()?;
        *write_lock(&self.data)? = data;
        Ok(())
    }

    /// Replace affine and CRS; the fast path is reclassified.
    pub fn set_georeference(&self, affine: AffineTransform, crs: CrsIdentifier) -> TileResult<()> {
        let georef = SourceGeoreference::new(affine, crs)?;
        *write_lock(&self.georef)? = georef;
        Ok(())
    }

    pub fn georeference(&self) -> TileResult<SourceGeoreference> {
        Ok(read_lock(&self.georef)?.clone())
    }

    pub fn style(&self) -> TileResult<ColourStyle> {
        Ok(read_lock(&self.style)?.clone())
    }

    pub fn set_style(&self, style: ColourStyle) -> TileResult<()> {
        *write_lock(&self.style)? = style;
        Ok(())
    }

    /// Change the style in place.
    pub fn update_style<F: FnOnce(&mut ColourStyle)>(&self, f: F) -> TileResult<()> {
        f(&mut *write_lock(&self.style)?);
        Ok(())
    }

    fn produce(&self, key: &TileKey, projection: &dyn ProjectionService) -> TileResult<TileImage> {
        let georef = self.georeference()?;
        let coord = key.coord();

        let sampled = {
            let data = read_lock(&self.data)?;
            match &*data {
                ArrayData::Scalar(grid) => Sampled::Scalar(resample(&coord, &georef, grid, projection)?),
                ArrayData::Zarr(grid) => Sampled::Scalar(resample(&coord, &georef, grid, projection)?),
                ArrayData::Rgb(grid) => Sampled::Rgb(resample(&coord, &georef, grid, projection)?),
            }
        };

        match sampled {
            Sampled::Scalar(grid) => read_lock(&self.style)?.colourize(&grid),
            Sampled::Rgb(grid) => TileImage::from_bands(grid.data.view()),
        }
    }
}

enum Sampled {
    Scalar(SampledGrid<f32>),
    Rgb(SampledGrid<u8>),
}
