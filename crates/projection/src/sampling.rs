//! Tile-to-source index mapping.
//!
//! For every output pixel of a tile, find the source cell whose area
//! contains the pixel centre. The heavy lifting is one pass of coordinate
//! transforms chosen by the source's [`FastPath`]; the result is a flat
//! index table with a validity bitmap.

use crate::classify::{FastPath, SourceGeoreference};
use crate::service::ProjectionService;
use tile_common::{AffineTransform, BoundingBox, CrsIdentifier, TileCoord, TileResult, TILE_SIZE};

/// Destination grid for one tile render.
#[derive(Debug, Clone)]
pub struct ResamplingPlan {
    pub fast_path: FastPath,
    pub dst_affine: AffineTransform,
    pub width: usize,
    pub height: usize,
    /// EPSG:3857 x of every pixel centre, row-major.
    pub xs: Vec<f64>,
    /// EPSG:3857 y of every pixel centre, row-major.
    pub ys: Vec<f64>,
}

impl ResamplingPlan {
    /// Plan for a standard 256x256 XYZ tile.
    pub fn for_tile(coord: &TileCoord, fast_path: FastPath) -> Self {
        Self::for_bounds(&coord.xy_bounds(), TILE_SIZE, TILE_SIZE, fast_path)
    }

    pub fn for_bounds(bbox: &BoundingBox, width: usize, height: usize, fast_path: FastPath) -> Self {
        let dst_affine = AffineTransform::from_bbox(bbox, width, height);
        let (xs, ys) = pixel_centre_grid(&dst_affine, width, height);
        Self {
            fast_path,
            dst_affine,
            width,
            height,
            xs,
            ys,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Carry the pixel centres into fractional source (col, row).
    ///
    /// Points the projection cannot handle come back as NaN.
    pub fn into_source_indices(
        self,
        georef: &SourceGeoreference,
        projection: &dyn ProjectionService,
    ) -> TileResult<FractionalIndices> {
        let Self {
            fast_path,
            width,
            height,
            mut xs,
            mut ys,
            ..
        } = self;
        project_to_source(fast_path, georef, projection, &mut xs, &mut ys)?;

        Ok(FractionalIndices {
            width,
            height,
            cols: xs,
            rows: ys,
        })
    }
}

/// Move EPSG:3857 coordinates into fractional source (col, row), in place.
pub fn project_to_source(
    fast_path: FastPath,
    georef: &SourceGeoreference,
    projection: &dyn ProjectionService,
    xs: &mut [f64],
    ys: &mut [f64],
) -> TileResult<()> {
    let mercator = CrsIdentifier::web_mercator();

    match fast_path {
        FastPath::SameProjection => {}
        FastPath::SameDatumGeographic => {
            projection.inverse(&mercator, xs, ys)?;
        }
        FastPath::SameDatumOther => {
            projection.inverse(&mercator, xs, ys)?;
            projection.forward(georef.crs(), xs, ys)?;
        }
        FastPath::GeneralTransform => {
            projection.transform(&mercator, georef.crs(), xs, ys)?;
        }
    }

    georef.inverse_affine().apply_in_place(xs, ys);
    Ok(())
}

/// Pixel-centre coordinates `(col + 0.5, row + 0.5)` through `affine`.
pub fn pixel_centre_grid(affine: &AffineTransform, width: usize, height: usize) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::with_capacity(width * height);
    let mut ys = Vec::with_capacity(width * height);
    for row in 0..height {
        let r = row as f64 + 0.5;
        for col in 0..width {
            let (x, y) = affine.apply(col as f64 + 0.5, r);
            xs.push(x);
            ys.push(y);
        }
    }
    (xs, ys)
}

/// Fractional source positions for every output pixel.
#[derive(Debug, Clone)]
pub struct FractionalIndices {
    pub width: usize,
    pub height: usize,
    pub cols: Vec<f64>,
    pub rows: Vec<f64>,
}

impl FractionalIndices {
    /// Floor to cell indices and mask everything outside a
    /// `src_rows` x `src_cols` grid.
    pub fn floor_and_mask(&self, src_rows: usize, src_cols: usize) -> SourceIndexMap {
        let mut map = SourceIndexMap::empty(self.width, self.height, src_rows, src_cols);
        let (max_col, max_row) = (src_cols as f64, src_rows as f64);

        for (idx, (&c, &r)) in self.cols.iter().zip(&self.rows).enumerate() {
            let (c, r) = (c.floor(), r.floor());
            // NaN fails every comparison and stays invalid
            if c >= 0.0 && c < max_col && r >= 0.0 && r < max_row {
                map.set(idx, r as usize, c as usize);
            }
        }
        map
    }
}

/// Source cell for every output pixel, with a validity bitmap.
#[derive(Clone)]
pub struct SourceIndexMap {
    pub width: usize,
    pub height: usize,
    pub src_rows: usize,
    pub src_cols: usize,
    /// (row, col) per pixel; meaningful only where valid.
    cells: Vec<(usize, usize)>,
    /// Bit N is 1 if pixel N maps inside the source grid.
    valid_bitmap: Vec<u64>,
}

impl SourceIndexMap {
    fn empty(width: usize, height: usize, src_rows: usize, src_cols: usize) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            src_rows,
            src_cols,
            cells: vec![(0, 0); n],
            valid_bitmap: vec![0u64; n.div_ceil(64)],
        }
    }

    #[inline]
    fn set(&mut self, pixel_idx: usize, row: usize, col: usize) {
        self.cells[pixel_idx] = (row, col);
        self.valid_bitmap[pixel_idx / 64] |= 1u64 << (pixel_idx % 64);
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_valid(&self, pixel_idx: usize) -> bool {
        (self.valid_bitmap[pixel_idx / 64] & (1u64 << (pixel_idx % 64))) != 0
    }

    /// Source (row, col) for a pixel, or `None` if it falls outside.
    #[inline]
    pub fn get(&self, pixel_idx: usize) -> Option<(usize, usize)> {
        if self.is_valid(pixel_idx) {
            Some(self.cells[pixel_idx])
        } else {
            None
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid_bitmap
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    /// `(pixel_idx, row, col)` for every valid pixel, in pixel order.
    pub fn valid_cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.is_valid(*idx))
            .map(|(idx, &(r, c))| (idx, r, c))
    }

    /// Per-pixel validity as a plain vector.
    pub fn mask(&self) -> Vec<bool> {
        (0..self.len()).map(|i| self.is_valid(i)).collect()
    }
}

impl std::fmt::Debug for SourceIndexMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIndexMap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("src_rows", &self.src_rows)
            .field("src_cols", &self.src_cols)
            .field("valid", &self.valid_count())
            .finish()
    }
}

/// Map a tile onto a `src_rows` x `src_cols` source grid.
pub fn map_tile_to_source(
    coord: &TileCoord,
    georef: &SourceGeoreference,
    src_rows: usize,
    src_cols: usize,
    projection: &dyn ProjectionService,
) -> TileResult<SourceIndexMap> {
    let plan = ResamplingPlan::for_tile(coord, georef.fast_path());
    let indices = plan.into_source_indices(georef, projection)?;
    Ok(indices.floor_and_mask(src_rows, src_cols))
}
