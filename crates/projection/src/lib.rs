//! Coordinate reference system handling for tile rendering.
//!
//! Classifies how a source CRS relates to spherical Mercator and maps tile
//! pixels onto source grid cells using the cheapest sufficient transform.

pub mod classify;
pub mod datum;
pub mod mercator;
pub mod sampling;
pub mod service;

pub use classify::{FastPath, ProjectionClassifier, SourceGeoreference};
pub use datum::DatumEquivalenceTable;
pub use sampling::{
    map_tile_to_source, project_to_source, FractionalIndices, ResamplingPlan, SourceIndexMap,
};
pub use service::{proj_definition, Proj4Service, ProjectionService};
