//! Shared test utilities for the livemaptiles workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic raster generators
//! - Georeferenced grid fixtures
//! - A minimal GeoTIFF writer for file-backed layer tests
//! - Zarr array fixtures for chunked array layers
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod geotiff;
pub mod zarr;

pub use fixtures::*;
pub use generators::*;
pub use geotiff::*;
pub use zarr::*;
