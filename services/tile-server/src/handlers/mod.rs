//! HTTP request handlers.
//!
//! - `tiles`: the tile dispatcher behind every path of the tile listener
//! - `admin`: health and Prometheus metrics for the admin listener

pub mod admin;
pub mod tiles;

pub use admin::{health_handler, metrics_handler};
pub use tiles::tile_handler;
