//! Slippy map tile server.
//!
//! Serves `/livemaptiles/{layer}[/cache{N}][/compress{C}]/{z}/{x}/{y}.{png|bmp}`
//! from a [`LayerRegistry`] of tile producers. Health and Prometheus metrics
//! live on a separate admin router.

pub mod handlers;
pub mod layer_config;
pub mod metrics;
pub mod registry;
pub mod request;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use layer_config::{ConfigError, LayersConfig};
pub use registry::LayerRegistry;
pub use request::TileRequest;
pub use state::AppState;

/// Router for the tile listener. Every path goes through the dispatcher.
pub fn tile_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handlers::tile_handler)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Router for the admin listener.
pub fn admin_router(prometheus_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(prometheus_handle))
}
