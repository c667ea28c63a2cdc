//! Application state shared by the handlers.

use crate::registry::LayerRegistry;

/// Shared application state.
#[derive(Default)]
pub struct AppState {
    pub registry: LayerRegistry,
}

impl AppState {
    pub fn new(registry: LayerRegistry) -> Self {
        Self { registry }
    }
}
