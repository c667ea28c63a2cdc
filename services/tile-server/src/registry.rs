//! Named tile producers.

use renderer::TileProducer;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Map of layer name to producer, shared by all request handlers.
///
/// Producers can be added and removed while the server runs; a request holds
/// its own `Arc` so removing a layer never interrupts a render in flight.
#[derive(Default)]
pub struct LayerRegistry {
    layers: RwLock<HashMap<String, Arc<TileProducer>>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the `debug` layer.
    pub fn with_debug_layer() -> Self {
        let registry = Self::new();
        registry.register("debug", TileProducer::Debug);
        registry
    }

    /// Add or replace a layer. Returns the producer it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        producer: impl Into<Arc<TileProducer>>,
    ) -> Option<Arc<TileProducer>> {
        let name = name.into();
        let producer = producer.into();
        info!(layer = %name, kind = producer.kind(), "Registered layer");
        self.write().insert(name, producer)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<TileProducer>> {
        let removed = self.write().remove(name);
        if removed.is_some() {
            info!(layer = %name, "Unregistered layer");
        }
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<TileProducer>> {
        self.read().get(name).cloned()
    }

    /// Registered layer names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map is only ever swapped entry by entry, so a poisoned lock still
    // holds a consistent map.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<TileProducer>>> {
        self.layers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<TileProducer>>> {
        self.layers.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lookup_unregister() {
        let registry = LayerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register("a", TileProducer::Debug).is_none());
        assert!(registry.register("b", TileProducer::Debug).is_none());
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);

        assert!(registry.lookup("a").is_some());
        assert!(registry.lookup("c").is_none());

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert!(registry.lookup("a").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces() {
        let registry = LayerRegistry::with_debug_layer();
        let replaced = registry.register("debug", TileProducer::Debug);
        assert_eq!(replaced.map(|p| p.kind()), Some("debug"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_outlives_unregister() {
        let registry = LayerRegistry::with_debug_layer();
        let held = registry.lookup("debug").unwrap();
        registry.unregister("debug");
        assert_eq!(held.kind(), "debug");
    }
}
