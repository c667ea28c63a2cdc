//! Layer configuration loader.
//!
//! Layers served by the binary come from a YAML file:
//!
//! ```yaml
//! layers:
//!   - name: ortho
//!     kind: file
//!     path: /data/ortho.tif
//!     resampling: bilinear
//!   - name: dem
//!     kind: file
//!     path: /data/dem.tif
//!     style: { scale_min: 0, scale_max: 3000, ramp: viridis }
//!   - name: t2m
//!     kind: zarr
//!     path: /data/t2m.zarr
//!     bounds: [-180, -90, 180, 90]
//!     epsg: 4326
//!   - name: diag
//!     kind: debug
//! ```
//!
//! In-memory array layers have no file form; embedders register them directly
//! on the [`LayerRegistry`].

use raster_source::Resampling;
use renderer::{ArrayData, ArrayLayer, FileLayer, StyleConfig, TileProducer, ZarrGrid};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tile_common::{AffineTransform, CrsIdentifier, TileError};
use tracing::info;

use crate::registry::LayerRegistry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid layer configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Layer name '{0}' must be letters, digits or underscores")]
    InvalidName(String),

    #[error("Layer '{0}' is defined more than once")]
    Duplicate(String),

    #[error("Layer '{layer}': {source}")]
    Layer { layer: String, source: TileError },
}

/// Contents of a layers file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayersConfig {
    #[serde(default)]
    pub layers: Vec<LayerDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerDefinition {
    pub name: String,
    #[serde(flatten)]
    pub source: LayerSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayerSource {
    File {
        path: PathBuf,
        #[serde(default)]
        resampling: Resampling,
        /// Colouring of single-band files.
        #[serde(default)]
        style: Option<StyleConfig>,
    },
    /// A 2-D float32 Zarr array covering `bounds` in `epsg`.
    Zarr {
        path: PathBuf,
        /// min_x, min_y, max_x, max_y
        bounds: [f64; 4],
        epsg: u32,
        #[serde(default)]
        style: Option<StyleConfig>,
    },
    Debug,
}

impl LayersConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.check_names()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    fn check_names(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for layer in &self.layers {
            let name = layer.name.as_str();
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidName(layer.name.clone()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Duplicate(layer.name.clone()));
            }
        }
        Ok(())
    }

    /// Build every layer and register it. Nothing is registered if any
    /// layer fails to build.
    pub fn apply(&self, registry: &LayerRegistry) -> Result<usize, ConfigError> {
        let producers = self
            .layers
            .iter()
            .map(|def| Ok((def.name.clone(), def.build()?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let count = producers.len();
        for (name, producer) in producers {
            registry.register(name, producer);
        }
        info!(layers = count, "Loaded layer configuration");
        Ok(count)
    }
}

impl LayerDefinition {
    pub fn build(&self) -> Result<TileProducer, ConfigError> {
        let wrap = |source: TileError| ConfigError::Layer {
            layer: self.name.clone(),
            source,
        };

        match &self.source {
            LayerSource::File {
                path,
                resampling,
                style,
            } => {
                // The file is only opened per request; a missing file shows up as 500s
                let layer = FileLayer::new(path.clone());
                layer.set_resampling(*resampling).map_err(wrap)?;
                if let Some(style) = style {
                    layer.set_style(style.to_style().map_err(wrap)?).map_err(wrap)?;
                }
                Ok(TileProducer::File(layer))
            }
            LayerSource::Zarr {
                path,
                bounds,
                epsg,
                style,
            } => {
                // Only the array metadata is read here; chunks are read per tile
                let grid = ZarrGrid::open_dir(path).map_err(wrap)?;
                let (rows, cols) = renderer::Gatherable::<f32>::grid_shape(&grid);
                let [min_x, min_y, max_x, max_y] = *bounds;
                let affine = AffineTransform::from_bounds(min_x, min_y, max_x, max_y, cols, rows);
                let layer = ArrayLayer::new(ArrayData::Zarr(grid), affine, CrsIdentifier::epsg(*epsg)).map_err(wrap)?;
                if let Some(style) = style {
                    layer.set_style(style.to_style().map_err(wrap)?).map_err(wrap)?;
                }
                Ok(TileProducer::from(layer))
            }
            LayerSource::Debug => Ok(TileProducer::Debug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
layers:
  - name: ortho
    kind: file
    path: /data/ortho.tif
    resampling: bilinear
  - name: dem
    kind: file
    path: /data/dem.tif
    style:
      scale_min: 0
      scale_max: 3000
      ramp_stops:
        - { value: 0.0, color: "#000000" }
        - { value: 1.0, color: "#ffffff" }
      alpha: 0.5
  - name: diag
    kind: debug
"##;

    #[test]
    fn test_parse_sample() {
        let config = LayersConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.layers.len(), 3);
        match &config.layers[0].source {
            LayerSource::File { path, resampling, style } => {
                assert_eq!(path, &PathBuf::from("/data/ortho.tif"));
                assert_eq!(*resampling, Resampling::Bilinear);
                assert!(style.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(config.layers[2].source, LayerSource::Debug));
    }

    #[test]
    fn test_apply_registers_layers() {
        let registry = LayerRegistry::with_debug_layer();
        let count = LayersConfig::from_yaml(SAMPLE).unwrap().apply(&registry).unwrap();
        assert_eq!(count, 3);
        assert_eq!(registry.names(), vec!["debug", "dem", "diag", "ortho"]);

        let dem = registry.lookup("dem").unwrap();
        match dem.as_ref() {
            TileProducer::File(layer) => {
                let style = layer.style().unwrap();
                assert_eq!(style.scale_max, 3000.0);
                assert_eq!(layer.resampling().unwrap(), Resampling::Nearest);
            }
            _ => panic!("dem should be a file layer"),
        }
    }

    #[test]
    fn test_empty_file() {
        let config = LayersConfig::from_yaml("layers: []").unwrap();
        assert!(config.layers.is_empty());
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let bad_name = "layers:\n  - name: my-layer\n    kind: debug\n";
        assert!(matches!(
            LayersConfig::from_yaml(bad_name),
            Err(ConfigError::InvalidName(_))
        ));

        let dup = "layers:\n  - name: a\n    kind: debug\n  - name: a\n    kind: debug\n";
        assert!(matches!(LayersConfig::from_yaml(dup), Err(ConfigError::Duplicate(_))));

        let unknown_kind = "layers:\n  - name: a\n    kind: array\n";
        assert!(matches!(LayersConfig::from_yaml(unknown_kind), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bad_style_registers_nothing() {
        let yaml = "layers:\n  - name: ok\n    kind: debug\n  - name: bad\n    kind: file\n    path: x.tif\n    style: { ramp: rainbow }\n";
        let registry = LayerRegistry::new();
        let result = LayersConfig::from_yaml(yaml).unwrap().apply(&registry);
        assert!(matches!(result, Err(ConfigError::Layer { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zarr_layer_from_config() {
        let store = test_utils::TempZarr::float(&ndarray::Array2::from_elem((90, 180), 1.0), 32, 32);
        let yaml = format!(
            "layers:\n  - name: t2m\n    kind: zarr\n    path: {}\n    bounds: [-180, -90, 180, 90]\n    epsg: 4326\n",
            store.path().display()
        );
        let registry = LayerRegistry::new();
        LayersConfig::from_yaml(&yaml).unwrap().apply(&registry).unwrap();

        let layer = registry.lookup("t2m").unwrap();
        match layer.as_ref() {
            TileProducer::Array(array) => {
                let georef = array.georeference().unwrap();
                assert_eq!(georef.crs(), &CrsIdentifier::wgs84());
                assert_eq!(georef.affine().a, 2.0);
            }
            _ => panic!("t2m should be an array layer"),
        }
    }

    #[test]
    fn test_missing_zarr_store_fails_to_load() {
        let yaml = "layers:\n  - name: t2m\n    kind: zarr\n    path: /nonexistent/t2m.zarr\n    bounds: [0, 0, 1, 1]\n    epsg: 4326\n";
        let registry = LayerRegistry::new();
        let result = LayersConfig::from_yaml(yaml).unwrap().apply(&registry);
        assert!(matches!(result, Err(ConfigError::Layer { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            LayersConfig::load("/nonexistent/layers.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
