//! Type-tag registry of motion layer constructors

use bapsf_motion_core::{LookupError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::base::LayerKind;
use super::regular_grid::{GridCNStepLayer, GridLayer, GRID, GRID_CN_STEP};
use crate::params::type_tag;

/// Builds a layer for a motion space of the given dimensionality
pub type LayerFactory = fn(usize, &toml::Table) -> Result<Box<dyn LayerKind>>;

/// Map from `type` tag to layer constructor
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    factories: HashMap<String, LayerFactory>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in layer
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(GRID, |ndims, params| {
                Ok(Box::new(GridLayer::from_config(ndims, params)?))
            })
            .register(GRID_CN_STEP, |ndims, params| {
                Ok(Box::new(GridCNStepLayer::from_config(ndims, params)?))
            });
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, factory: LayerFactory) -> &mut Self {
        self.factories.insert(tag.into(), factory);
        self
    }

    pub fn create(&self, tag: &str, ndims: usize, params: &toml::Table) -> Result<Box<dyn LayerKind>> {
        let factory = self.factories.get(tag).ok_or_else(|| LookupError::UnregisteredType {
            kind: "motion layer".to_string(),
            type_tag: tag.to_string(),
        })?;
        factory(ndims, params)
    }

    /// Sorted list of registered tags
    pub fn list_registered(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        tags.sort_unstable();
        tags
    }
}

/// Process-wide registry of built-in layers
pub fn layer_registry() -> &'static LayerRegistry {
    static REGISTRY: OnceLock<LayerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(LayerRegistry::builtin)
}

/// Build a layer from a configuration table carrying a `type` key
pub fn layer_factory(ndims: usize, config: &toml::Table) -> Result<Box<dyn LayerKind>> {
    layer_registry().create(type_tag("layer", config)?, ndims, config)
}
