//! Type-tag registry of transform constructors

use bapsf_motion_core::{LookupError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::base::CoordinateTransform;
use crate::identity::{IdentityTransform, IDENTITY};
use crate::lapd::{LaPDXYTransform, LAPD_XY};

/// Builds a transform for a drive with the given axis count
pub type TransformFactory = fn(usize, &toml::Table) -> Result<Box<dyn CoordinateTransform>>;

/// Map from `type` tag to transform constructor
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    factories: HashMap<String, TransformFactory>,
}

impl TransformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in transform
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(LAPD_XY, |naxes, params| {
                Ok(Box::new(LaPDXYTransform::from_config(naxes, params)?))
            })
            .register(IDENTITY, |naxes, params| {
                Ok(Box::new(IdentityTransform::from_config(naxes, params)?))
            });
        registry
    }

    /// Register a constructor under `tag`
    pub fn register(&mut self, tag: impl Into<String>, factory: TransformFactory) -> &mut Self {
        self.factories.insert(tag.into(), factory);
        self
    }

    /// Build the transform registered under `tag`
    pub fn create(&self, tag: &str, naxes: usize, params: &toml::Table) -> Result<Box<dyn CoordinateTransform>> {
        let factory = self.factories.get(tag).ok_or_else(|| LookupError::UnregisteredType {
            kind: "transform".to_string(),
            type_tag: tag.to_string(),
        })?;
        factory(naxes, params)
    }

    /// Sorted list of registered tags
    pub fn list_registered(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        tags.sort_unstable();
        tags
    }
}

/// Process-wide registry of built-in transforms
pub fn registry() -> &'static TransformRegistry {
    static REGISTRY: OnceLock<TransformRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TransformRegistry::builtin)
}

/// Build a transform from a configuration table carrying a `type` key
pub fn transform_factory(naxes: usize, config: &toml::Table) -> Result<Box<dyn CoordinateTransform>> {
    let tag = config.get("type").and_then(|v| v.as_str()).ok_or_else(|| {
        bapsf_motion_core::ValidationError::MissingParameter {
            param: "transform.type".to_string(),
        }
    })?;
    registry().create(tag, naxes, config)
}
