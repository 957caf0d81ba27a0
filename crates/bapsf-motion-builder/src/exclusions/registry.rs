//! Type-tag registry of exclusion constructors

use bapsf_motion_core::{LookupError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::base::ExclusionKind;
use super::circular::{CircularExclusion, CIRCLE};
use super::divider::{DividerExclusion, DIVIDER};
use super::lapd::{LaPDXYExclusion, LAPD_XY_EXCLUSION};
use crate::params::type_tag;
use crate::space::MotionSpace;

/// Builds an exclusion for the given motion space
pub type ExclusionFactory = fn(&MotionSpace, &toml::Table) -> Result<Box<dyn ExclusionKind>>;

/// Map from `type` tag to exclusion constructor
#[derive(Debug, Clone, Default)]
pub struct ExclusionRegistry {
    factories: HashMap<String, ExclusionFactory>,
}

impl ExclusionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in exclusion
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(CIRCLE, |space, params| {
                Ok(Box::new(CircularExclusion::from_config(space, params)?))
            })
            .register(DIVIDER, |space, params| {
                Ok(Box::new(DividerExclusion::from_config(space, params)?))
            })
            .register(LAPD_XY_EXCLUSION, |space, params| {
                Ok(Box::new(LaPDXYExclusion::from_config(space, params)?))
            });
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, factory: ExclusionFactory) -> &mut Self {
        self.factories.insert(tag.into(), factory);
        self
    }

    pub fn create(&self, tag: &str, space: &MotionSpace, params: &toml::Table) -> Result<Box<dyn ExclusionKind>> {
        let factory = self.factories.get(tag).ok_or_else(|| LookupError::UnregisteredType {
            kind: "exclusion".to_string(),
            type_tag: tag.to_string(),
        })?;
        factory(space, params)
    }

    /// Sorted list of registered tags
    pub fn list_registered(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        tags.sort_unstable();
        tags
    }
}

/// Process-wide registry of built-in exclusions
pub fn exclusion_registry() -> &'static ExclusionRegistry {
    static REGISTRY: OnceLock<ExclusionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ExclusionRegistry::builtin)
}

/// Build an exclusion from a configuration table carrying a `type` key
pub fn exclusion_factory(space: &MotionSpace, config: &toml::Table) -> Result<Box<dyn ExclusionKind>> {
    exclusion_registry().create(type_tag("exclusion", config)?, space, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tags() {
        assert_eq!(
            exclusion_registry().list_registered(),
            vec!["circle", "divider", "lapd-XY"]
        );
    }

    #[test]
    fn test_unknown_tag() {
        let config: toml::Table = toml::from_str("type = \"lapd_xy\"").unwrap();
        let err = exclusion_factory(&MotionSpace::lapd_xy(), &config).unwrap_err();
        assert!(err.is_lookup_error());
    }
}
