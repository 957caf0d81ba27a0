//! Exclusion layer base types
//!
//! Masks follow one convention everywhere: `true` marks an allowed cell,
//! `false` an excluded one.

use bapsf_motion_core::{Result, UsageError, ValidationError};
use ndarray::ArrayD;
use std::fmt::Debug;
use tracing::debug;

use crate::space::MotionSpace;

/// Name prefix of exclusions stored in a [`MotionSpace`]
pub const EXCLUSION_PREFIX: &str = "mask_ex";

/// Mask generator behind an [`ExclusionLayer`]
pub trait ExclusionKind: Debug + Send + Sync {
    /// Registry tag of this exclusion type
    fn exclusion_type(&self) -> &'static str;

    /// Exclusion parameters, including the `type` key
    fn config(&self) -> toml::Table;

    /// Allowed-cell mask over the full grid of `space`
    fn generate(&self, space: &MotionSpace) -> Result<ArrayD<bool>>;
}

/// A region of the motion space the probe may not enter
#[derive(Debug)]
pub struct ExclusionLayer {
    name: String,
    detached: bool,
    kind: Box<dyn ExclusionKind>,
}

impl ExclusionLayer {
    /// Generate the mask, store it in `space` and AND it into the
    /// global mask
    pub fn attach(space: &mut MotionSpace, kind: Box<dyn ExclusionKind>) -> Result<Self> {
        let layer = Self {
            name: space.next_name(EXCLUSION_PREFIX),
            detached: false,
            kind,
        };
        layer.regenerate(space)?;
        layer.update_global_mask(space)?;
        debug!("Added {} exclusion '{}'", layer.exclusion_type(), layer.name);
        Ok(layer)
    }

    /// An exclusion that never touches a motion space
    pub fn detached(kind: Box<dyn ExclusionKind>) -> Self {
        Self {
            name: EXCLUSION_PREFIX.to_string(),
            detached: true,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exclusion_type(&self) -> &'static str {
        self.kind.exclusion_type()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn config(&self) -> toml::Table {
        self.kind.config()
    }

    /// Compute the mask without storing it
    pub fn generate(&self, space: &MotionSpace) -> Result<ArrayD<bool>> {
        let mask = self.kind.generate(space)?;
        space.check_mask_shape(&mask)?;
        Ok(mask)
    }

    /// Recompute the mask and replace the stored array
    pub fn regenerate(&self, space: &mut MotionSpace) -> Result<()> {
        self.require_attached("be regenerated in the motion space")?;
        let mask = self.generate(space)?;
        space.insert_exclusion(self.name.clone(), mask)
    }

    /// AND the stored mask into the global mask
    pub fn update_global_mask(&self, space: &mut MotionSpace) -> Result<()> {
        self.require_attached("update the global mask")?;
        let mask = match space.remove_exclusion(&self.name) {
            Some(mask) => mask,
            None => self.generate(space)?,
        };
        let merged = space.and_mask(&mask);
        space.insert_exclusion(self.name.clone(), mask)?;
        merged
    }

    /// The mask of this exclusion, generated on demand when not stored
    pub fn exclusion(&self, space: &MotionSpace) -> Result<ArrayD<bool>> {
        match space.exclusion(&self.name).filter(|_| !self.detached) {
            Some(mask) => Ok(mask.clone()),
            None => self.generate(space),
        }
    }

    /// Whether the grid cell nearest to `point` is excluded by this layer
    pub fn is_excluded(&self, space: &MotionSpace, point: &[f64]) -> Result<bool> {
        let index = space.nearest_index(point)?;
        match space.exclusion(&self.name).filter(|_| !self.detached) {
            Some(mask) => Ok(!mask[index]),
            None => Ok(!self.generate(space)?[index]),
        }
    }

    fn require_attached(&self, operation: &str) -> Result<()> {
        if self.detached {
            return Err(UsageError::Detached {
                name: self.name.clone(),
                operation: operation.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Exclusions of this crate are planar
pub(crate) fn require_planar(exclusion_type: &str, space: &MotionSpace) -> Result<()> {
    if space.ndims() != 2 {
        return Err(ValidationError::Shape {
            param: exclusion_type.to_string(),
            expected: "a 2 dimensional motion space".to_string(),
            actual: format!("{} dimensions", space.ndims()),
        }
        .into());
    }
    Ok(())
}
