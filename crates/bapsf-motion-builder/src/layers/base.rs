//! Motion layer base types

use bapsf_motion_core::{Result, UsageError, ValidationError};
use ndarray::ArrayD;
use std::fmt::Debug;
use tracing::debug;

use crate::space::MotionSpace;

/// Name prefix of layers stored in a [`MotionSpace`]
pub const LAYER_PREFIX: &str = "point_layer";

/// Point generator behind a [`MotionLayer`]
pub trait LayerKind: Debug + Send + Sync {
    /// Registry tag of this layer type
    fn layer_type(&self) -> &'static str;

    /// Motion space dimensionality the layer was built for
    fn ndims(&self) -> usize;

    /// Layer parameters, including the `type` key
    fn config(&self) -> toml::Table;

    /// Points of shape `(n_1, ..., n_N, N)`
    fn generate(&self) -> Result<ArrayD<f64>>;
}

/// A set of candidate points, stored by name in a [`MotionSpace`]
#[derive(Debug)]
pub struct MotionLayer {
    name: String,
    detached: bool,
    kind: Box<dyn LayerKind>,
}

impl MotionLayer {
    /// Generate the layer and store its points in `space`
    pub fn attach(space: &mut MotionSpace, kind: Box<dyn LayerKind>) -> Result<Self> {
        check_ndims(space, kind.as_ref())?;
        let layer = Self {
            name: space.next_name(LAYER_PREFIX),
            detached: false,
            kind,
        };
        space.insert_layer(layer.name.clone(), layer.kind.generate()?);
        debug!("Added {} layer '{}'", layer.layer_type(), layer.name);
        Ok(layer)
    }

    /// A layer that never touches a motion space
    pub fn detached(kind: Box<dyn LayerKind>) -> Self {
        Self {
            name: LAYER_PREFIX.to_string(),
            detached: true,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer_type(&self) -> &'static str {
        self.kind.layer_type()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Compute the points without storing them
    pub fn generate(&self) -> Result<ArrayD<f64>> {
        self.kind.generate()
    }

    /// Recompute the points and replace the stored array
    pub fn regenerate(&self, space: &mut MotionSpace) -> Result<()> {
        if self.detached {
            return Err(UsageError::Detached {
                name: self.name.clone(),
                operation: "be regenerated in the motion space".to_string(),
            }
            .into());
        }
        space.insert_layer(self.name.clone(), self.kind.generate()?);
        Ok(())
    }

    /// Stored points, `None` for detached layers
    pub fn points<'a>(&self, space: &'a MotionSpace) -> Option<&'a ArrayD<f64>> {
        if self.detached {
            None
        } else {
            space.layer(&self.name)
        }
    }

    pub fn config(&self) -> toml::Table {
        self.kind.config()
    }
}

fn check_ndims(space: &MotionSpace, kind: &dyn LayerKind) -> Result<()> {
    if kind.ndims() != space.ndims() {
        return Err(ValidationError::Shape {
            param: kind.layer_type().to_string(),
            expected: format!("{} motion space axes", space.ndims()),
            actual: format!("{} axes", kind.ndims()),
        }
        .into());
    }
    Ok(())
}
