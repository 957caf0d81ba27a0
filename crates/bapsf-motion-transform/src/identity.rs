//! Identity transform, drive coordinates equal motion space coordinates

use bapsf_motion_core::{Result, ValidationError};
use nalgebra::DMatrix;
use ndarray::ArrayView2;

use crate::base::{validate_matrix_shape, CoordinateTransform};

/// Registry tag
pub const IDENTITY: &str = "identity";

/// Transform for drives whose axes are already motion space axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityTransform {
    naxes: usize,
}

impl IdentityTransform {
    pub fn new(naxes: usize) -> Result<Self> {
        if naxes == 0 {
            return Err(ValidationError::invalid("drive axes", "at least one axis is required").into());
        }
        let transform = Self { naxes };
        validate_matrix_shape(&transform)?;
        Ok(transform)
    }

    /// Build from a configuration table; no parameters besides `type`
    pub fn from_config(naxes: usize, params: &toml::Table) -> Result<Self> {
        if let Some(key) = params.keys().find(|k| k.as_str() != "type") {
            return Err(ValidationError::invalid(IDENTITY, format!("unexpected parameter '{key}'")).into());
        }
        Self::new(naxes)
    }

    fn matrices(&self, npoints: usize) -> Vec<DMatrix<f64>> {
        vec![DMatrix::identity(self.naxes + 1, self.naxes + 1); npoints]
    }
}

impl CoordinateTransform for IdentityTransform {
    fn transform_type(&self) -> &'static str {
        IDENTITY
    }

    fn naxes(&self) -> usize {
        self.naxes
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), IDENTITY.into());
        config
    }

    fn matrix_to_drive(&self, points: ArrayView2<'_, f64>) -> Vec<DMatrix<f64>> {
        self.matrices(points.nrows())
    }

    fn matrix_to_motion_space(&self, points: ArrayView2<'_, f64>) -> Vec<DMatrix<f64>> {
        self.matrices(points.nrows())
    }
}
