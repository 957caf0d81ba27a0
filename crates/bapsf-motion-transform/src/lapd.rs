//! Transform for the LaPD XY probe drive
//!
//! The probe shaft passes through a ball valve pivot on the chamber wall.
//! The drive moves the shaft along its own axis (`e0`) and moves the back
//! end of the shaft vertically (`e1`), which tilts the probe about the pivot.

use bapsf_motion_core::{Result, ValidationError};
use nalgebra::{DMatrix, Matrix3};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::base::{parse_params, validate_matrix_shape, CoordinateTransform};

/// Registry tag
pub const LAPD_XY: &str = "lapd_xy";

fn default_drive_polarity() -> Vec<f64> {
    vec![1.0, 1.0]
}

fn default_mspace_polarity() -> Vec<f64> {
    vec![-1.0, 1.0]
}

/// Parameters of [`LaPDXYTransform`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaPDXYParams {
    /// Distance from the chamber center to the ball valve pivot
    pub pivot_to_center: f64,
    /// Distance from the pivot to the vertical axis of the drive
    pub pivot_to_drive: f64,
    /// Perpendicular distance from the probe shaft to the drive pivot
    pub probe_axis_offset: f64,
    /// Sign of each drive axis relative to the kinematic derivation
    #[serde(default = "default_drive_polarity")]
    pub drive_polarity: Vec<f64>,
    /// Sign of each motion space axis relative to the kinematic derivation.
    /// `[-1, 1]` suits an east port, `[1, 1]` a west port.
    #[serde(default = "default_mspace_polarity")]
    pub mspace_polarity: Vec<f64>,
}

impl LaPDXYParams {
    /// Parameters with the default east-port polarities
    pub fn new(pivot_to_center: f64, pivot_to_drive: f64, probe_axis_offset: f64) -> Self {
        Self {
            pivot_to_center,
            pivot_to_drive,
            probe_axis_offset,
            drive_polarity: default_drive_polarity(),
            mspace_polarity: default_mspace_polarity(),
        }
    }

    fn validate(mut self) -> Result<Self> {
        for (key, value) in [
            ("pivot_to_center", &mut self.pivot_to_center),
            ("pivot_to_drive", &mut self.pivot_to_drive),
            ("probe_axis_offset", &mut self.probe_axis_offset),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::invalid(key, format!("must be finite, got {value}")).into());
            }
            if *value < 0.0 {
                warn!(
                    "Keyword '{}' is not supposed to be negative, assuming the absolute value {}",
                    key,
                    value.abs()
                );
                *value = value.abs();
            }
        }

        for (key, polarity) in [
            ("drive_polarity", &self.drive_polarity),
            ("mspace_polarity", &self.mspace_polarity),
        ] {
            if polarity.len() != 2 {
                return Err(ValidationError::Shape {
                    param: key.to_string(),
                    expected: "2 elements".to_string(),
                    actual: format!("{} elements", polarity.len()),
                }
                .into());
            }
            if polarity.iter().any(|p| p.abs() != 1.0) {
                return Err(ValidationError::invalid(
                    key,
                    format!("entries must be 1 or -1, got {polarity:?}"),
                )
                .into());
            }
        }
        Ok(self)
    }
}

/// Coordinate transform of a ball-valve mounted XY probe drive
#[derive(Debug, Clone, PartialEq)]
pub struct LaPDXYTransform {
    params: LaPDXYParams,
}

impl LaPDXYTransform {
    /// Validate `params` for a drive with `naxes` axes
    pub fn new(naxes: usize, params: LaPDXYParams) -> Result<Self> {
        if naxes != 2 {
            return Err(ValidationError::Shape {
                param: "drive axes".to_string(),
                expected: "2 axes".to_string(),
                actual: format!("{naxes} axes"),
            }
            .into());
        }

        let transform = Self {
            params: params.validate()?,
        };
        validate_matrix_shape(&transform)?;
        Ok(transform)
    }

    /// Build from a configuration table
    pub fn from_config(naxes: usize, params: &toml::Table) -> Result<Self> {
        Self::new(naxes, parse_params(LAPD_XY, params)?)
    }

    /// Validated parameters
    pub fn params(&self) -> &LaPDXYParams {
        &self.params
    }

    fn polarity_matrix(polarity: &[f64]) -> Matrix3<f64> {
        Matrix3::new(
            polarity[0], 0.0, 0.0,
            0.0, polarity[1], 0.0,
            0.0, 0.0, 1.0,
        )
    }

    fn to_dynamic(matrix: Matrix3<f64>) -> DMatrix<f64> {
        DMatrix::from_column_slice(3, 3, matrix.as_slice())
    }
}

impl CoordinateTransform for LaPDXYTransform {
    fn transform_type(&self) -> &'static str {
        LAPD_XY
    }

    fn naxes(&self) -> usize {
        2
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), LAPD_XY.into());
        if let Ok(toml::Value::Table(params)) = toml::Value::try_from(&self.params) {
            config.extend(params);
        }
        config
    }

    fn matrix_to_drive(&self, points: ArrayView2<'_, f64>) -> Vec<DMatrix<f64>> {
        let p = &self.params;
        let dpolarity = Self::polarity_matrix(&p.drive_polarity);
        let mpolarity = Self::polarity_matrix(&p.mspace_polarity);

        points
            .rows()
            .into_iter()
            .map(|point| {
                // kinematics are derived in the polarity-adjusted frame
                let x = p.mspace_polarity[0] * point[0];
                let y = p.mspace_polarity[1] * point[1];

                let theta = -y.atan2(x + p.pivot_to_center);
                let along_shaft = (y.powi(2) + (p.pivot_to_center + x).powi(2)).sqrt()
                    - p.pivot_to_center;
                let vertical = p.pivot_to_drive * theta.tan()
                    + p.probe_axis_offset * (1.0 - 1.0 / theta.cos());

                let t0 = Matrix3::new(
                    0.0, 0.0, along_shaft,
                    0.0, 0.0, vertical,
                    0.0, 0.0, 1.0,
                );
                Self::to_dynamic(dpolarity * t0 * mpolarity)
            })
            .collect()
    }

    fn matrix_to_motion_space(&self, points: ArrayView2<'_, f64>) -> Vec<DMatrix<f64>> {
        let p = &self.params;
        let dpolarity = Self::polarity_matrix(&p.drive_polarity);
        let mpolarity = Self::polarity_matrix(&p.mspace_polarity);

        points
            .rows()
            .into_iter()
            .map(|point| {
                let e1 = p.drive_polarity[1] * point[1];

                let rise = e1 - p.probe_axis_offset;
                let sine_alpha = p.probe_axis_offset / (p.pivot_to_drive.powi(2) + rise.powi(2)).sqrt();
                let tan_beta = rise / -p.pivot_to_drive;
                let theta = tan_beta.atan() - sine_alpha.asin();
                let (sin, cos) = theta.sin_cos();

                let t0 = Matrix3::new(
                    cos, 0.0, -p.pivot_to_center * (1.0 - cos),
                    sin, 0.0, p.pivot_to_center * sin,
                    0.0, 0.0, 1.0,
                );
                Self::to_dynamic(mpolarity * t0 * dpolarity)
            })
            .collect()
    }
}
