//! Shared transform machinery
//!
//! Every transform produces one homogeneous `(N+1)×(N+1)` matrix per point.
//! Applying a transform appends a `1` to each point, multiplies and drops
//! the homogeneous coordinate again.

use bapsf_motion_core::{Result, ValidationError};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView2};
use std::fmt;

/// Direction of a coordinate conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Motion space to drive space
    ToDrive,
    /// Drive space to motion space
    ToMotionSpace,
}

impl std::str::FromStr for Direction {
    type Err = bapsf_motion_core::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drive" => Ok(Direction::ToDrive),
            "mspace" | "motion_space" | "motion space" => Ok(Direction::ToMotionSpace),
            other => Err(ValidationError::invalid(
                "to_coords",
                format!("expected 'drive' or 'motion_space', got '{other}'"),
            )
            .into()),
        }
    }
}

/// Bidirectional mapping between motion space and drive space
pub trait CoordinateTransform: fmt::Debug + Send + Sync {
    /// Registry tag of this transform
    fn transform_type(&self) -> &'static str;

    /// Number of drive axes, equal to the motion space dimensionality
    fn naxes(&self) -> usize;

    /// Configuration including the `type` key
    fn config(&self) -> toml::Table;

    /// One matrix per row of `points` (motion space coordinates)
    fn matrix_to_drive(&self, points: ArrayView2<'_, f64>) -> Vec<DMatrix<f64>>;

    /// One matrix per row of `points` (drive coordinates)
    fn matrix_to_motion_space(&self, points: ArrayView2<'_, f64>) -> Vec<DMatrix<f64>>;

    /// Matrices for the requested direction
    fn matrix(&self, points: ArrayView2<'_, f64>, direction: Direction) -> Vec<DMatrix<f64>> {
        match direction {
            Direction::ToDrive => self.matrix_to_drive(points),
            Direction::ToMotionSpace => self.matrix_to_motion_space(points),
        }
    }

    /// Convert a batch of shape `(npoints, naxes)` into drive space
    fn to_drive(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        convert(self, points, Direction::ToDrive)
    }

    /// Convert a batch of shape `(npoints, naxes)` into motion space
    fn to_motion_space(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        convert(self, points, Direction::ToMotionSpace)
    }

    /// Convert a single motion space point into drive space
    fn point_to_drive(&self, point: &[f64]) -> Result<Vec<f64>> {
        convert_point(self, point, Direction::ToDrive)
    }

    /// Convert a single drive point into motion space
    fn point_to_motion_space(&self, point: &[f64]) -> Result<Vec<f64>> {
        convert_point(self, point, Direction::ToMotionSpace)
    }
}

/// Apply `transform` to every row of `points`
pub fn convert<T>(transform: &T, points: ArrayView2<'_, f64>, direction: Direction) -> Result<Array2<f64>>
where
    T: CoordinateTransform + ?Sized,
{
    let naxes = transform.naxes();
    if points.ncols() != naxes {
        return Err(ValidationError::Shape {
            param: "points".to_string(),
            expected: format!("(npoints, {naxes})"),
            actual: format!("{:?}", points.shape()),
        }
        .into());
    }

    let matrices = transform.matrix(points, direction);
    let mut converted = Array2::<f64>::zeros(points.raw_dim());
    for ((row, matrix), mut out) in points
        .rows()
        .into_iter()
        .zip(matrices.iter())
        .zip(converted.rows_mut())
    {
        let homogeneous = DVector::from_iterator(naxes + 1, row.iter().copied().chain([1.0]));
        let result = matrix * homogeneous;
        for (slot, value) in out.iter_mut().zip(result.iter()) {
            *slot = *value;
        }
    }
    Ok(converted)
}

fn convert_point<T>(transform: &T, point: &[f64], direction: Direction) -> Result<Vec<f64>>
where
    T: CoordinateTransform + ?Sized,
{
    let points = ArrayView2::from_shape((1, point.len()), point).map_err(|e| ValidationError::Shape {
        param: "point".to_string(),
        expected: format!("{} values", transform.naxes()),
        actual: e.to_string(),
    })?;
    Ok(convert(transform, points, direction)?.row(0).to_vec())
}

/// Check that a freshly built transform generates `(N+1)×(N+1)` matrices
pub fn validate_matrix_shape<T>(transform: &T) -> Result<()>
where
    T: CoordinateTransform + ?Sized,
{
    let naxes = transform.naxes();
    let origin = Array2::<f64>::zeros((1, naxes));
    let matrices = transform.matrix_to_drive(origin.view());

    let expected = (naxes + 1, naxes + 1);
    match matrices.as_slice() {
        [matrix] if matrix.shape() == expected => Ok(()),
        [matrix] => Err(ValidationError::Shape {
            param: "transform matrix".to_string(),
            expected: format!("{expected:?}"),
            actual: format!("{:?}", matrix.shape()),
        }
        .into()),
        other => Err(ValidationError::Shape {
            param: "transform matrix".to_string(),
            expected: "one matrix per point".to_string(),
            actual: format!("{} matrices for 1 point", other.len()),
        }
        .into()),
    }
}

/// Deserialize variant parameters from a configuration table
pub(crate) fn parse_params<P>(transform_type: &str, params: &toml::Table) -> Result<P>
where
    P: serde::de::DeserializeOwned,
{
    let mut params = params.clone();
    params.remove("type");
    toml::Value::Table(params).try_into().map_err(|e: toml::de::Error| {
        ValidationError::invalid(transform_type, e.message().to_string()).into()
    })
}
