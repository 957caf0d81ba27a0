//! Regularly spaced grids of points
//!
//! Both layer types resolve to per-axis `limits` and `npoints` and share
//! [`grid_points`] to build the actual grid.

use bapsf_motion_core::{Result, ValidationError};
use ndarray::{Array1, ArrayD, IxDyn};
use serde::Deserialize;
use tracing::warn;

use super::base::LayerKind;
use crate::params::{float_array, integer_array, parse_params, OneOrMany};

/// Registry tag of [`GridLayer`]
pub const GRID: &str = "grid";

/// Registry tag of [`GridCNStepLayer`]
pub const GRID_CN_STEP: &str = "grid_CNStep";

/// Cartesian grid over `limits` with `npoints` points per axis.
///
/// Axis `i` varies along dimension `i` of the output and the trailing
/// dimension holds the coordinates, so the shape is `(n_1, ..., n_N, N)`.
/// An axis whose limits are equal collapses to a single point.
pub fn grid_points(limits: &[[f64; 2]], npoints: &[usize]) -> Result<ArrayD<f64>> {
    if limits.len() != npoints.len() {
        return Err(ValidationError::Shape {
            param: "npoints".to_string(),
            expected: format!("{} values", limits.len()),
            actual: format!("{} values", npoints.len()),
        }
        .into());
    }

    let axes: Vec<Array1<f64>> = limits
        .iter()
        .zip(npoints)
        .map(|(&[lo, hi], &num)| {
            if lo == hi {
                Array1::from_elem(1, lo)
            } else {
                Array1::linspace(lo, hi, num)
            }
        })
        .collect();

    let ndims = axes.len();
    let mut shape: Vec<usize> = axes.iter().map(|a| a.len()).collect();
    shape.push(ndims);

    Ok(ArrayD::from_shape_fn(IxDyn(&shape), |index| {
        let axis = index[ndims];
        axes[axis][index[axis]]
    }))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LimitsParam {
    Pair([f64; 2]),
    Pairs(Vec<[f64; 2]>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridParams {
    limits: LimitsParam,
    npoints: OneOrMany<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridCNStepParams {
    center: OneOrMany<f64>,
    npoints: OneOrMany<usize>,
    step_size: OneOrMany<f64>,
}

fn check_npoints(npoints: &[usize]) -> Result<()> {
    if npoints.iter().any(|&n| n == 0) {
        return Err(ValidationError::invalid(
            "npoints",
            format!("all entries must be positive integers, got {npoints:?}"),
        )
        .into());
    }
    Ok(())
}

/// Grid layer defined by per-axis limits
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayer {
    limits: Vec<[f64; 2]>,
    npoints: Vec<usize>,
}

impl GridLayer {
    /// `limits` and `npoints` hold one entry per axis, or a single entry
    /// broadcast to all `ndims` axes.
    pub fn new(ndims: usize, limits: &[[f64; 2]], npoints: &[usize]) -> Result<Self> {
        if ndims == 0 {
            return Err(ValidationError::invalid(GRID, "the motion space has no axes").into());
        }
        let limits = OneOrMany::Many(limits.to_vec()).broadcast("limits", ndims)?;
        let npoints = OneOrMany::Many(npoints.to_vec()).broadcast("npoints", ndims)?;
        check_npoints(&npoints)?;

        let mut sorted = Vec::with_capacity(ndims);
        for [a, b] in limits {
            if !(a.is_finite() && b.is_finite()) {
                return Err(ValidationError::invalid("limits", "all limits must be finite").into());
            }
            if a == b {
                return Err(ValidationError::invalid(
                    "limits",
                    format!("limits [{a}, {b}] span a zero length axis"),
                )
                .into());
            }
            sorted.push([a.min(b), a.max(b)]);
        }

        Ok(Self {
            limits: sorted,
            npoints,
        })
    }

    /// Build from a `grid` configuration table.
    ///
    /// The deprecated `steps` key is accepted in place of `npoints`.
    pub fn from_config(ndims: usize, params: &toml::Table) -> Result<Self> {
        let mut params = params.clone();
        if let Some(steps) = params.remove("steps") {
            if params.contains_key("npoints") {
                return Err(ValidationError::invalid(
                    GRID,
                    "'steps' is a deprecated alias of 'npoints', give only one of them",
                )
                .into());
            }
            warn!("The grid layer 'steps' parameter is deprecated, use 'npoints' instead");
            params.insert("npoints".into(), steps);
        }

        let parsed: GridParams = parse_params(GRID, &params)?;
        let limits = match parsed.limits {
            LimitsParam::Pair(pair) => vec![pair],
            LimitsParam::Pairs(pairs) => pairs,
        };
        let npoints = parsed.npoints.broadcast("npoints", ndims)?;
        Self::new(ndims, &limits, &npoints)
    }

    pub fn limits(&self) -> &[[f64; 2]] {
        &self.limits
    }

    pub fn npoints(&self) -> &[usize] {
        &self.npoints
    }
}

impl LayerKind for GridLayer {
    fn layer_type(&self) -> &'static str {
        GRID
    }

    fn ndims(&self) -> usize {
        self.limits.len()
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), GRID.into());
        config.insert(
            "limits".into(),
            toml::Value::Array(self.limits.iter().map(|pair| float_array(pair)).collect()),
        );
        config.insert("npoints".into(), integer_array(&self.npoints));
        config
    }

    fn generate(&self) -> Result<ArrayD<f64>> {
        grid_points(&self.limits, &self.npoints)
    }
}

/// Grid layer defined by its center, point count and step size
#[derive(Debug, Clone, PartialEq)]
pub struct GridCNStepLayer {
    center: Vec<f64>,
    npoints: Vec<usize>,
    step_size: Vec<f64>,
}

impl GridCNStepLayer {
    pub fn new(ndims: usize, center: &[f64], npoints: &[usize], step_size: &[f64]) -> Result<Self> {
        if ndims == 0 {
            return Err(ValidationError::invalid(GRID_CN_STEP, "the motion space has no axes").into());
        }
        if center.len() != ndims {
            return Err(ValidationError::Shape {
                param: "center".to_string(),
                expected: format!("{ndims} values"),
                actual: format!("{} values", center.len()),
            }
            .into());
        }
        let npoints = OneOrMany::Many(npoints.to_vec()).broadcast("npoints", ndims)?;
        let step_size = OneOrMany::Many(step_size.to_vec()).broadcast("step_size", ndims)?;
        check_npoints(&npoints)?;

        if center.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::invalid("center", "all values must be finite").into());
        }
        if step_size.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ValidationError::invalid(
                "step_size",
                format!("all values must be finite and non-negative, got {step_size:?}"),
            )
            .into());
        }

        Ok(Self {
            center: center.to_vec(),
            npoints,
            step_size,
        })
    }

    pub fn from_config(ndims: usize, params: &toml::Table) -> Result<Self> {
        let parsed: GridCNStepParams = parse_params(GRID_CN_STEP, params)?;
        let center = match parsed.center {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        };
        let npoints = parsed.npoints.broadcast("npoints", ndims)?;
        let step_size = parsed.step_size.broadcast("step_size", ndims)?;
        Self::new(ndims, &center, &npoints, &step_size)
    }

    /// Limits `center ± (npoints - 1) * step_size / 2` of each axis
    pub fn limits(&self) -> Vec<[f64; 2]> {
        self.center
            .iter()
            .zip(&self.npoints)
            .zip(&self.step_size)
            .map(|((&center, &num), &step)| {
                let half_span = 0.5 * (num - 1) as f64 * step;
                [center - half_span, center + half_span]
            })
            .collect()
    }
}

impl LayerKind for GridCNStepLayer {
    fn layer_type(&self) -> &'static str {
        GRID_CN_STEP
    }

    fn ndims(&self) -> usize {
        self.center.len()
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), GRID_CN_STEP.into());
        config.insert("center".into(), float_array(&self.center));
        config.insert("npoints".into(), integer_array(&self.npoints));
        config.insert("step_size".into(), float_array(&self.step_size));
        config
    }

    fn generate(&self) -> Result<ArrayD<f64>> {
        grid_points(&self.limits(), &self.npoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_grid_corner_points() {
        let layer = GridLayer::new(2, &[[0.0, 10.0], [0.0, 20.0]], &[2, 2]).unwrap();
        let points = layer.generate().unwrap();
        assert_eq!(points.shape(), &[2, 2, 2]);

        let flat: Vec<f64> = points.iter().copied().collect();
        assert_eq!(flat, vec![0.0, 0.0, 0.0, 20.0, 10.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_degenerate_axis_collapses() {
        let points = grid_points(&[[5.0, 5.0], [0.0, 10.0]], &[4, 3]).unwrap();
        assert_eq!(points.shape(), &[1, 3, 2]);
        let xs: Vec<f64> = points.iter().step_by(2).copied().collect();
        assert_eq!(xs, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_grid_rejects_degenerate_limits() {
        assert!(GridLayer::new(2, &[[5.0, 5.0], [0.0, 10.0]], &[2, 2]).is_err());
    }

    #[test]
    fn test_limits_are_sorted_and_broadcast() {
        let layer = GridLayer::from_config(2, &table("type = \"grid\"\nlimits = [10, -10]\nnpoints = 5")).unwrap();
        assert_eq!(layer.limits(), &[[-10.0, 10.0], [-10.0, 10.0]]);
        assert_eq!(layer.npoints(), &[5, 5]);
    }

    #[test]
    fn test_steps_alias() {
        let layer = GridLayer::from_config(
            2,
            &table("limits = [[0, 30], [-30, 30]]\nsteps = [11, 21]"),
        )
        .unwrap();
        assert_eq!(layer.npoints(), &[11, 21]);

        let both = table("limits = [0, 1]\nsteps = 2\nnpoints = 2");
        assert!(GridLayer::from_config(2, &both).is_err());
    }

    #[test]
    fn test_invalid_grid_inputs() {
        assert!(GridLayer::new(2, &[[0.0, 1.0]], &[0]).is_err());
        assert!(GridLayer::new(2, &[[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]], &[2]).is_err());
        assert!(GridLayer::from_config(2, &table("limits = [[0, 1], [0, 1]]\nnpoints = -2")).is_err());
        assert!(GridLayer::from_config(2, &table("limits = \"wide\"\nnpoints = 2")).is_err());
        assert!(GridLayer::from_config(2, &table("limits = [0, 1]\nnpoints = 2\nspacing = 1")).is_err());
    }

    #[test]
    fn test_center_step_matches_limits() {
        let cn = GridCNStepLayer::new(2, &[0.0, 0.0], &[3, 3], &[1.0, 1.0]).unwrap();
        let grid = GridLayer::new(2, &[[-1.0, 1.0], [-1.0, 1.0]], &[3, 3]).unwrap();
        assert_eq!(cn.generate().unwrap(), grid.generate().unwrap());
    }

    #[test]
    fn test_center_step_single_point_axis() {
        let cn = GridCNStepLayer::from_config(
            2,
            &table("type = \"grid_CNStep\"\ncenter = [2, -3]\nnpoints = [1, 5]\nstep_size = 0.5"),
        )
        .unwrap();
        assert_eq!(cn.limits(), vec![[2.0, 2.0], [-4.0, -2.0]]);
        assert_eq!(cn.generate().unwrap().shape(), &[1, 5, 2]);
    }

    #[test]
    fn test_center_step_rejects_limits() {
        let params = table("center = [0, 0]\nnpoints = 3\nstep_size = 1\nlimits = [0, 1]");
        assert!(GridCNStepLayer::from_config(2, &params).is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let layer = GridLayer::new(2, &[[0.0, 30.0], [-30.0, 30.0]], &[11, 21]).unwrap();
        let rebuilt = GridLayer::from_config(2, &layer.config()).unwrap();
        assert_eq!(rebuilt, layer);
    }
}
