//! Motion space arena
//!
//! [`MotionSpace`] owns the coordinate axes, the global mask and every
//! array produced by layers and exclusions. Items refer to their arrays by
//! name only, so removing an item can never leave a dangling array behind.

use bapsf_motion_core::{LookupError, Result, ValidationError};
use bapsf_motion_settings::{SpaceAxisConfig, SpaceConfig};
use ndarray::{Array1, ArrayD, IxDyn, Zip};
use std::collections::BTreeMap;

/// Preset name of the LaPD XY motion space
pub const LAPD_XY_SPACE: &str = "lapd_xy";

/// One coordinate axis of the motion space
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceAxis {
    label: String,
    values: Array1<f64>,
}

impl SpaceAxis {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Grid coordinates along this axis
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    fn nearest(&self, value: f64) -> usize {
        self.values
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (index, v)| {
                let distance = (v - value).abs();
                if distance < best.1 {
                    (index, distance)
                } else {
                    best
                }
            })
            .0
    }
}

/// Coordinate grid plus the named arrays built on top of it
#[derive(Debug, Clone)]
pub struct MotionSpace {
    axes: Vec<SpaceAxis>,
    mask: ArrayD<bool>,
    layers: BTreeMap<String, ArrayD<f64>>,
    exclusions: BTreeMap<String, ArrayD<bool>>,
}

impl MotionSpace {
    /// Build a space from explicit axes
    pub fn new(axes: &[SpaceAxisConfig]) -> Result<Self> {
        if axes.is_empty() {
            return Err(ValidationError::invalid("space", "at least one axis is required").into());
        }

        let mut built: Vec<SpaceAxis> = Vec::with_capacity(axes.len());
        for axis in axes {
            if built.iter().any(|a| a.label == axis.label) {
                return Err(ValidationError::invalid(
                    "space",
                    format!("axis label '{}' is used more than once", axis.label),
                )
                .into());
            }
            let [start, stop] = axis.range;
            if !(start.is_finite() && stop.is_finite()) {
                return Err(ValidationError::invalid(
                    format!("space.{}.range", axis.label),
                    "limits must be finite",
                )
                .into());
            }
            if axis.num == 0 {
                return Err(ValidationError::invalid(
                    format!("space.{}.num", axis.label),
                    "must be a positive integer",
                )
                .into());
            }

            built.push(SpaceAxis {
                label: axis.label.clone(),
                values: Array1::linspace(start.min(stop), start.max(stop), axis.num),
            });
        }

        let shape: Vec<usize> = built.iter().map(|a| a.values.len()).collect();
        Ok(Self {
            mask: ArrayD::from_elem(IxDyn(&shape), true),
            axes: built,
            layers: BTreeMap::new(),
            exclusions: BTreeMap::new(),
        })
    }

    /// The LaPD XY space, `x` and `y` over `[-55, 55]` with 221 points each
    pub fn lapd_xy() -> Self {
        let axis = |label: &str| SpaceAxis {
            label: label.to_string(),
            values: Array1::linspace(-55.0, 55.0, 221),
        };
        Self {
            axes: vec![axis("x"), axis("y")],
            mask: ArrayD::from_elem(IxDyn(&[221, 221]), true),
            layers: BTreeMap::new(),
            exclusions: BTreeMap::new(),
        }
    }

    /// Build from a configuration entry
    pub fn from_config(config: &SpaceConfig) -> Result<Self> {
        match config {
            SpaceConfig::Preset(name) if name == LAPD_XY_SPACE => Ok(Self::lapd_xy()),
            SpaceConfig::Preset(name) => Err(LookupError::UnregisteredType {
                kind: "motion space".to_string(),
                type_tag: name.clone(),
            }
            .into()),
            SpaceConfig::Axes(axes) => Self::new(axes),
        }
    }

    /// Dimensionality of the space
    pub fn ndims(&self) -> usize {
        self.axes.len()
    }

    /// Number of grid points along each axis
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.values.len()).collect()
    }

    pub fn axes(&self) -> &[SpaceAxis] {
        &self.axes
    }

    pub fn labels(&self) -> Vec<&str> {
        self.axes.iter().map(|a| a.label.as_str()).collect()
    }

    /// Evaluate `f` at the coordinates of every grid cell
    pub fn map_cells<T, F>(&self, f: F) -> ArrayD<T>
    where
        F: Fn(&[f64]) -> T,
    {
        let mut point = vec![0.0; self.ndims()];
        ArrayD::from_shape_fn(IxDyn(&self.shape()), |index| {
            for (i, axis) in self.axes.iter().enumerate() {
                point[i] = axis.values[index[i]];
            }
            f(&point)
        })
    }

    /// Index of the grid cell nearest to `point`
    pub fn nearest_index(&self, point: &[f64]) -> Result<IxDyn> {
        if point.len() != self.ndims() {
            return Err(ValidationError::Shape {
                param: "point".to_string(),
                expected: format!("{} values", self.ndims()),
                actual: format!("{} values", point.len()),
            }
            .into());
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::invalid("point", format!("{point:?} is not finite")).into());
        }

        let index: Vec<usize> = self
            .axes
            .iter()
            .zip(point)
            .map(|(axis, value)| axis.nearest(*value))
            .collect();
        Ok(IxDyn(&index))
    }

    /// Global mask, `true` where motion is allowed
    pub fn mask(&self) -> &ArrayD<bool> {
        &self.mask
    }

    /// Allow every cell again
    pub fn reset_mask(&mut self) {
        self.mask.fill(true);
    }

    /// AND `other` into the global mask
    pub fn and_mask(&mut self, other: &ArrayD<bool>) -> Result<()> {
        self.check_mask_shape(other)?;
        Zip::from(&mut self.mask)
            .and(other)
            .for_each(|global, &allowed| *global = *global && allowed);
        Ok(())
    }

    /// Whether the cell nearest to `point` is allowed by the global mask
    pub fn is_allowed(&self, point: &[f64]) -> Result<bool> {
        let index = self.nearest_index(point)?;
        Ok(self.mask[index])
    }

    pub(crate) fn check_mask_shape(&self, mask: &ArrayD<bool>) -> Result<()> {
        if mask.shape() != self.shape().as_slice() {
            return Err(ValidationError::Shape {
                param: "exclusion mask".to_string(),
                expected: format!("{:?}", self.shape()),
                actual: format!("{:?}", mask.shape()),
            }
            .into());
        }
        Ok(())
    }

    /// Lowest unused `{prefix}{N}` name
    pub fn next_name(&self, prefix: &str) -> String {
        (0..)
            .map(|n| format!("{prefix}{n}"))
            .find(|name| !self.layers.contains_key(name) && !self.exclusions.contains_key(name))
            .unwrap_or_else(|| prefix.to_string())
    }

    pub fn insert_layer(&mut self, name: impl Into<String>, points: ArrayD<f64>) {
        self.layers.insert(name.into(), points);
    }

    pub fn layer(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.layers.get(name)
    }

    pub fn remove_layer(&mut self, name: &str) -> Option<ArrayD<f64>> {
        self.layers.remove(name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.keys().map(String::as_str).collect()
    }

    pub fn insert_exclusion(&mut self, name: impl Into<String>, mask: ArrayD<bool>) -> Result<()> {
        self.check_mask_shape(&mask)?;
        self.exclusions.insert(name.into(), mask);
        Ok(())
    }

    pub fn exclusion(&self, name: &str) -> Option<&ArrayD<bool>> {
        self.exclusions.get(name)
    }

    pub fn remove_exclusion(&mut self, name: &str) -> Option<ArrayD<bool>> {
        self.exclusions.remove(name)
    }

    pub fn exclusion_names(&self) -> Vec<&str> {
        self.exclusions.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(label: &str, range: [f64; 2], num: usize) -> SpaceAxisConfig {
        SpaceAxisConfig {
            label: label.to_string(),
            range,
            num,
        }
    }

    #[test]
    fn test_lapd_xy_preset() {
        let space = MotionSpace::from_config(&SpaceConfig::Preset("lapd_xy".into())).unwrap();
        assert_eq!(space.shape(), vec![221, 221]);
        assert_eq!(space.labels(), vec!["x", "y"]);
        assert!((space.axes()[0].values()[1] - -54.5).abs() < 1e-12);
        assert!(space.mask().iter().all(|&m| m));
    }

    #[test]
    fn test_unknown_preset() {
        let err = MotionSpace::from_config(&SpaceConfig::Preset("lapd_xz".into())).unwrap_err();
        assert!(err.is_lookup_error());
    }

    #[test]
    fn test_axis_validation() {
        assert!(MotionSpace::new(&[]).is_err());
        assert!(MotionSpace::new(&[axis("x", [0.0, 1.0], 0)]).is_err());
        assert!(MotionSpace::new(&[axis("x", [0.0, 1.0], 2), axis("x", [0.0, 1.0], 2)]).is_err());
    }

    #[test]
    fn test_nearest_index() {
        let space = MotionSpace::new(&[axis("x", [0.0, 10.0], 11), axis("y", [-1.0, 1.0], 3)]).unwrap();
        assert_eq!(space.nearest_index(&[3.2, 0.9]).unwrap(), IxDyn(&[3, 2]));
        assert_eq!(space.nearest_index(&[-50.0, -50.0]).unwrap(), IxDyn(&[0, 0]));
        assert!(space.nearest_index(&[1.0]).is_err());
        assert!(space.nearest_index(&[f64::NAN, 0.0]).is_err());
    }

    #[test]
    fn test_map_cells_and_mask() {
        let mut space = MotionSpace::new(&[axis("x", [0.0, 2.0], 3), axis("y", [0.0, 1.0], 2)]).unwrap();
        let left_part = space.map_cells(|p| p[0] < 1.5);
        assert_eq!(left_part.shape(), &[3, 2]);

        space.and_mask(&left_part).unwrap();
        assert!(space.is_allowed(&[0.0, 1.0]).unwrap());
        assert!(!space.is_allowed(&[2.0, 0.0]).unwrap());

        space.reset_mask();
        assert!(space.is_allowed(&[2.0, 0.0]).unwrap());
    }

    #[test]
    fn test_next_name_fills_gaps() {
        let mut space = MotionSpace::lapd_xy();
        assert_eq!(space.next_name("mask_ex"), "mask_ex0");
        space.insert_exclusion("mask_ex0", space.map_cells(|_| true)).unwrap();
        space.insert_exclusion("mask_ex1", space.map_cells(|_| true)).unwrap();
        space.remove_exclusion("mask_ex0");
        assert_eq!(space.next_name("mask_ex"), "mask_ex0");
        assert_eq!(space.next_name("point_layer"), "point_layer0");
    }
}
