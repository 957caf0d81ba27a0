//! Circular exclusion

use bapsf_motion_core::{Result, ValidationError};
use ndarray::ArrayD;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::base::{require_planar, ExclusionKind};
use crate::params::{float_array, parse_params};
use crate::space::MotionSpace;

/// Registry tag of [`CircularExclusion`]
pub const CIRCLE: &str = "circle";

/// Which side of the circle is excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircleRegion {
    #[default]
    Outside,
    Inside,
}

impl FromStr for CircleRegion {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "outside" => Ok(Self::Outside),
            "inside" => Ok(Self::Inside),
            other => Err(ValidationError::invalid(
                "exclude",
                format!("expected 'outside' or 'inside', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for CircleRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Outside => "outside",
            Self::Inside => "inside",
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CircleParams {
    radius: f64,
    #[serde(default)]
    center: [f64; 2],
    #[serde(default = "default_exclude")]
    exclude: String,
}

fn default_exclude() -> String {
    CircleRegion::Outside.to_string()
}

/// Excludes the inside or the outside of a circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularExclusion {
    radius: f64,
    center: [f64; 2],
    exclude: CircleRegion,
}

impl CircularExclusion {
    pub fn new(radius: f64, center: [f64; 2], exclude: CircleRegion) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ValidationError::invalid("radius", format!("must be a positive number, got {radius}")).into());
        }
        if !center.iter().all(|v| v.is_finite()) {
            return Err(ValidationError::invalid("center", "values must be finite").into());
        }
        Ok(Self {
            radius,
            center,
            exclude,
        })
    }

    pub fn from_config(space: &MotionSpace, params: &toml::Table) -> Result<Self> {
        require_planar(CIRCLE, space)?;
        let parsed: CircleParams = parse_params(CIRCLE, params)?;
        Self::new(parsed.radius, parsed.center, parsed.exclude.parse()?)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn exclude(&self) -> CircleRegion {
        self.exclude
    }
}

impl ExclusionKind for CircularExclusion {
    fn exclusion_type(&self) -> &'static str {
        CIRCLE
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), CIRCLE.into());
        config.insert("radius".into(), self.radius.into());
        config.insert("center".into(), float_array(&self.center));
        config.insert("exclude".into(), self.exclude.to_string().into());
        config
    }

    fn generate(&self, space: &MotionSpace) -> Result<ArrayD<bool>> {
        require_planar(CIRCLE, space)?;
        let [cx, cy] = self.center;
        Ok(space.map_cells(|p| {
            let inside = (p[0] - cx).hypot(p[1] - cy) <= self.radius;
            match self.exclude {
                CircleRegion::Outside => inside,
                CircleRegion::Inside => !inside,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::base::ExclusionLayer;

    #[test]
    fn test_outside_excluded() {
        let space = MotionSpace::lapd_xy();
        let ex = ExclusionLayer::detached(Box::new(
            CircularExclusion::new(20.0, [0.0, 0.0], CircleRegion::Outside).unwrap(),
        ));
        assert!(!ex.is_excluded(&space, &[10.0, 10.0]).unwrap());
        assert!(ex.is_excluded(&space, &[30.0, 0.0]).unwrap());
    }

    #[test]
    fn test_inside_excluded_with_offset_center() {
        let space = MotionSpace::lapd_xy();
        let params: toml::Table =
            toml::from_str("radius = 5\ncenter = [20, -20]\nexclude = \"inside\"").unwrap();
        let ex = ExclusionLayer::detached(Box::new(CircularExclusion::from_config(&space, &params).unwrap()));
        assert!(ex.is_excluded(&space, &[21.0, -19.0]).unwrap());
        assert!(!ex.is_excluded(&space, &[0.0, 0.0]).unwrap());
    }

    #[test]
    fn test_invalid_inputs() {
        let space = MotionSpace::lapd_xy();
        assert!(CircularExclusion::new(-1.0, [0.0, 0.0], CircleRegion::Outside).is_err());
        let params: toml::Table = toml::from_str("radius = 5\nexclude = \"above\"").unwrap();
        assert!(CircularExclusion::from_config(&space, &params).is_err());
    }
}
