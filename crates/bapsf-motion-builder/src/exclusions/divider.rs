//! Half-plane exclusion bounded by a straight line

use bapsf_motion_core::{Result, ValidationError};
use ndarray::ArrayD;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::base::{require_planar, ExclusionKind};
use crate::params::parse_params;
use crate::space::MotionSpace;

/// Registry tag of [`DividerExclusion`]
pub const DIVIDER: &str = "divider";

/// Side of the dividing line that is excluded.
///
/// `PlusE1` excludes points above the line (larger `e1`), `PlusE0`
/// points to its right (larger `e0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DividerSide {
    PlusE0,
    MinusE0,
    PlusE1,
    MinusE1,
}

impl DividerSide {
    fn along_e0(self) -> bool {
        matches!(self, Self::PlusE0 | Self::MinusE0)
    }
}

impl FromStr for DividerSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "+e0" | "e0" => Ok(Self::PlusE0),
            "-e0" => Ok(Self::MinusE0),
            "+e1" | "e1" => Ok(Self::PlusE1),
            "-e1" => Ok(Self::MinusE1),
            other => Err(ValidationError::invalid(
                "exclude",
                format!("expected one of '+e0', '-e0', '+e1', '-e1', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for DividerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PlusE0 => "+e0",
            Self::MinusE0 => "-e0",
            Self::PlusE1 => "+e1",
            Self::MinusE1 => "-e1",
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DividerParams {
    mb: [toml::Value; 2],
    exclude: String,
}

/// Excludes everything on one side of the line `e1 = m * e0 + b`.
///
/// An infinite slope describes the vertical line `e0 = b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividerExclusion {
    slope: f64,
    intercept: f64,
    exclude: DividerSide,
}

impl DividerExclusion {
    pub fn new(slope: f64, intercept: f64, exclude: DividerSide) -> Result<Self> {
        if slope.is_nan() || !intercept.is_finite() {
            return Err(ValidationError::invalid(
                "mb",
                format!("[{slope}, {intercept}] is not a valid line"),
            )
            .into());
        }
        if slope.is_infinite() && !exclude.along_e0() {
            return Err(ValidationError::invalid(
                "exclude",
                format!("a vertical divider can not exclude '{exclude}'"),
            )
            .into());
        }
        if slope == 0.0 && exclude.along_e0() {
            return Err(ValidationError::invalid(
                "exclude",
                format!("a horizontal divider can not exclude '{exclude}'"),
            )
            .into());
        }
        Ok(Self {
            slope,
            intercept,
            exclude,
        })
    }

    pub fn from_config(space: &MotionSpace, params: &toml::Table) -> Result<Self> {
        require_planar(DIVIDER, space)?;
        let parsed: DividerParams = parse_params(DIVIDER, params)?;
        let [slope, intercept] = parsed.mb.map(|v| number(&v));
        Self::new(slope?, intercept?, parsed.exclude.parse()?)
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn exclude(&self) -> DividerSide {
        self.exclude
    }

    fn allows(&self, e0: f64, e1: f64) -> bool {
        if self.exclude.along_e0() {
            let line_e0 = if self.slope.is_infinite() {
                self.intercept
            } else {
                (e1 - self.intercept) / self.slope
            };
            match self.exclude {
                DividerSide::PlusE0 => e0 <= line_e0,
                _ => e0 >= line_e0,
            }
        } else {
            let line_e1 = self.slope * e0 + self.intercept;
            match self.exclude {
                DividerSide::PlusE1 => e1 <= line_e1,
                _ => e1 >= line_e1,
            }
        }
    }
}

/// Accepts integers, floats and the strings `"inf"`/`"-inf"`
fn number(value: &toml::Value) -> Result<f64> {
    match value {
        toml::Value::Integer(i) => Ok(*i as f64),
        toml::Value::Float(f) => Ok(*f),
        toml::Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ValidationError::invalid("mb", format!("'{s}' is not a number")).into()),
        other => Err(ValidationError::invalid("mb", format!("expected a number, got {}", other.type_str())).into()),
    }
}

impl ExclusionKind for DividerExclusion {
    fn exclusion_type(&self) -> &'static str {
        DIVIDER
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), DIVIDER.into());
        config.insert(
            "mb".into(),
            toml::Value::Array(vec![self.slope.into(), self.intercept.into()]),
        );
        config.insert("exclude".into(), self.exclude.to_string().into());
        config
    }

    fn generate(&self, space: &MotionSpace) -> Result<ArrayD<bool>> {
        require_planar(DIVIDER, space)?;
        Ok(space.map_cells(|p| self.allows(p[0], p[1])))
    }
}
