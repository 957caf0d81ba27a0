//! LaPD chamber exclusion for XY probe drives
//!
//! The probe can not leave the chamber wall, a circle of the given
//! diameter, and when mounted through a ball valve it is further limited
//! to the cone the valve allows around the port axis.

use bapsf_motion_core::{Result, ValidationError};
use ndarray::{ArrayD, IxDyn, Zip};
use serde::Deserialize;
use tracing::debug;

use super::base::{require_planar, ExclusionKind, ExclusionLayer};
use super::circular::{CircleRegion, CircularExclusion};
use super::divider::{DividerExclusion, DividerSide};
use crate::params::parse_params;
use crate::space::MotionSpace;

/// Registry tag of [`LaPDXYExclusion`]
pub const LAPD_XY_EXCLUSION: &str = "lapd-XY";

/// Port angle in degrees for a named port
fn port_angle(token: &str) -> Option<f64> {
    match token.to_lowercase().as_str() {
        "e" | "east" => Some(0.0),
        "t" | "top" => Some(90.0),
        "w" | "west" => Some(180.0),
        "b" | "bot" | "bottom" => Some(270.0),
        _ => None,
    }
}

/// Port given as a named location or an angle in degrees
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortLocation {
    Angle(f64),
    Named(String),
}

impl PortLocation {
    /// Port angle in degrees, validated to lie in `(-180, 360)`
    pub fn degrees(&self) -> Result<f64> {
        let angle = match self {
            Self::Angle(angle) => *angle,
            Self::Named(token) => port_angle(token).ok_or_else(|| {
                ValidationError::invalid(
                    "port_location",
                    format!("unknown port '{token}', expected one of e, east, t, top, w, west, b, bot, bottom"),
                )
            })?,
        };
        if !(angle > -180.0 && angle < 360.0) {
            return Err(ValidationError::invalid(
                "port_location",
                format!("the angular port location is {angle}, expected a value between (-180, 360) degrees"),
            )
            .into());
        }
        Ok(angle)
    }

    fn to_toml(&self) -> toml::Value {
        match self {
            Self::Angle(angle) => (*angle).into(),
            Self::Named(token) => token.clone().into(),
        }
    }
}

impl Default for PortLocation {
    fn default() -> Self {
        Self::Named("E".to_string())
    }
}

/// Parameters of [`LaPDXYExclusion`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LaPDXYExclusionParams {
    /// Chamber diameter
    pub diameter: f64,
    /// Distance from the chamber center to the ball valve pivot
    pub pivot_radius: f64,
    pub port_location: PortLocation,
    /// Full opening angle of the ball valve cone, in degrees
    pub cone_full_angle: f64,
    pub include_cone: bool,
}

impl Default for LaPDXYExclusionParams {
    fn default() -> Self {
        Self {
            diameter: 100.0,
            pivot_radius: 58.771,
            port_location: PortLocation::default(),
            cone_full_angle: 80.0,
            include_cone: true,
        }
    }
}

/// Chamber wall plus optional ball valve cone
#[derive(Debug, Clone, PartialEq)]
pub struct LaPDXYExclusion {
    params: LaPDXYExclusionParams,
    port_angle: f64,
}

impl LaPDXYExclusion {
    pub fn new(mut params: LaPDXYExclusionParams) -> Result<Self> {
        if !(params.diameter.is_finite() && params.diameter != 0.0) {
            return Err(ValidationError::invalid("diameter", "must be a non-zero number").into());
        }
        if !params.pivot_radius.is_finite() {
            return Err(ValidationError::invalid("pivot_radius", "must be finite").into());
        }
        params.diameter = params.diameter.abs();
        params.pivot_radius = params.pivot_radius.abs();

        if !(params.cone_full_angle > 0.0 && params.cone_full_angle < 180.0) {
            return Err(ValidationError::invalid(
                "cone_full_angle",
                format!("expected a value between (0, 180) degrees, got {}", params.cone_full_angle),
            )
            .into());
        }
        let port_angle = params.port_location.degrees()?;

        Ok(Self { params, port_angle })
    }

    pub fn from_config(space: &MotionSpace, params: &toml::Table) -> Result<Self> {
        require_planar(LAPD_XY_EXCLUSION, space)?;
        Self::new(parse_params(LAPD_XY_EXCLUSION, params)?)
    }

    pub fn params(&self) -> &LaPDXYExclusionParams {
        &self.params
    }

    /// Resolved port angle in degrees
    pub fn port_angle(&self) -> f64 {
        self.port_angle
    }

    /// The primitive exclusions this one is made of, rebuilt on every call
    pub fn composed_exclusions(&self) -> Result<Vec<ExclusionLayer>> {
        let wall = CircularExclusion::new(0.5 * self.params.diameter, [0.0, 0.0], CircleRegion::Outside)?;
        let mut composed = vec![ExclusionLayer::detached(Box::new(wall))];
        if self.params.include_cone {
            for divider in self.cone_dividers()? {
                composed.push(ExclusionLayer::detached(Box::new(divider)));
            }
        }
        Ok(composed)
    }

    /// The two lines bounding the ball valve cone.
    ///
    /// Each line passes through the pivot along one edge of the cone. The
    /// excluded side is the one not holding a point just inside the port.
    fn cone_dividers(&self) -> Result<[DividerExclusion; 2]> {
        let theta = self.port_angle.to_radians();
        let alpha = 0.5 * self.params.cone_full_angle.to_radians();
        let (sin_t, cos_t) = theta.sin_cos();
        let rotate = |[x, y]: [f64; 2]| [cos_t * x - sin_t * y, sin_t * x + cos_t * y];

        let pivot = [self.params.pivot_radius * cos_t, self.params.pivot_radius * sin_t];
        let inward = rotate([-1.0, 0.0]);
        let interior = [pivot[0] + inward[0], pivot[1] + inward[1]];

        let edge = |sign: f64| -> Result<DividerExclusion> {
            let traj = rotate([-alpha.cos(), sign * alpha.sin()]);
            let (slope, intercept) = if traj[0] == 0.0 {
                (f64::INFINITY, pivot[0])
            } else {
                let slope = traj[1] / traj[0];
                (slope, pivot[1] - slope * pivot[0])
            };

            let side = if traj[0].abs() >= traj[1].abs() {
                let line_e1 = slope * interior[0] + intercept;
                if interior[1] > line_e1 {
                    DividerSide::MinusE1
                } else {
                    DividerSide::PlusE1
                }
            } else {
                let line_e0 = if slope.is_infinite() {
                    intercept
                } else {
                    (interior[1] - intercept) / slope
                };
                if interior[0] > line_e0 {
                    DividerSide::MinusE0
                } else {
                    DividerSide::PlusE0
                }
            };

            debug!(
                "Cone edge through pivot {:?}: slope {}, intercept {}, excluding {}",
                pivot, slope, intercept, side
            );
            DividerExclusion::new(slope, intercept, side)
        };

        Ok([edge(1.0)?, edge(-1.0)?])
    }
}

impl ExclusionKind for LaPDXYExclusion {
    fn exclusion_type(&self) -> &'static str {
        LAPD_XY_EXCLUSION
    }

    fn config(&self) -> toml::Table {
        let mut config = toml::Table::new();
        config.insert("type".into(), LAPD_XY_EXCLUSION.into());
        config.insert("diameter".into(), self.params.diameter.into());
        config.insert("pivot_radius".into(), self.params.pivot_radius.into());
        config.insert("port_location".into(), self.params.port_location.to_toml());
        config.insert("cone_full_angle".into(), self.params.cone_full_angle.into());
        config.insert("include_cone".into(), self.params.include_cone.into());
        config
    }

    fn generate(&self, space: &MotionSpace) -> Result<ArrayD<bool>> {
        require_planar(LAPD_XY_EXCLUSION, space)?;
        let mut mask = ArrayD::from_elem(IxDyn(&space.shape()), true);
        for exclusion in self.composed_exclusions()? {
            let part = exclusion.generate(space)?;
            Zip::from(&mut mask)
                .and(&part)
                .for_each(|allowed, &ok| *allowed = *allowed && ok);
        }
        Ok(mask)
    }
}
