//! # BaPSF Motion Builder
//!
//! Describes where a probe may go and where it should go. A
//! [`MotionSpace`] holds the coordinate grid and every generated array,
//! motion layers produce candidate points, exclusion layers mask out
//! forbidden regions and [`MotionBuilder`] combines them into the motion
//! list.

pub mod core;
pub mod exclusions;
pub mod layers;
mod params;
pub mod space;

pub use crate::core::MotionBuilder;
pub use exclusions::{
    exclusion_factory, exclusion_registry, CircleRegion, CircularExclusion, DividerExclusion,
    DividerSide, ExclusionKind, ExclusionLayer, ExclusionRegistry, LaPDXYExclusion,
    LaPDXYExclusionParams, PortLocation,
};
pub use layers::{
    grid_points, layer_factory, layer_registry, GridCNStepLayer, GridLayer, LayerKind,
    LayerRegistry, MotionLayer,
};
pub use space::{MotionSpace, SpaceAxis, LAPD_XY_SPACE};
