//! Exclusion layers, regions of the motion space the probe may not enter

pub mod base;
pub mod circular;
pub mod divider;
pub mod lapd;
pub mod registry;

pub use base::{ExclusionKind, ExclusionLayer, EXCLUSION_PREFIX};
pub use circular::{CircleRegion, CircularExclusion, CIRCLE};
pub use divider::{DividerExclusion, DividerSide, DIVIDER};
pub use lapd::{LaPDXYExclusion, LaPDXYExclusionParams, PortLocation, LAPD_XY_EXCLUSION};
pub use registry::{exclusion_factory, exclusion_registry, ExclusionFactory, ExclusionRegistry};
