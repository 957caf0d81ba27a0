//! # BaPSF Motion Transform
//!
//! Coordinate transforms between motion space (physical probe position)
//! and drive space (actuator coordinates). Variants are looked up by their
//! configuration `type` tag through [`registry`].

pub mod base;
pub mod identity;
pub mod lapd;
pub mod registry;

pub use base::{convert, validate_matrix_shape, CoordinateTransform, Direction};
pub use identity::{IdentityTransform, IDENTITY};
pub use lapd::{LaPDXYParams, LaPDXYTransform, LAPD_XY};
pub use registry::{registry, transform_factory, TransformFactory, TransformRegistry};
