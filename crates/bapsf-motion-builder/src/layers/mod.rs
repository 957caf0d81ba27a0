//! Motion layers, generators of candidate probe positions

pub mod base;
pub mod regular_grid;
pub mod registry;

pub use base::{LayerKind, MotionLayer, LAYER_PREFIX};
pub use regular_grid::{grid_points, GridCNStepLayer, GridLayer, GRID, GRID_CN_STEP};
pub use registry::{layer_factory, layer_registry, LayerFactory, LayerRegistry};
