//! # BaPSF Motion Actors
//!
//! Orchestration of the hardware: [`Axis`] wraps one motor, [`Drive`]
//! groups the axes of a probe drive, [`MotionGroup`] adds the coordinate
//! transform and motion builder, and [`RunManager`] owns every motion
//! group of a data run.

pub mod axis;
pub mod drive;
pub mod error;
pub mod motion_group;
pub mod run_manager;

pub use axis::Axis;
pub use drive::Drive;
pub use error::{ActorError, ActorResult};
pub use motion_group::MotionGroup;
pub use run_manager::RunManager;
