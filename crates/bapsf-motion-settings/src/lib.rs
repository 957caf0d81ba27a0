//! BaPSF Motion Settings Crate
//!
//! Run configuration: motion groups, drives, transforms and motion
//! builders as read from and written to TOML.

pub mod config;
pub mod error;
pub mod indexed;

pub use config::{
    AxisConfig, DriveConfig, MotionBuilderConfig, MotionGroupConfig, RunConfig, SpaceAxisConfig,
    SpaceConfig, TransformConfig, DATE_FORMAT,
};
pub use error::{SettingsError, SettingsResult};
pub use indexed::IndexedList;
