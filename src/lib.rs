//! # BaPSF Motion
//!
//! Probe drive motion control for the Large Plasma Device (LaPD):
//! - Applied Motion stepper drives over TCP with a status heartbeat
//! - Physical units with step and revolution equivalencies per axis
//! - Coordinate transforms between motion space and drive space
//! - Motion lists built from point layers and exclusion masks
//! - TOML run configurations
//!
//! ## Architecture
//!
//! The workspace is split into several crates:
//!
//! 1. **bapsf-motion-core** - Errors, units, motor status and status events
//! 2. **bapsf-motion-communication** - Framed transport, connectors, the Applied Motion driver
//! 3. **bapsf-motion-transform** - Coordinate transforms and their registry
//! 4. **bapsf-motion-builder** - Motion space, point layers, exclusions and the motion builder
//! 5. **bapsf-motion-settings** - Run configuration
//! 6. **bapsf-motion-actors** - Axis, drive, motion group and run manager
//! 7. **bapsf-motion** - This crate, re-exports plus the command line binary

pub use bapsf_motion_core::{
    ConnectionError, EquivalenceTable, Error, LookupError, MotorStatus, ProtocolError, Quantity,
    Result, Unit, UsageError, ValidationError,
};

pub use bapsf_motion_communication::{
    Connector, Motor, MotorSettings, SimulatedBench, SimulatedDrive, TcpConnector,
};

pub use bapsf_motion_transform::{transform_factory, CoordinateTransform, Direction};

pub use bapsf_motion_builder::{MotionBuilder, MotionSpace};

pub use bapsf_motion_settings::{MotionGroupConfig, RunConfig, SettingsError};

pub use bapsf_motion_actors::{ActorError, Axis, Drive, MotionGroup, RunManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging to stdout.
///
/// `RUST_LOG` selects the filter, `info` when unset.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
