//! Motion group: one drive, its transform and its motion builder
//!
//! Callers work in motion space. The group checks requested points against
//! the exclusion mask, converts them to drive coordinates and forwards them
//! to the drive.

use bapsf_motion_builder::MotionBuilder;
use bapsf_motion_communication::{Connector, MotorSettings, TcpConnector};
use bapsf_motion_core::{Result, ValidationError};
use bapsf_motion_settings::MotionGroupConfig;
use bapsf_motion_transform::{transform_factory, CoordinateTransform};
use std::sync::Arc;
use tracing::{debug, info};

use crate::drive::Drive;
use crate::error::ActorResult;

#[derive(Debug)]
pub struct MotionGroup {
    config: MotionGroupConfig,
    drive: Drive,
    transform: Box<dyn CoordinateTransform>,
    mb: MotionBuilder,
}

impl MotionGroup {
    pub fn new(config: MotionGroupConfig) -> ActorResult<Self> {
        Self::with_connector(config, MotorSettings::default(), Arc::new(TcpConnector))
    }

    /// Build the transform and motion builder, then connect the drive.
    ///
    /// Geometry errors are reported before any motor connection is opened.
    pub fn with_connector(
        config: MotionGroupConfig,
        settings: MotorSettings,
        connector: Arc<dyn Connector>,
    ) -> ActorResult<Self> {
        config.validate()?;
        let naxes = config.drive.axes.len();
        let transform = transform_factory(naxes, &config.transform.as_table())?;
        let mb = MotionBuilder::from_config(&config.motion_builder)?;
        if mb.space().ndims() != naxes {
            return Err(ValidationError::Shape {
                param: format!("{}.motion_builder.space", config.name),
                expected: format!("{naxes} dimensions to match the drive"),
                actual: format!("{} dimensions", mb.space().ndims()),
            }
            .into());
        }

        let drive = Drive::with_connector(&config.drive, settings, connector)?;
        info!(motion_group = %config.name, transform = transform.transform_type(), "Motion group ready");
        Ok(Self {
            config,
            drive,
            transform,
            mb,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &MotionGroupConfig {
        &self.config
    }

    pub fn drive(&self) -> &Drive {
        &self.drive
    }

    pub fn transform(&self) -> &dyn CoordinateTransform {
        self.transform.as_ref()
    }

    pub fn mb(&self) -> &MotionBuilder {
        &self.mb
    }

    pub fn mb_mut(&mut self) -> &mut MotionBuilder {
        &mut self.mb
    }

    /// Move the probe to a motion space point
    pub fn move_to(&self, point: &[f64]) -> Result<()> {
        if self.mb.is_excluded(point)? {
            return Err(ValidationError::ExcludedPoint {
                point: point.to_vec(),
            }
            .into());
        }
        let drive_point = self.transform.point_to_drive(point)?;
        debug!(motion_group = %self.config.name, ?point, ?drive_point, "Motion group move");
        self.drive.move_to(&drive_point)
    }

    /// Move to entry `index` of the motion list
    pub fn move_ml(&mut self, index: usize) -> Result<()> {
        let point = {
            let ml = self.mb.motion_list()?.ok_or_else(|| {
                ValidationError::invalid("motion list", "no motion layers are defined")
            })?;
            if index >= ml.nrows() {
                return Err(ValidationError::invalid(
                    "index",
                    format!("{index} is out of range for a motion list of {} points", ml.nrows()),
                )
                .into());
            }
            ml.row(index).to_vec()
        };
        self.move_to(&point)
    }

    /// Probe position in motion space
    pub fn position(&self) -> Result<Vec<f64>> {
        let drive_point = self.drive.position()?;
        self.transform.point_to_motion_space(&drive_point)
    }

    pub fn stop(&self) -> Result<()> {
        self.drive.stop()
    }

    pub fn is_moving(&self) -> bool {
        self.drive.is_moving()
    }

    /// Start every motor heartbeat
    pub fn run(&self) -> Result<()> {
        self.drive.run()
    }

    /// Stop every heartbeat and close the connections
    pub fn terminate(&self) {
        self.drive.stop_running();
        info!(motion_group = %self.config.name, "Motion group terminated");
    }
}
