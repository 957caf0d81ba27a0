//! A probe drive, a named set of axes moved together

use bapsf_motion_communication::{Connector, MotorSettings, TcpConnector};
use bapsf_motion_core::{Result, ValidationError};
use bapsf_motion_settings::DriveConfig;
use std::sync::Arc;
use tracing::{info, warn};

use crate::axis::Axis;
use crate::error::ActorResult;

#[derive(Debug)]
pub struct Drive {
    name: String,
    axes: Vec<Axis>,
}

impl Drive {
    pub fn new(config: &DriveConfig) -> ActorResult<Self> {
        Self::with_connector(config, MotorSettings::default(), Arc::new(TcpConnector))
    }

    /// Connect every axis through `connector`
    pub fn with_connector(
        config: &DriveConfig,
        settings: MotorSettings,
        connector: Arc<dyn Connector>,
    ) -> ActorResult<Self> {
        config.validate()?;
        let axes = config
            .axes
            .iter()
            .map(|axis| Axis::with_connector(axis, settings.clone(), Arc::clone(&connector)))
            .collect::<ActorResult<Vec<_>>>()?;
        info!(drive = %config.name, naxes = axes.len(), "Drive ready");
        Ok(Self {
            name: config.name.clone(),
            axes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn naxes(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name() == name)
    }

    /// Move each axis to its component of `point`, in axis units
    pub fn move_to(&self, point: &[f64]) -> Result<()> {
        if point.len() != self.axes.len() {
            return Err(ValidationError::Shape {
                param: "point".to_string(),
                expected: format!("{} values", self.axes.len()),
                actual: format!("{} values", point.len()),
            }
            .into());
        }
        for (axis, value) in self.axes.iter().zip(point) {
            axis.move_to(*value, axis.units())?;
        }
        Ok(())
    }

    /// Position of every axis, in axis units
    pub fn position(&self) -> Result<Vec<f64>> {
        self.axes
            .iter()
            .map(|axis| axis.position().map(|q| q.value))
            .collect()
    }

    /// Stop every axis, reporting the first failure after trying them all
    pub fn stop(&self) -> Result<()> {
        let mut first_err = None;
        for axis in &self.axes {
            if let Err(err) = axis.stop() {
                warn!(axis = axis.name(), "Failed to stop axis: {}", err);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn is_moving(&self) -> bool {
        self.axes.iter().any(Axis::is_moving)
    }

    pub fn run(&self) -> Result<()> {
        self.axes.iter().try_for_each(Axis::run)
    }

    pub fn stop_running(&self) {
        self.axes.iter().for_each(Axis::stop_running);
    }
}
