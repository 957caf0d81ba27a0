//! A single motorized axis
//!
//! An [`Axis`] owns one [`Motor`] and translates between the axis' physical
//! units and the motor-native steps and revolutions.

use bapsf_motion_communication::{command, Connector, Motor, MotorSettings, Reply, TcpConnector};
use bapsf_motion_core::{
    conversion_pairs, EquivalenceTable, MotorStatus, Quantity, Result, Unit, ValidationError,
};
use bapsf_motion_settings::AxisConfig;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ActorResult;

/// One motor plus its physical unit conventions
#[derive(Debug)]
pub struct Axis {
    name: String,
    motor: Motor,
    units: Unit,
    /// Axis units per motor revolution
    units_per_rev: f64,
}

impl Axis {
    /// Connect to the axis motor over TCP
    pub fn new(config: &AxisConfig) -> ActorResult<Self> {
        Self::with_connector(config, MotorSettings::default(), Arc::new(TcpConnector))
    }

    pub fn with_connector(
        config: &AxisConfig,
        settings: MotorSettings,
        connector: Arc<dyn Connector>,
    ) -> ActorResult<Self> {
        config.validate()?;
        let motor = Motor::with_connector(config.name.clone(), config.ip.clone(), settings, connector)?;
        info!(axis = %config.name, ip = %config.ip, units = %config.units, "Axis connected");
        Ok(Self {
            name: config.name.clone(),
            motor,
            units: config.units,
            units_per_rev: config.units_per_rev,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip(&self) -> &str {
        self.motor.ip()
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn units(&self) -> Unit {
        self.units
    }

    /// Axis units travelled per motor revolution
    pub fn units_per_rev(&self) -> f64 {
        self.units_per_rev
    }

    /// Motor steps per revolution, as reported by the drive
    pub fn steps_per_rev(&self) -> Result<f64> {
        self.motor.steps_per_rev().ok_or_else(|| {
            ValidationError::invalid(
                format!("{}.steps_per_rev", self.name),
                "the drive did not report its gearing",
            )
            .into()
        })
    }

    /// Relations between steps, revolutions and the axis units
    pub fn equivalencies(&self) -> Result<EquivalenceTable> {
        EquivalenceTable::for_axis(self.steps_per_rev()?, self.units_per_rev, self.units)
    }

    /// Motor-native units paired with the matching axis units
    pub fn conversion_pairs(&self) -> Vec<(Unit, Unit)> {
        conversion_pairs(self.units)
    }

    fn axis_unit_for(&self, motor_unit: &Unit) -> Option<Unit> {
        self.conversion_pairs()
            .into_iter()
            .find(|(motor, _)| motor == motor_unit)
            .map(|(_, axis)| axis)
    }

    /// Send a motor command with the argument and reply in axis units.
    ///
    /// Commands without a motor-native unit pass through unchanged.
    pub fn send_command(&self, name: &str, arg: Option<f64>) -> Result<Reply> {
        let spec = command(name)?;
        let equivalencies = self.equivalencies()?;

        let arg = match (arg, spec.units) {
            (Some(value), Some(motor_unit)) => match self.axis_unit_for(&motor_unit) {
                Some(axis_unit) => Some(equivalencies.convert(value, &axis_unit, &motor_unit)?),
                None => Some(value),
            },
            (arg, _) => arg,
        };

        match self.motor.send_command(name, arg)? {
            Reply::Quantity(quantity) => match self.axis_unit_for(&quantity.unit) {
                Some(axis_unit) => Ok(Reply::Quantity(quantity.to(axis_unit, &equivalencies)?)),
                None => Ok(Reply::Quantity(quantity)),
            },
            reply => Ok(reply),
        }
    }

    /// Move to `value` given in `unit`, any unit convertible to steps
    pub fn move_to(&self, value: f64, unit: Unit) -> Result<()> {
        let steps = Quantity::new(value, unit).to(Unit::steps(), &self.equivalencies()?)?;
        debug!(axis = %self.name, value, %unit, steps = steps.value, "Axis move");
        self.motor.move_to(steps.value.round() as i64)
    }

    /// Current position in axis units
    pub fn position(&self) -> Result<Quantity> {
        let steps = self.motor.position()?;
        Quantity::new(steps as f64, Unit::steps()).to(self.units, &self.equivalencies()?)
    }

    /// Switch to another unit of the same physical type
    pub fn set_units(&mut self, units: Unit) -> Result<()> {
        let factor = self.units.scale_to(&units)?;
        self.units_per_rev *= factor;
        self.units = units;
        Ok(())
    }

    /// Stop the motor directly, bypassing unit handling
    pub fn stop(&self) -> Result<()> {
        self.motor.stop()
    }

    pub fn is_moving(&self) -> bool {
        self.motor.is_moving()
    }

    pub fn status(&self) -> MotorStatus {
        self.motor.status()
    }

    /// Start the motor heartbeat
    pub fn run(&self) -> Result<()> {
        self.motor.run()
    }

    /// Stop the heartbeat and close the connection
    pub fn stop_running(&self) {
        self.motor.stop_running()
    }
}
