//! Motor status snapshot
//!
//! The status flags are independent booleans decoded from the controller's
//! status letters, not a single mutually exclusive state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of one motor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket open
    #[default]
    Disconnected,
    /// Dialling the controller
    Connecting,
    /// Socket open and usable
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Names of the individual [`MotorStatus`] fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    Connected,
    Position,
    Alarm,
    Enabled,
    Fault,
    Moving,
    Homing,
    Jogging,
    MotionInProgress,
    InPosition,
    Stopping,
    Waiting,
    AlarmMessage,
}

impl StatusField {
    /// Field name as used in logs and serialized status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Position => "position",
            Self::Alarm => "alarm",
            Self::Enabled => "enabled",
            Self::Fault => "fault",
            Self::Moving => "moving",
            Self::Homing => "homing",
            Self::Jogging => "jogging",
            Self::MotionInProgress => "motion_in_progress",
            Self::InPosition => "in_position",
            Self::Stopping => "stopping",
            Self::Waiting => "waiting",
            Self::AlarmMessage => "alarm_message",
        }
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single motor as last seen by its driver
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotorStatus {
    pub connected: bool,
    /// Last read position in motor steps
    pub position: Option<i64>,
    pub alarm: bool,
    pub enabled: bool,
    pub fault: bool,
    pub moving: bool,
    pub homing: bool,
    pub jogging: bool,
    pub motion_in_progress: bool,
    pub in_position: bool,
    pub stopping: bool,
    pub waiting: bool,
    /// Decoded alarm text, empty when no known alarm is active
    pub alarm_message: Option<String>,
}

impl MotorStatus {
    /// Fields whose values differ between `self` and `other`
    pub fn changed_fields(&self, other: &MotorStatus) -> Vec<StatusField> {
        let mut changed = Vec::new();
        let mut check = |differs: bool, field: StatusField| {
            if differs {
                changed.push(field);
            }
        };

        check(self.connected != other.connected, StatusField::Connected);
        check(self.position != other.position, StatusField::Position);
        check(self.alarm != other.alarm, StatusField::Alarm);
        check(self.enabled != other.enabled, StatusField::Enabled);
        check(self.fault != other.fault, StatusField::Fault);
        check(self.moving != other.moving, StatusField::Moving);
        check(self.homing != other.homing, StatusField::Homing);
        check(self.jogging != other.jogging, StatusField::Jogging);
        check(
            self.motion_in_progress != other.motion_in_progress,
            StatusField::MotionInProgress,
        );
        check(self.in_position != other.in_position, StatusField::InPosition);
        check(self.stopping != other.stopping, StatusField::Stopping);
        check(self.waiting != other.waiting, StatusField::Waiting);
        check(
            self.alarm_message != other.alarm_message,
            StatusField::AlarmMessage,
        );

        changed
    }

    /// Connection state implied by the status
    pub fn connection_state(&self) -> ConnectionState {
        if self.connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}
