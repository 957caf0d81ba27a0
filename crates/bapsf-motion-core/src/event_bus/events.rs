//! Event type definitions for the motor event bus.

use serde::{Deserialize, Serialize};

use crate::status::{ConnectionState, MotorStatus, StatusField};

/// Events emitted by a motor driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotorEvent {
    /// One or more status fields changed
    StatusChanged {
        /// Name of the emitting motor
        motor: String,
        /// Fields that differ from the previous status
        changed: Vec<StatusField>,
        /// Full status after the change
        status: MotorStatus,
    },
    /// The socket state changed
    ConnectionChanged {
        /// Name of the emitting motor
        motor: String,
        /// The new state
        state: ConnectionState,
    },
    /// The controller reported one or more alarms
    Alarm {
        /// Name of the emitting motor
        motor: String,
        /// Decoded alarm text
        message: String,
    },
}

impl MotorEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            MotorEvent::StatusChanged { .. } => EventCategory::Status,
            MotorEvent::ConnectionChanged { .. } => EventCategory::Connection,
            MotorEvent::Alarm { .. } => EventCategory::Alarm,
        }
    }

    /// Name of the motor that emitted the event
    pub fn motor(&self) -> &str {
        match self {
            MotorEvent::StatusChanged { motor, .. }
            | MotorEvent::ConnectionChanged { motor, .. }
            | MotorEvent::Alarm { motor, .. } => motor,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            MotorEvent::StatusChanged { motor, changed, .. } => {
                let names: Vec<&str> = changed.iter().map(|f| f.as_str()).collect();
                format!("{motor}: status changed [{}]", names.join(", "))
            }
            MotorEvent::ConnectionChanged { motor, state } => format!("{motor}: {state}"),
            MotorEvent::Alarm { motor, message } => format!("{motor}: alarm {message}"),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Status,
    Connection,
    Alarm,
}
