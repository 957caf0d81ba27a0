//! Error types for the actors crate.

use thiserror::Error;

/// Errors raised while building or driving motion groups.
#[derive(Error, Debug)]
pub enum ActorError {
    /// Motor, transform or motion builder failure.
    #[error(transparent)]
    Core(#[from] bapsf_motion_core::Error),

    /// Configuration rejected by the settings layer.
    #[error(transparent)]
    Settings(#[from] bapsf_motion_settings::SettingsError),

    /// Two motion groups of a run would share a name or a motor.
    #[error("Motion group '{name}' conflicts with the run: {reason}")]
    Conflict { name: String, reason: String },
}

impl From<bapsf_motion_core::ValidationError> for ActorError {
    fn from(err: bapsf_motion_core::ValidationError) -> Self {
        Self::Core(err.into())
    }
}

impl ActorError {
    /// Check if this wraps a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Core(err) if err.is_connection_error())
    }

    /// Check if this wraps a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Core(err) if err.is_validation_error())
    }
}

/// Result type alias for actor operations.
pub type ActorResult<T> = Result<T, ActorError>;
