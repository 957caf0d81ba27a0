//! Error types for the settings crate.

use std::io;
use thiserror::Error;

/// Errors that can occur while reading, validating or writing a run
/// configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A required configuration key is missing.
    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    /// A configuration value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// TOML parse or deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// A value was rejected by the core validators.
    #[error(transparent)]
    Core(#[from] bapsf_motion_core::Error),
}

impl SettingsError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bapsf_motion_core::ValidationError;

    #[test]
    fn test_settings_error_display() {
        let err = SettingsError::MissingKey("motion_group.drive".to_string());
        assert_eq!(err.to_string(), "Missing configuration key: motion_group.drive");

        let err = SettingsError::invalid("units_per_rev", "must be non-zero");
        assert_eq!(err.to_string(), "Invalid setting 'units_per_rev': must be non-zero");
    }

    #[test]
    fn test_error_conversion() {
        let core: bapsf_motion_core::Error = ValidationError::InvalidIp { ip: "x".into() }.into();
        let err: SettingsError = core.into();
        assert!(matches!(err, SettingsError::Core(_)));

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: SettingsError = io_err.into();
        assert!(matches!(err, SettingsError::IoError(_)));
    }
}
