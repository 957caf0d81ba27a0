//! Error handling for bapsf-motion
//!
//! Provides the error taxonomy shared by every layer of the workspace:
//! - Validation errors (bad configuration shape or value)
//! - Lookup errors (unknown command names, unregistered type tags)
//! - Protocol errors (malformed or unexpected motor replies)
//! - Connection errors (socket level failures)
//! - Usage errors (asking a detached item to mutate shared state)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Validation error type
///
/// Raised synchronously at construction when a configuration value has
/// the wrong shape, type or range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A parameter has an invalid value
    #[error("Invalid value for '{param}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required parameter was not supplied
    #[error("Missing required parameter '{param}'")]
    MissingParameter {
        /// The parameter name.
        param: String,
    },

    /// An array argument has the wrong rank or size
    #[error("Invalid shape for '{param}': expected {expected}, got {actual}")]
    Shape {
        /// The parameter name.
        param: String,
        /// Description of the expected shape.
        expected: String,
        /// Description of the supplied shape.
        actual: String,
    },

    /// A unit string could not be parsed
    #[error("Unknown unit '{unit}'")]
    UnknownUnit {
        /// The unparsed unit string.
        unit: String,
    },

    /// Two units have no known conversion
    #[error("Can not convert '{from}' to '{to}'")]
    IncompatibleUnits {
        /// Source unit.
        from: String,
        /// Target unit.
        to: String,
    },

    /// IP address is not a dotted IPv4 address
    #[error("Supplied IP address ({ip}) is not a valid IPv4")]
    InvalidIp {
        /// The rejected address.
        ip: String,
    },

    /// A requested point lies inside an excluded region
    #[error("Point {point:?} is in an excluded region of the motion space")]
    ExcludedPoint {
        /// The offending point.
        point: Vec<f64>,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidParameter`]
    pub fn invalid(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }
}

/// Lookup error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The motor command table has no such entry
    #[error("Unknown motor command: {command}")]
    UnknownCommand {
        /// The command name.
        command: String,
    },

    /// No factory is registered under the requested type tag
    #[error("No {kind} registered under type '{type_tag}'")]
    UnregisteredType {
        /// What kind of item was requested (transform, layer, exclusion).
        kind: String,
        /// The unknown tag.
        type_tag: String,
    },

    /// A named item does not exist
    #[error("No {kind} named '{name}'")]
    UnknownItem {
        /// What kind of item was requested.
        kind: String,
        /// The unknown name.
        name: String,
    },
}

/// Protocol error type
///
/// Malformed or unexpected device replies. Never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Reply did not match the command's reply pattern
    #[error("Unexpected reply to '{command}': {reply:?}")]
    UnexpectedReply {
        /// The command that was sent.
        command: String,
        /// The raw reply payload.
        reply: String,
    },

    /// A reply field could not be converted to a number
    #[error("Reply to '{command}' is not numeric: {value:?}")]
    NotNumeric {
        /// The command that was sent.
        command: String,
        /// The captured value.
        value: String,
    },

    /// Reply payload was not ASCII
    #[error("Reply is not valid ASCII")]
    InvalidEncoding,
}

/// Connection error type
///
/// Socket level failures while talking to a motor controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Every connection attempt failed
    #[error("Failed to connect to {address} after {attempts} attempt(s): {reason}")]
    ConnectFailed {
        /// Address that was dialled.
        address: String,
        /// Number of attempts made.
        attempts: u32,
        /// Reason for the last failure.
        reason: String,
    },

    /// The connection dropped and could not be recovered
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// The controller did not answer in time
    #[error("Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// No socket is currently open
    #[error("Not connected")]
    NotConnected,

    /// I/O error
    #[error("I/O error: {reason}")]
    Io {
        /// The reason for the I/O error.
        reason: String,
    },
}

/// Usage error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// A detached item was asked to mutate the shared motion space
    #[error("'{name}' is detached from the motion space and can not {operation}")]
    Detached {
        /// Name of the item.
        name: String,
        /// The refused operation.
        operation: String,
    },
}

/// Main error type for bapsf-motion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Lookup error
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Usage error
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl Error {
    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this is a lookup error
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Error::Lookup(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

/// Result type for bapsf-motion operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: Error = ValidationError::invalid("npoints", "must be positive").into();
        assert!(err.is_validation_error());
        assert_eq!(
            err.to_string(),
            "Invalid value for 'npoints': must be positive"
        );

        let err: Error = LookupError::UnknownCommand {
            command: "home".into(),
        }
        .into();
        assert!(err.is_lookup_error());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_usage_error_message() {
        let err: Error = UsageError::Detached {
            name: "mask_ex0".into(),
            operation: "update the global mask".into(),
        }
        .into();
        assert!(err.is_usage_error());
        assert!(err.to_string().contains("mask_ex0"));
    }
}
