//! Motor driver tunables

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Applied Motion TCP port (7775 is the UDP port)
pub const DEFAULT_PORT: u16 = 7776;

/// Connection and polling settings for one motor driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    /// TCP port on the drive
    pub port: u16,
    /// Connect, read and write timeout
    #[serde(with = "seconds")]
    pub timeout: Duration,
    /// Connection attempts before giving up
    pub max_connection_attempts: u32,
    /// Bytes requested per socket read
    pub read_chunk_size: usize,
    /// Heartbeat interval while idle
    #[serde(with = "seconds")]
    pub base_heartrate: Duration,
    /// Heartbeat interval while moving
    #[serde(with = "seconds")]
    pub active_heartrate: Duration,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(1),
            max_connection_attempts: 3,
            read_chunk_size: 16,
            base_heartrate: Duration::from_secs(2),
            active_heartrate: Duration::from_millis(500),
        }
    }
}

impl MotorSettings {
    /// Heartbeat interval for the given motion state
    pub fn heartrate(&self, moving: bool) -> Duration {
        if moving {
            self.active_heartrate
        } else {
            self.base_heartrate
        }
    }
}

/// Durations as floating point seconds
mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MotorSettings::default();
        assert_eq!(settings.port, 7776);
        assert_eq!(settings.max_connection_attempts, 3);
        assert_eq!(settings.heartrate(false), Duration::from_secs(2));
        assert_eq!(settings.heartrate(true), Duration::from_millis(500));
    }
}
