//! Error types shared by the sensor glue, the settings store and the controller

use thiserror_no_std::Error;

/// Failures reported by a [`SensorPort`](crate::sensors::SensorPort).
///
/// Only [`SensorError::Protocol`] is non-recoverable within a mode run. All
/// other variants are absorbed by the controller: the cycle is skipped and the
/// previous reading stays on the display.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: measurement not ready yet")]
    NotReady { sensor: &'static str },
    #[error("{sensor}: bus transfer failed during {operation}")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: CRC mismatch during {operation}")]
    Crc {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: {operation} failed: {details}")]
    Protocol {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("sample requested while the sensor is not running")]
    NotRunning,
}

impl SensorError {
    /// Whether the failure only costs the current cycle.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. } | Self::Bus { .. } | Self::Crc { .. }
        )
    }
}

/// Failures while persisting or restoring [`MonitorConfig`](crate::config::MonitorConfig).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to encode settings")]
    Encode,
    #[error("failed to decode settings")]
    Decode,
    #[error("setting {field} out of range")]
    OutOfRange { field: &'static str },
}
