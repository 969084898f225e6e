//! Sensor port abstraction and run-state tracking

#[cfg(feature = "sensor-scd41")]
mod scd41;

#[cfg(feature = "sensor-scd41")]
pub use scd41::Scd41;

use log::{debug, warn};

use crate::error::SensorError;

/// One acquisition from the gas sensor.
///
/// Immutable once captured; the controller keeps a single current-reading slot
/// that the next acquisition overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReading {
    pub co2_ppm: u16,
    /// Degrees Celsius × 10
    pub temperature_tenths: i16,
    /// Relative humidity percent × 10
    pub humidity_tenths: u16,
}

impl core::fmt::Display for SensorReading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.temperature_tenths < 0 { "-" } else { "" };
        let temperature = self.temperature_tenths.unsigned_abs();
        write!(
            f,
            "{} ppm, {}{}.{} C, {}.{} %RH",
            self.co2_ppm,
            sign,
            temperature / 10,
            temperature % 10,
            self.humidity_tenths / 10,
            self.humidity_tenths % 10
        )
    }
}

/// Measurement cadence requested from the sensor on start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPowerMode {
    /// Periodic measurement every 5 s
    Normal,
    /// Periodic measurement every 30 s
    LowPower,
}

/// Trait for the gas sensor the controller drives.
///
/// `start` must precede `read_sample`. Calling `read_sample` after `stop` or
/// `shutdown` is undefined for real hardware; [`SensorLink`] prevents it.
pub trait SensorPort {
    fn start(&mut self, mode: SensorPowerMode) -> impl Future<Output = Result<(), SensorError>>;

    fn read_sample(&mut self) -> impl Future<Output = Result<SensorReading, SensorError>>;

    /// Stop periodic measurement, keeping the sensor powered.
    fn stop(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Stop and power the sensor down completely.
    fn shutdown(&mut self) -> impl Future<Output = Result<(), SensorError>>;
}

/// Power state of the sensor as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorRunState {
    Idle,
    Running,
    Stopped,
    ShutDown,
    /// A protocol error occurred; no more transactions this run.
    Faulted,
}

/// Wraps a [`SensorPort`] with the state tracking that keeps reads from
/// reaching a sensor that is not measuring.
pub struct SensorLink<S> {
    port: S,
    state: SensorRunState,
}

impl<S: SensorPort> SensorLink<S> {
    pub const fn new(port: S) -> Self {
        Self {
            port,
            state: SensorRunState::Idle,
        }
    }

    pub const fn state(&self) -> SensorRunState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        self.state == SensorRunState::Faulted
    }

    /// Forget a previous fault at the start of a new run.
    pub fn reset(&mut self) {
        if self.state == SensorRunState::Faulted {
            self.state = SensorRunState::Idle;
        }
    }

    pub async fn start(&mut self, mode: SensorPowerMode) -> Result<(), SensorError> {
        if self.is_faulted() {
            return Err(SensorError::NotRunning);
        }
        match self.port.start(mode).await {
            Ok(()) => {
                debug!("Sensor started ({:?})", mode);
                self.state = SensorRunState::Running;
                Ok(())
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    pub async fn read(&mut self) -> Result<SensorReading, SensorError> {
        if self.state != SensorRunState::Running {
            warn!("Sample requested in state {:?}, skipping", self.state);
            return Err(SensorError::NotRunning);
        }
        self.port.read_sample().await.map_err(|e| self.note_failure(e))
    }

    pub async fn stop(&mut self) -> Result<(), SensorError> {
        if self.state != SensorRunState::Running {
            return Ok(());
        }
        self.state = SensorRunState::Stopped;
        self.port.stop().await.map_err(|e| self.note_failure(e))
    }

    pub async fn shutdown(&mut self) -> Result<(), SensorError> {
        if matches!(self.state, SensorRunState::ShutDown | SensorRunState::Faulted) {
            return Ok(());
        }
        self.state = SensorRunState::ShutDown;
        self.port.shutdown().await.map_err(|e| self.note_failure(e))
    }

    fn note_failure(&mut self, error: SensorError) -> SensorError {
        if !error.is_transient() && error != SensorError::NotRunning {
            self.state = SensorRunState::Faulted;
        }
        error
    }

    #[cfg(test)]
    pub(crate) fn port(&self) -> &S {
        &self.port
    }
}
