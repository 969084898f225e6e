//! Operating settings chosen in the menu and consumed by the mode controller

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Duty-cycle policy of a mode run. Immutable for the duration of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Continuous,
    LowPower,
    OnDemand,
    Timer,
}

impl OperatingMode {
    pub const ALL: [Self; 4] = [Self::Continuous, Self::LowPower, Self::OnDemand, Self::Timer];

    /// Next mode in menu order, wrapping after [`OperatingMode::Timer`].
    pub const fn next(self) -> Self {
        match self {
            Self::Continuous => Self::LowPower,
            Self::LowPower => Self::OnDemand,
            Self::OnDemand => Self::Timer,
            Self::Timer => Self::Continuous,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Continuous => "Continuous",
            Self::LowPower => "Low Power",
            Self::OnDemand => "On Demand",
            Self::Timer => "Timer",
        }
    }
}

/// Output pattern used when an alert fires.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertMode {
    #[default]
    Vibration,
    Led,
    Both,
}

impl AlertMode {
    pub const fn next(self) -> Self {
        match self {
            Self::Vibration => Self::Led,
            Self::Led => Self::Both,
            Self::Both => Self::Vibration,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Vibration => "Vibration",
            Self::Led => "LEDs",
            Self::Both => "Vib+LEDs",
        }
    }
}

/// CO2 level at which the alert fires, or disabled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningLevel {
    Disabled,
    Ppm(u16),
}

impl WarningLevel {
    pub const MIN_PPM: u16 = 600;
    pub const MAX_PPM: u16 = 2500;
    pub const STEP_PPM: u16 = 100;

    /// Raise by one step; past the maximum the warning is disabled, and the
    /// step after disabled is the minimum again.
    pub const fn next(self) -> Self {
        match self {
            Self::Disabled => Self::Ppm(Self::MIN_PPM),
            Self::Ppm(ppm) if ppm + Self::STEP_PPM > Self::MAX_PPM => Self::Disabled,
            Self::Ppm(ppm) => Self::Ppm(ppm + Self::STEP_PPM),
        }
    }

    /// Whether `co2_ppm` is at or above an enabled threshold.
    pub const fn is_exceeded_by(self, co2_ppm: u16) -> bool {
        match self {
            Self::Disabled => false,
            Self::Ppm(level) => co2_ppm >= level,
        }
    }

    const fn is_valid(self) -> bool {
        match self {
            Self::Disabled => true,
            Self::Ppm(ppm) => {
                ppm >= Self::MIN_PPM && ppm <= Self::MAX_PPM && ppm % Self::STEP_PPM == 0
            }
        }
    }
}

impl Default for WarningLevel {
    fn default() -> Self {
        Self::Ppm(1000)
    }
}

/// Everything a mode run needs from the configuration UI.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub mode: OperatingMode,
    pub alert: AlertMode,
    pub warning: WarningLevel,
    /// Timer period in minutes (5..=60, steps of 5)
    pub period_minutes: u8,
}

impl MonitorConfig {
    pub const MIN_PERIOD_MINUTES: u8 = 5;
    pub const MAX_PERIOD_MINUTES: u8 = 60;
    pub const PERIOD_STEP_MINUTES: u8 = 5;

    /// Advance the timer period by one step, wrapping 60 back to 5.
    pub fn next_period(&mut self) {
        self.period_minutes += Self::PERIOD_STEP_MINUTES;
        if self.period_minutes > Self::MAX_PERIOD_MINUTES {
            self.period_minutes = Self::MIN_PERIOD_MINUTES;
        }
    }

    /// Check that every field holds a value the menu could have produced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_PERIOD_MINUTES..=Self::MAX_PERIOD_MINUTES).contains(&self.period_minutes)
            || self.period_minutes % Self::PERIOD_STEP_MINUTES != 0
        {
            return Err(ConfigError::OutOfRange {
                field: "period_minutes",
            });
        }
        if !self.warning.is_valid() {
            return Err(ConfigError::OutOfRange { field: "warning" });
        }
        Ok(())
    }

    /// Serialize to the compact form stored in flash.
    pub fn encode(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|e| {
            log::error!("Settings encode failed: {:?}", e);
            ConfigError::Encode
        })
    }

    /// Restore settings previously written by [`MonitorConfig::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|e| {
            log::warn!("Settings decode failed: {:?}", e);
            ConfigError::Decode
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Continuous,
            alert: AlertMode::Vibration,
            warning: WarningLevel::default(),
            period_minutes: 5,
        }
    }
}
