//! Hardware-independent core library for the pocket CO2 monitor
//!
//! This crate contains the operating-mode controller and the power-aware
//! sampling engine: the per-mode run loops, bus and power tracking, button
//! driven cancellation, running statistics and the alert patterns. Sensor,
//! display, button, actuator and timing hardware are reached only through the
//! port traits defined here.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod alert;
pub mod app;
pub mod bus;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod input;
pub mod menu;
pub mod sensors;
pub mod statistics;
pub mod ticks;
pub mod wake;

#[cfg(test)]
pub(crate) mod testing;

pub use app::Monitor;
pub use config::{AlertMode, MonitorConfig, OperatingMode, WarningLevel};
pub use controller::{ExitReason, ModeController, Ports, RunCounters};
pub use error::{ConfigError, SensorError};
pub use sensors::{SensorPort, SensorPowerMode, SensorReading};
pub use statistics::{STATISTICS, SampleStatistics, StatisticsCell};
