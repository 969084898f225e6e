//! Loop timing for every mode, in ticks and steps
//!
//! These were tuned on hardware (display settle time and sensor start-up
//! margins) and are kept literally.

use crate::config::OperatingMode;

/// Ticks waited per continuous-mode step (≈250 ms).
pub(crate) const CONTINUOUS_STEP_TICKS: u32 = 3;
/// Steps between acquisitions (≈5 s).
pub(crate) const CONTINUOUS_STEPS_PER_SAMPLE: u32 = 21;
/// Steps waited after starting the sensor so the first sample is ready.
pub(crate) const CONTINUOUS_WARMUP_STEPS: u32 = 21;
/// First successful reading that is fed to the statistics.
pub(crate) const STATS_FIRST_READING: u32 = 3;
/// Reading after which a non-continuous run turns the display off (≈1 min).
pub(crate) const DISPLAY_TIMEOUT_READING: u32 = 16;

pub(crate) const LOW_POWER_STEP_TICKS: u32 = 3;
/// Step at which the sample is read and the sensor stopped again.
pub(crate) const LOW_POWER_READ_STEP: u32 = 21;
/// Steps per acquisition cycle (≈30 s).
pub(crate) const LOW_POWER_CYCLE_STEPS: u32 = 120;
/// Steps the display stays on after a button press (≈5 s).
pub(crate) const LOW_POWER_DISPLAY_STEPS: u32 = 20;

pub(crate) const ON_DEMAND_IDLE_TICKS: u32 = 3;
/// Iterations in one measurement window.
pub(crate) const ON_DEMAND_WINDOW: u32 = 60;
/// Ticks per window iteration (≈1 s).
pub(crate) const ON_DEMAND_ITERATION_TICKS: u32 = 12;
pub(crate) const ON_DEMAND_SAMPLE_EVERY: u32 = 20;

pub(crate) const TIMER_STEP_TICKS: u32 = 10;
pub(crate) const TIMER_DECREMENT: u32 = 10;

/// Seconds between acquisitions in `mode`, for mapping history points to
/// wall-clock time. Timer mode does not sample.
pub const fn cadence_secs(mode: OperatingMode) -> Option<u32> {
    match mode {
        OperatingMode::Continuous | OperatingMode::OnDemand => Some(5),
        OperatingMode::LowPower => Some(30),
        OperatingMode::Timer => None,
    }
}
