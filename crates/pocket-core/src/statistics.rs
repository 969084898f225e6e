//! Running extrema and decimated CO2 history
//!
//! One [`SampleStatistics`] lives for the whole process in [`STATISTICS`]. It is
//! initialized with sentinel extremes at boot, updated once per accepted
//! reading, and never reset when modes change. The history view reads it
//! between runs.
//!
//! ## Decimation
//!
//! The top bits of each CO2 value (`co2 >> 5`) go into a 32-slot accumulator.
//! Every 32nd accepted reading the accumulator mean is appended to a ring of
//! [`HISTORY_CAPACITY`] bytes, so one stored point covers 32 acquisition
//! cycles of whatever mode was active.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::sensors::SensorReading;

/// Number of decimated points kept (24 h at 80 s per point).
pub const HISTORY_CAPACITY: usize = 540;

/// Raw readings averaged into one stored point.
pub const DECIMATION: usize = 32;

/// Right shift applied before decimation; one stored unit is 32 ppm.
const CO2_SHIFT: u32 = 5;

/// Mutex-guarded statistics shared between the controller and the history view.
pub type StatisticsCell = Mutex<CriticalSectionRawMutex, RefCell<SampleStatistics>>;

/// Process-wide statistics, initialized at boot with sentinel extremes.
pub static STATISTICS: StatisticsCell = Mutex::new(RefCell::new(SampleStatistics::new()));

/// Inclusive range of observed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extrema<T> {
    pub min: T,
    pub max: T,
}

impl<T: Copy + Ord> Extrema<T> {
    fn include(&mut self, value: T) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Whether any value has been included yet.
    pub fn is_populated(&self) -> bool {
        self.min <= self.max
    }
}

/// 32-slot buffer of truncated CO2 values awaiting averaging.
#[derive(Debug, Clone)]
pub struct DecimationAccumulator {
    slots: [u8; DECIMATION],
    filled: usize,
}

impl DecimationAccumulator {
    pub const fn new() -> Self {
        Self {
            slots: [0; DECIMATION],
            filled: 0,
        }
    }

    /// Store one value; returns the mean once all 32 slots are filled.
    pub fn push(&mut self, value: u8) -> Option<u8> {
        self.slots[self.filled % DECIMATION] = value;
        self.filled = (self.filled + 1) % DECIMATION;
        if self.filled == 0 {
            let sum: u32 = self.slots.iter().map(|&v| v as u32).sum();
            Some((sum / DECIMATION as u32) as u8)
        } else {
            None
        }
    }

    pub const fn pending(&self) -> usize {
        self.filled
    }
}

impl Default for DecimationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SampleStatistics {
    pub co2: Extrema<u16>,
    pub temperature: Extrema<i16>,
    pub humidity: Extrema<u16>,
    accumulator: DecimationAccumulator,
    history: [u8; HISTORY_CAPACITY],
    /// Next write position in `history`, always `< HISTORY_CAPACITY`
    cursor: usize,
    stored: usize,
    accepted: u32,
}

impl SampleStatistics {
    pub const fn new() -> Self {
        Self {
            co2: Extrema {
                min: u16::MAX,
                max: u16::MIN,
            },
            temperature: Extrema {
                min: i16::MAX,
                max: i16::MIN,
            },
            humidity: Extrema {
                min: u16::MAX,
                max: u16::MIN,
            },
            accumulator: DecimationAccumulator::new(),
            history: [0; HISTORY_CAPACITY],
            cursor: 0,
            stored: 0,
            accepted: 0,
        }
    }

    /// Fold one accepted reading into the extrema and the decimated history.
    pub fn record(&mut self, reading: &SensorReading) {
        self.co2.include(reading.co2_ppm);
        self.temperature.include(reading.temperature_tenths);
        self.humidity.include(reading.humidity_tenths);
        self.accepted = self.accepted.wrapping_add(1);

        let truncated = (reading.co2_ppm >> CO2_SHIFT).min(u8::MAX as u16) as u8;
        if let Some(mean) = self.accumulator.push(truncated) {
            self.history[self.cursor] = mean;
            self.cursor = (self.cursor + 1) % HISTORY_CAPACITY;
            self.stored = (self.stored + 1).min(HISTORY_CAPACITY);
        }
    }

    pub const fn accepted(&self) -> u32 {
        self.accepted
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of decimated points currently held.
    pub const fn stored_points(&self) -> usize {
        self.stored
    }

    /// Decimated points, oldest first.
    pub fn history(&self) -> impl Iterator<Item = u8> + '_ {
        let start = if self.stored < HISTORY_CAPACITY {
            0
        } else {
            self.cursor
        };
        (0..self.stored).map(move |i| self.history[(start + i) % HISTORY_CAPACITY])
    }

    /// Decimated points expanded back to approximate ppm, oldest first.
    pub fn history_ppm(&self) -> impl Iterator<Item = u16> + '_ {
        self.history().map(|point| (point as u16) << CO2_SHIFT)
    }

    /// Minutes of history held, given the acquisition cadence in seconds.
    pub const fn covered_minutes(&self, cadence_secs: u32) -> u32 {
        self.stored as u32 * DECIMATION as u32 * cadence_secs / 60
    }
}

impl Default for SampleStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `f` to the shared statistics.
pub fn with_statistics<R>(cell: &StatisticsCell, f: impl FnOnce(&mut SampleStatistics) -> R) -> R {
    cell.lock(|stats| f(&mut stats.borrow_mut()))
}
