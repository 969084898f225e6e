//! Operating-mode controller
//!
//! [`ModeController`] owns every port for the duration of a mode run and is
//! the only code that touches bus, display power and sensor run state. Each
//! mode lives in its own file as an `impl` block on the controller; this file
//! holds the shared transaction helpers they are built from.
//!
//! Every helper that talks to the sensor or the display first calls
//! [`BusManager::prepare`] for the right class, so a bus suspended by a
//! deep-sleep tick is re-initialized before use and the clock is always set
//! explicitly. Sensor failures are absorbed here; nothing in a mode run can
//! fail the caller.

mod constants;
mod continuous;
mod low_power;
mod on_demand;
mod timer;

pub use constants::cadence_secs;

use log::{debug, error, info, warn};

use crate::alert::AlertPort;
use crate::bus::{BusClass, BusControl, BusManager, BusState};
use crate::config::{AlertMode, MonitorConfig, OperatingMode};
use crate::display::DisplayPort;
use crate::error::SensorError;
use crate::input::{ButtonEvent, ButtonPort};
use crate::menu::MenuView;
use crate::sensors::{SensorLink, SensorPort, SensorPowerMode, SensorReading, SensorRunState};
use crate::statistics::{StatisticsCell, with_statistics};
use crate::ticks::TickSource;
use crate::wake::WakeFlag;

/// Why a mode run returned to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Both buttons were pressed.
    UserCancel,
    /// The timer budget ran out and the alert played.
    TimerExpired,
    /// The on-demand measurement window closed without cancellation.
    OnDemandWindowElapsed,
}

/// Per-run outcome counters. Reset at the start of every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounters {
    pub acquisitions: u32,
    /// Reads skipped because of a transient failure
    pub soft_failures: u32,
    pub protocol_errors: u32,
}

/// Power view of the hardware the controller manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerState {
    pub sensor_running: bool,
    pub display_on: bool,
    pub bus_suspended: bool,
}

/// Hardware handed to the controller at construction.
pub struct Ports<S, D, K, T, B, A> {
    pub sensor: S,
    pub display: D,
    pub buttons: K,
    /// Chosen once: active wait or deep sleep
    pub ticks: T,
    pub bus: B,
    pub alert: A,
}

pub struct ModeController<'a, S, D, K, T, B, A> {
    sensor: SensorLink<S>,
    display: D,
    buttons: K,
    ticks: T,
    bus: BusManager<B>,
    alert: A,
    statistics: &'a StatisticsCell,
    wake: &'a WakeFlag,
    /// Most recent good reading; overwritten by every acquisition.
    current: Option<SensorReading>,
    display_on: bool,
    config: MonitorConfig,
    counters: RunCounters,
    /// Cleared when an alert fires for a high reading, set again once a
    /// reading falls below the warning level.
    warning_armed: bool,
    fault_reported: bool,
}

impl<'a, S, D, K, T, B, A> ModeController<'a, S, D, K, T, B, A>
where
    S: SensorPort,
    D: DisplayPort,
    K: ButtonPort,
    T: TickSource,
    B: BusControl,
    A: AlertPort,
{
    pub fn new(
        ports: Ports<S, D, K, T, B, A>,
        statistics: &'a StatisticsCell,
        wake: &'a WakeFlag,
    ) -> Self {
        Self {
            sensor: SensorLink::new(ports.sensor),
            display: ports.display,
            buttons: ports.buttons,
            ticks: ports.ticks,
            bus: BusManager::new(ports.bus),
            alert: ports.alert,
            statistics,
            wake,
            current: None,
            display_on: false,
            config: MonitorConfig::default(),
            counters: RunCounters::default(),
            warning_armed: true,
            fault_reported: false,
        }
    }

    /// Run `mode` until it exits. Never fails; sensor and bus errors are
    /// absorbed and show up in [`ModeController::counters`].
    pub async fn run(&mut self, mode: OperatingMode, config: &MonitorConfig) -> ExitReason {
        self.config = *config;
        self.counters = RunCounters::default();
        self.warning_armed = true;
        self.fault_reported = false;
        self.sensor.reset();

        info!("Entering {} mode", mode.label());
        let reason = match mode {
            OperatingMode::Continuous => self.continuous(mode).await,
            OperatingMode::LowPower => self.low_power().await,
            OperatingMode::OnDemand => self.on_demand().await,
            OperatingMode::Timer => self.timer().await,
        };
        info!(
            "Leaving {} mode: {:?} ({:?})",
            mode.label(),
            reason,
            self.counters
        );
        reason
    }

    pub const fn counters(&self) -> RunCounters {
        self.counters
    }

    pub const fn current(&self) -> Option<SensorReading> {
        self.current
    }

    pub fn power_state(&self) -> PowerState {
        PowerState {
            sensor_running: self.sensor.state() == SensorRunState::Running,
            display_on: self.display_on,
            bus_suspended: self.bus.state() == BusState::Suspended,
        }
    }

    /// Power the display up and draw a menu frame.
    pub fn show_menu(&mut self, view: &MenuView) {
        if !self.display_on {
            self.set_display(true);
        }
        self.with_display(|d| d.render_menu(view));
    }

    /// One button poll outside a mode run (menu navigation).
    pub fn poll_buttons(&mut self) -> ButtonEvent {
        self.poll()
    }

    /// Play `mode`'s alert pattern once, e.g. as a boot self-test.
    pub async fn play_alert(&mut self, mode: AlertMode) {
        self.alert.fire(mode).await;
    }

    #[cfg(test)]
    pub(crate) fn display(&self) -> &D {
        &self.display
    }

    #[cfg(test)]
    pub(crate) fn alert(&self) -> &A {
        &self.alert
    }

    // Timing and input

    /// Wait `ticks`, noting that a deep-sleep wait powered the bus down.
    async fn wait(&mut self, ticks: u32) {
        self.ticks.wait(ticks).await;
        if self.ticks.suspends_bus() {
            self.bus.mark_suspended();
        }
    }

    /// Poll the buttons, first honouring any pending display-wake redraw.
    fn poll(&mut self) -> ButtonEvent {
        // A dark panel has nothing to clear; the flag is consumed either way
        if self.wake.take() && self.display_on {
            debug!("Display wake: redrawing");
            self.with_display(|d| d.clear());
            self.render_current();
        }
        self.buttons.poll()
    }

    /// One suspension point: wait, then poll.
    async fn step(&mut self, ticks: u32) -> ButtonEvent {
        self.wait(ticks).await;
        self.poll()
    }

    async fn cancel(&mut self) -> ExitReason {
        info!("Both buttons pressed, cancelling");
        self.stop_sensor().await;
        ExitReason::UserCancel
    }

    // Display transactions

    fn with_display(&mut self, f: impl FnOnce(&mut D) -> Result<(), D::Error>) {
        self.bus.prepare(BusClass::Display);
        if let Err(e) = f(&mut self.display) {
            warn!("Display transaction failed: {:?}", e);
        }
    }

    fn set_display(&mut self, on: bool) {
        self.with_display(|d| d.power(on));
        self.display_on = on;
    }

    fn show_message(&mut self, text: &str) {
        self.with_display(|d| d.render_message(text));
    }

    /// Draw the current reading if the panel is on.
    fn render_current(&mut self) {
        if !self.display_on {
            return;
        }
        match self.current {
            Some(reading) => self.with_display(|d| d.render_current(&reading)),
            None => self.show_message("No data yet"),
        }
    }

    // Sensor transactions

    async fn start_sensor(&mut self, mode: SensorPowerMode) {
        if self.sensor.is_faulted() {
            return;
        }
        self.bus.prepare(BusClass::Sensor);
        if let Err(e) = self.sensor.start(mode).await {
            self.absorb(e);
        }
    }

    async fn stop_sensor(&mut self) {
        if self.sensor.state() != SensorRunState::Running {
            return;
        }
        self.bus.prepare(BusClass::Sensor);
        if let Err(e) = self.sensor.stop().await {
            self.absorb(e);
        }
    }

    async fn shutdown_sensor(&mut self) {
        if self.sensor.is_faulted() {
            return;
        }
        self.bus.prepare(BusClass::Sensor);
        if let Err(e) = self.sensor.shutdown().await {
            self.absorb(e);
        }
    }

    /// Fetch one sample. `None` means "no new data this cycle".
    async fn acquire(&mut self) -> Option<SensorReading> {
        if self.sensor.is_faulted() {
            return None;
        }
        self.bus.prepare(BusClass::Sensor);
        match self.sensor.read().await {
            Ok(reading) => {
                debug!("Sample: {}", reading);
                self.counters.acquisitions += 1;
                self.current = Some(reading);
                Some(reading)
            }
            Err(e) => {
                self.absorb(e);
                None
            }
        }
    }

    fn absorb(&mut self, e: SensorError) {
        if e.is_transient() || e == SensorError::NotRunning {
            warn!("Sensor cycle skipped: {}", e);
            self.counters.soft_failures += 1;
            return;
        }
        error!("Sensor faulted for this run: {}", e);
        self.counters.protocol_errors += 1;
        if !self.fault_reported {
            self.fault_reported = true;
            if self.display_on {
                self.show_message("Sensor error");
            }
        }
    }

    /// Feed an accepted reading to the statistics (when `record`) and check
    /// the warning level.
    async fn accept(&mut self, reading: SensorReading, record: bool) {
        if record {
            with_statistics(self.statistics, |stats| stats.record(&reading));
        }
        if !self.config.warning.is_exceeded_by(reading.co2_ppm) {
            self.warning_armed = true;
        } else if self.warning_armed {
            warn!(
                "CO2 {} ppm reached warning level {:?}",
                reading.co2_ppm, self.config.warning
            );
            self.warning_armed = false;
            self.alert.fire(self.config.alert).await;
        }
    }
}
