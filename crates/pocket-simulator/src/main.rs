//! Headless desktop simulator for the pocket CO2 monitor.
//!
//! Runs the real dispatcher and mode controller from `pocket-core` against
//! synthetic hardware and logs what the device would do. Time is simulated:
//! a tick advances the clock by 82 ms instantly unless `--realtime` is given.
//!
//! # Usage
//!
//! ```text
//! pocket-simulator [--mode continuous|low-power|on-demand|timer] [--minutes N]
//!                  [--press EVENT@TICK,...] [--run-ticks N] [--cycles N]
//!                  [--wake-at TICK] [--deep-sleep] [--realtime] [--settings PATH]
//! ```
//!
//! `EVENT` is `first`, `second` or `both`; `TICK` counts from the start of each
//! mode run. Every run is cancelled with both buttons after `--run-ticks`.
//! `RUST_LOG` controls verbosity (`RUST_LOG=debug` shows every bus transaction).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use pocket_core::alert::Alerter;
use pocket_core::bus::BusControl;
use pocket_core::controller::cadence_secs;
use pocket_core::display::DisplayPort;
use pocket_core::input::{ButtonEvent, ButtonPort};
use pocket_core::menu::{MenuItem, MenuView};
use pocket_core::statistics::with_statistics;
use pocket_core::ticks::{TICK, TickSource};
use pocket_core::wake::DISPLAY_WAKE;
use pocket_core::{
    ExitReason, ModeController, Monitor, MonitorConfig, OperatingMode, Ports, STATISTICS,
    SensorError, SensorPort, SensorPowerMode, SensorReading,
};

/// Ticks a scripted button stays pressed.
const HOLD_TICKS: u32 = 12;

/// Every n-th read fails with a CRC error to exercise the soft-fail path.
const CRC_FAILURE_EVERY: u32 = 11;
/// A freshly started sensor has no measurement for this long.
const FIRST_MEASUREMENT_SECS: f64 = 5.0;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

struct Options {
    mode: Option<OperatingMode>,
    minutes: Option<u8>,
    presses: Vec<(u32, ButtonEvent)>,
    run_ticks: u32,
    cycles: u32,
    wake_at: Option<u32>,
    deep_sleep: bool,
    realtime: bool,
    settings: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: None,
            minutes: None,
            presses: Vec::new(),
            run_ticks: 4000,
            cycles: 1,
            wake_at: None,
            deep_sleep: false,
            realtime: false,
            settings: None,
        }
    }
}

fn parse_mode(value: &str) -> anyhow::Result<OperatingMode> {
    Ok(match value {
        "continuous" => OperatingMode::Continuous,
        "low-power" => OperatingMode::LowPower,
        "on-demand" => OperatingMode::OnDemand,
        "timer" => OperatingMode::Timer,
        other => bail!("unknown mode '{}'", other),
    })
}

fn parse_presses(value: &str) -> anyhow::Result<Vec<(u32, ButtonEvent)>> {
    value
        .split(',')
        .map(|entry| -> anyhow::Result<(u32, ButtonEvent)> {
            let (event, tick) = entry
                .split_once('@')
                .ok_or_else(|| anyhow!("expected EVENT@TICK, got '{}'", entry))?;
            let event = match event {
                "first" => ButtonEvent::First,
                "second" => ButtonEvent::Second,
                "both" => ButtonEvent::Both,
                other => bail!("unknown button event '{}'", other),
            };
            let tick = tick.parse().with_context(|| format!("bad tick in '{}'", entry))?;
            Ok((tick, event))
        })
        .collect()
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let mut value = || args.next().ok_or_else(|| anyhow!("{} needs a value", flag));
        match flag.as_str() {
            "--mode" => options.mode = Some(parse_mode(&value()?)?),
            "--minutes" => options.minutes = Some(value()?.parse().context("--minutes")?),
            "--press" => options.presses = parse_presses(&value()?)?,
            "--run-ticks" => options.run_ticks = value()?.parse().context("--run-ticks")?,
            "--cycles" => options.cycles = value()?.parse().context("--cycles")?,
            "--wake-at" => options.wake_at = Some(value()?.parse().context("--wake-at")?),
            "--settings" => options.settings = Some(PathBuf::from(value()?)),
            "--deep-sleep" => options.deep_sleep = true,
            "--realtime" => options.realtime = true,
            other => bail!("unknown argument '{}'", other),
        }
    }
    Ok(options)
}

// ---------------------------------------------------------------------------
// Simulated time
// ---------------------------------------------------------------------------

/// Simulated tick counter shared by every fake peripheral.
#[derive(Clone, Default)]
struct Clock(Rc<Cell<u32>>);

impl Clock {
    fn now(&self) -> u32 {
        self.0.get()
    }

    fn advance(&self, ticks: u32) {
        self.0.set(self.0.get() + ticks);
    }

    fn seconds(&self) -> f64 {
        self.now() as f64 * TICK.as_millis() as f64 / 1000.0
    }
}

struct SimTicks {
    clock: Clock,
    deep_sleep: bool,
    realtime: bool,
    wake_at: Option<u32>,
}

impl TickSource for SimTicks {
    async fn wait(&mut self, ticks: u32) {
        if self.realtime {
            std::thread::sleep(Duration::from_millis(TICK.as_millis() * ticks as u64));
        }
        let before = self.clock.now();
        self.clock.advance(ticks);
        // Stand-in for the display-wake interrupt
        if let Some(at) = self.wake_at
            && before < at
            && at <= self.clock.now()
        {
            info!("[irq] display wake");
            DISPLAY_WAKE.raise();
        }
    }

    fn suspends_bus(&self) -> bool {
        self.deep_sleep
    }
}

/// Delay for alert pulses and menu polling; only sleeps in realtime mode.
struct SimDelay {
    realtime: bool,
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        if self.realtime {
            std::thread::sleep(Duration::from_nanos(ns as u64));
        }
    }

    async fn delay_ms(&mut self, ms: u32) {
        if self.realtime {
            std::thread::sleep(Duration::from_millis(ms as u64));
        }
    }
}

// ---------------------------------------------------------------------------
// Fake peripherals
// ---------------------------------------------------------------------------

/// Generates a slowly varying synthetic CO2/temperature/humidity signal.
struct SimSensor {
    clock: Clock,
    mode: Option<SensorPowerMode>,
    started_at: f64,
    reads: u32,
}

impl SimSensor {
    fn sample(&self) -> SensorReading {
        let t = self.clock.seconds();
        // CO2: 500–1300 ppm so the default warning level is crossed now and then
        let co2 = 900.0 + 400.0 * (t / 300.0).sin() + 30.0 * (t / 41.0).cos();
        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();
        SensorReading {
            co2_ppm: co2 as u16,
            temperature_tenths: (temperature * 10.0) as i16,
            humidity_tenths: (humidity * 10.0) as u16,
        }
    }
}

impl SensorPort for SimSensor {
    async fn start(&mut self, mode: SensorPowerMode) -> Result<(), SensorError> {
        debug!("[sensor] start {:?}", mode);
        self.mode = Some(mode);
        self.started_at = self.clock.seconds();
        Ok(())
    }

    async fn read_sample(&mut self) -> Result<SensorReading, SensorError> {
        if self.mode.is_none() {
            return Err(SensorError::NotRunning);
        }
        if self.clock.seconds() - self.started_at < FIRST_MEASUREMENT_SECS {
            return Err(SensorError::NotReady { sensor: "SIM" });
        }
        self.reads += 1;
        if self.reads % CRC_FAILURE_EVERY == 0 {
            return Err(SensorError::Crc {
                sensor: "SIM",
                operation: "read measurement",
            });
        }
        Ok(self.sample())
    }

    async fn stop(&mut self) -> Result<(), SensorError> {
        debug!("[sensor] stop");
        self.mode = None;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), SensorError> {
        debug!("[sensor] power down");
        self.mode = None;
        Ok(())
    }
}

/// Display that logs what would be drawn.
struct LogDisplay {
    clock: Clock,
}

impl DisplayPort for LogDisplay {
    type Error = Infallible;

    fn power(&mut self, on: bool) -> Result<(), Self::Error> {
        info!("[{:>6}] display {}", self.clock.now(), if on { "on" } else { "off" });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        debug!("[{:>6}] display cleared", self.clock.now());
        Ok(())
    }

    fn render_current(&mut self, reading: &SensorReading) -> Result<(), Self::Error> {
        info!("[{:>6}] {}", self.clock.now(), reading);
        Ok(())
    }

    fn render_message(&mut self, text: &str) -> Result<(), Self::Error> {
        info!("[{:>6}] \"{}\"", self.clock.now(), text);
        Ok(())
    }

    fn render_menu(&mut self, view: &MenuView) -> Result<(), Self::Error> {
        for item in MenuItem::ALL {
            let marker = if item == view.selected { '>' } else { ' ' };
            debug!("{} {:<5} {}", marker, item.label(), view.value(item));
        }
        Ok(())
    }
}

/// Menu presses queued by the driver loop, and the start tick of the current run.
#[derive(Default)]
struct InputScript {
    menu: VecDeque<ButtonEvent>,
    run_start: u32,
}

struct SimButtons {
    clock: Clock,
    script: Rc<RefCell<InputScript>>,
    presses: Vec<(u32, ButtonEvent)>,
    run_ticks: u32,
}

impl ButtonPort for SimButtons {
    fn configure_inputs(&mut self) {}

    fn pressed(&mut self) -> (bool, bool) {
        let mut script = self.script.borrow_mut();
        let event = script.menu.pop_front().unwrap_or_else(|| {
            let elapsed = self.clock.now().saturating_sub(script.run_start);
            if elapsed >= self.run_ticks {
                return ButtonEvent::Both;
            }
            self.presses
                .iter()
                .find(|(at, _)| (*at..at + HOLD_TICKS).contains(&elapsed))
                .map(|(_, event)| *event)
                .unwrap_or(ButtonEvent::None)
        });
        (
            matches!(event, ButtonEvent::First | ButtonEvent::Both),
            matches!(event, ButtonEvent::Second | ButtonEvent::Both),
        )
    }
}

struct LogBus;

impl BusControl for LogBus {
    type Error = Infallible;

    fn init(&mut self, hz: u32) -> Result<(), Self::Error> {
        debug!("[bus] init at {} Hz", hz);
        Ok(())
    }

    fn set_speed(&mut self, hz: u32) -> Result<(), Self::Error> {
        debug!("[bus] speed {} Hz", hz);
        Ok(())
    }
}

struct LogPin(&'static str);

impl ErrorType for LogPin {
    type Error = Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("[alert] {} off", self.0);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        info!("[alert] {} on", self.0);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<MonitorConfig> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(MonitorConfig::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    MonitorConfig::decode(&bytes).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

fn save_settings(path: &PathBuf, config: &MonitorConfig) -> anyhow::Result<()> {
    let bytes = config.encode().map_err(|e| anyhow!("{}", e))?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = parse_args()?;

    let mut config = load_settings(options.settings.as_ref())?;
    if let Some(mode) = options.mode {
        config.mode = mode;
    }
    if let Some(minutes) = options.minutes {
        config.period_minutes = minutes;
    }
    config.validate().map_err(|e| anyhow!("{}", e))?;
    info!("Settings: {:?}", config);

    let clock = Clock::default();
    let script = Rc::new(RefCell::new(InputScript::default()));
    let realtime = options.realtime;

    let ports = Ports {
        sensor: SimSensor {
            clock: clock.clone(),
            mode: None,
            started_at: 0.0,
            reads: 0,
        },
        display: LogDisplay {
            clock: clock.clone(),
        },
        buttons: SimButtons {
            clock: clock.clone(),
            script: script.clone(),
            presses: options.presses.clone(),
            run_ticks: options.run_ticks,
        },
        ticks: SimTicks {
            clock: clock.clone(),
            deep_sleep: options.deep_sleep,
            realtime,
            wake_at: options.wake_at,
        },
        bus: LogBus,
        alert: Alerter::new(
            LogPin("motor"),
            LogPin("green LED"),
            LogPin("red LED"),
            SimDelay { realtime },
        ),
    };
    let controller = ModeController::new(ports, &STATISTICS, &DISPLAY_WAKE);
    let mut monitor = Monitor::new(controller, SimDelay { realtime }, config);

    embassy_futures::block_on(async {
        monitor.boot().await;
        let mut last = None;
        for cycle in 1..=options.cycles {
            if last != Some(ExitReason::OnDemandWindowElapsed) {
                // Released, then both buttons: start the configured mode
                let mut script = script.borrow_mut();
                script.menu.extend([ButtonEvent::None, ButtonEvent::Both]);
            }
            script.borrow_mut().run_start = clock.now();

            let reason = monitor.cycle().await;
            let counters = monitor.controller().counters();
            info!(
                "Cycle {} ended at tick {}: {:?}, {} samples, {} skipped, {} protocol errors",
                cycle,
                clock.now(),
                reason,
                counters.acquisitions,
                counters.soft_failures,
                counters.protocol_errors
            );
            last = Some(reason);
        }
    });

    if let Some(path) = &options.settings {
        save_settings(path, &monitor.config())?;
    }

    let mode = monitor.config().mode;
    with_statistics(&STATISTICS, |stats| {
        if !stats.co2.is_populated() {
            warn!("No readings were recorded");
            return;
        }
        info!(
            "CO2 {}..{} ppm, temperature {}..{} (0.1 C), humidity {}..{} (0.1 %RH)",
            stats.co2.min,
            stats.co2.max,
            stats.temperature.min,
            stats.temperature.max,
            stats.humidity.min,
            stats.humidity.max
        );
        let minutes = cadence_secs(mode).map_or(0, |secs| stats.covered_minutes(secs));
        info!(
            "{} readings accepted, {} history points (~{} min)",
            stats.accepted(),
            stats.stored_points(),
            minutes
        );
        let history: Vec<u16> = stats.history_ppm().collect();
        let recent: Vec<u16> = history.iter().rev().take(8).copied().collect();
        if !recent.is_empty() {
            info!("Most recent history (ppm, newest first): {:?}", recent);
        }
    });

    Ok(())
}
