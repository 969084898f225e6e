//! Scripted mock ports shared by the unit tests
//!
//! Mocks that need to correlate events in time share a [`Clock`] advanced by
//! [`MockTicks`], so a test can tell at which tick a render or a sensor read
//! happened.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::ops::Range;

use embassy_sync::blocking_mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::alert::AlertPort;
use crate::bus::BusControl;
use crate::config::AlertMode;
use crate::controller::{ModeController, Ports};
use crate::display::DisplayPort;
use crate::error::SensorError;
use crate::input::{ButtonEvent, ButtonPort};
use crate::menu::MenuView;
use crate::sensors::{SensorPort, SensorPowerMode, SensorReading};
use crate::statistics::{SampleStatistics, StatisticsCell};
use crate::ticks::TickSource;
use crate::wake::WakeFlag;

/// Reading with a fixed, plausible temperature and humidity.
pub fn reading(co2_ppm: u16) -> SensorReading {
    SensorReading {
        co2_ppm,
        temperature_tenths: 215,
        humidity_tenths: 450,
    }
}

/// Elapsed ticks, shared between mocks.
pub type Clock = Rc<Cell<u32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCall {
    Start(SensorPowerMode),
    Read,
    Stop,
    Shutdown,
}

/// Sensor returning queued results first, then a fallback result.
pub struct MockSensor {
    pub calls: Vec<SensorCall>,
    /// Tick at which each read happened
    pub read_ticks: Vec<u32>,
    queue: VecDeque<Result<SensorReading, SensorError>>,
    fallback: Result<SensorReading, SensorError>,
    start_error: Option<SensorError>,
    clock: Clock,
}

impl MockSensor {
    pub fn always(reading: SensorReading) -> Self {
        Self {
            calls: Vec::new(),
            read_ticks: Vec::new(),
            queue: VecDeque::new(),
            fallback: Ok(reading),
            start_error: None,
            clock: Clock::default(),
        }
    }

    pub fn sequence(readings: &[u16]) -> Self {
        let mut sensor = Self::always(reading(*readings.last().unwrap_or(&400)));
        for &co2 in readings {
            sensor.push_result(Ok(reading(co2)));
        }
        sensor
    }

    pub fn with_clock(mut self, clock: &Clock) -> Self {
        self.clock = clock.clone();
        self
    }

    pub fn push_result(&mut self, result: Result<SensorReading, SensorError>) {
        self.queue.push_back(result);
    }

    pub fn fail_start(&mut self, error: SensorError) {
        self.start_error = Some(error);
    }

    pub fn reads(&self) -> usize {
        self.calls.iter().filter(|c| **c == SensorCall::Read).count()
    }
}

impl SensorPort for MockSensor {
    async fn start(&mut self, mode: SensorPowerMode) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Start(mode));
        match self.start_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn read_sample(&mut self) -> Result<SensorReading, SensorError> {
        self.calls.push(SensorCall::Read);
        self.read_ticks.push(self.clock.get());
        self.queue.pop_front().unwrap_or(self.fallback)
    }

    async fn stop(&mut self) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Stop);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Shutdown);
        Ok(())
    }
}

/// Sensirion CRC-8 (poly 0x31, init 0xff), for building sensor responses.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xffu8;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// I2C target that records writes and answers reads from a queue.
///
/// The next `fail_writes` write operations are not acknowledged.
#[derive(Default)]
pub struct MockI2c {
    pub writes: Vec<Vec<u8>>,
    pub responses: VecDeque<Vec<u8>>,
    pub fail_writes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockNack;

impl embedded_hal_async::i2c::Error for MockNack {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

impl ErrorType for MockI2c {
    type Error = MockNack;
}

impl I2c for MockI2c {
    async fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if self.fail_writes > 0 {
                        self.fail_writes -= 1;
                        return Err(MockNack);
                    }
                    self.writes.push(bytes.to_vec());
                }
                Operation::Read(buffer) => {
                    let response = self.responses.pop_front().unwrap_or_default();
                    let n = response.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&response[..n]);
                }
            }
        }
        Ok(())
    }
}

/// Delay that only adds up the requested time.
#[derive(Default)]
pub struct MockDelay {
    pub total_ms: u32,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ms += ns / 1_000_000;
    }

    async fn delay_us(&mut self, us: u32) {
        self.total_ms += us / 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCall {
    Init(u32),
    SetSpeed(u32),
}

#[derive(Debug)]
pub struct MockBusError;

#[derive(Default)]
pub struct MockBus {
    pub calls: Vec<BusCall>,
    pub fail_next: bool,
}

impl MockBus {
    fn outcome(&mut self) -> Result<(), MockBusError> {
        if core::mem::take(&mut self.fail_next) {
            Err(MockBusError)
        } else {
            Ok(())
        }
    }
}

impl BusControl for MockBus {
    type Error = MockBusError;

    fn init(&mut self, hz: u32) -> Result<(), Self::Error> {
        self.calls.push(BusCall::Init(hz));
        self.outcome()
    }

    fn set_speed(&mut self, hz: u32) -> Result<(), Self::Error> {
        self.calls.push(BusCall::SetSpeed(hz));
        self.outcome()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Power(bool),
    Clear,
    Current(SensorReading),
    Message(String),
    Menu(MenuView),
}

/// Display recording every call with the tick it happened at.
#[derive(Default)]
pub struct MockDisplay {
    pub log: Vec<(u32, DisplayCall)>,
    clock: Clock,
}

impl MockDisplay {
    pub fn with_clock(clock: &Clock) -> Self {
        Self {
            log: Vec::new(),
            clock: clock.clone(),
        }
    }

    pub fn calls(&self) -> Vec<DisplayCall> {
        self.log.iter().map(|(_, call)| call.clone()).collect()
    }

    /// Ticks at which a current reading was rendered.
    pub fn render_ticks(&self) -> Vec<u32> {
        self.log
            .iter()
            .filter(|(_, call)| matches!(call, DisplayCall::Current(_)))
            .map(|(tick, _)| *tick)
            .collect()
    }

    pub fn rendered(&self) -> Vec<u16> {
        self.log
            .iter()
            .filter_map(|(_, call)| match call {
                DisplayCall::Current(r) => Some(r.co2_ppm),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: DisplayCall) -> Result<(), Infallible> {
        self.log.push((self.clock.get(), call));
        Ok(())
    }
}

impl DisplayPort for MockDisplay {
    type Error = Infallible;

    fn power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.record(DisplayCall::Power(on))
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.record(DisplayCall::Clear)
    }

    fn render_current(&mut self, reading: &SensorReading) -> Result<(), Self::Error> {
        self.record(DisplayCall::Current(*reading))
    }

    fn render_message(&mut self, text: &str) -> Result<(), Self::Error> {
        self.record(DisplayCall::Message(text.to_string()))
    }

    fn render_menu(&mut self, view: &MenuView) -> Result<(), Self::Error> {
        self.record(DisplayCall::Menu(view.clone()))
    }
}

/// Buttons driven first by a per-poll script, then by a tick timeline.
#[derive(Default)]
pub struct MockButtons {
    pub configured: u32,
    pub polls: u32,
    script: VecDeque<ButtonEvent>,
    timeline: Vec<(Range<u32>, ButtonEvent)>,
    clock: Clock,
}

impl MockButtons {
    pub fn with_clock(clock: &Clock) -> Self {
        Self {
            clock: clock.clone(),
            ..Self::default()
        }
    }

    /// Events returned by the next polls, one per poll.
    pub fn script(mut self, events: &[ButtonEvent]) -> Self {
        self.script.extend(events.iter().copied());
        self
    }

    /// Hold `event` while the clock is within `ticks`.
    pub fn hold(mut self, ticks: Range<u32>, event: ButtonEvent) -> Self {
        self.timeline.push((ticks, event));
        self
    }
}

impl ButtonPort for MockButtons {
    fn configure_inputs(&mut self) {
        self.configured += 1;
    }

    fn pressed(&mut self) -> (bool, bool) {
        self.polls += 1;
        let now = self.clock.get();
        let event = self.script.pop_front().unwrap_or_else(|| {
            self.timeline
                .iter()
                .find(|(ticks, _)| ticks.contains(&now))
                .map(|(_, event)| *event)
                .unwrap_or(ButtonEvent::None)
        });
        match event {
            ButtonEvent::None => (false, false),
            ButtonEvent::First => (true, false),
            ButtonEvent::Second => (false, true),
            ButtonEvent::Both => (true, true),
        }
    }
}

/// Tick source that advances the shared clock instantly.
#[derive(Default)]
pub struct MockTicks {
    pub waits: Vec<u32>,
    pub deep_sleep: bool,
    clock: Clock,
}

impl MockTicks {
    pub fn with_clock(clock: &Clock) -> Self {
        Self {
            clock: clock.clone(),
            ..Self::default()
        }
    }
}

impl TickSource for MockTicks {
    async fn wait(&mut self, ticks: u32) {
        self.waits.push(ticks);
        self.clock.set(self.clock.get() + ticks);
    }

    fn suspends_bus(&self) -> bool {
        self.deep_sleep
    }
}

/// Alert output recording which mode fired and when.
#[derive(Default)]
pub struct MockAlert {
    pub fired: Vec<(u32, AlertMode)>,
    clock: Clock,
}

impl MockAlert {
    pub fn with_clock(clock: &Clock) -> Self {
        Self {
            fired: Vec::new(),
            clock: clock.clone(),
        }
    }
}

impl AlertPort for MockAlert {
    async fn fire(&mut self, mode: AlertMode) {
        self.fired.push((self.clock.get(), mode));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Motor,
    Green,
    Red,
}

/// Pin levels over simulated time, fed by [`RecordingPin`] and [`RecordingDelay`].
#[derive(Default)]
pub struct OutputLog {
    now_ms: Cell<u32>,
    edges: RefCell<Vec<(Output, bool, u32)>>,
}

impl OutputLog {
    pub fn total_ms(&self) -> u32 {
        self.now_ms.get()
    }

    /// Completed high pulses as (output, duration in ms), in order.
    pub fn pulses(&self) -> Vec<(Output, u32)> {
        let edges = self.edges.borrow();
        let mut pulses = Vec::new();
        for (i, &(output, high, at)) in edges.iter().enumerate() {
            if !high {
                continue;
            }
            if let Some(&(_, _, until)) = edges[i + 1..]
                .iter()
                .find(|(o, level, _)| *o == output && !*level)
            {
                pulses.push((output, until - at));
            }
        }
        pulses
    }
}

pub struct RecordingPin {
    output: Output,
    log: Rc<OutputLog>,
}

impl RecordingPin {
    pub fn new(output: Output, log: &Rc<OutputLog>) -> Self {
        Self {
            output,
            log: log.clone(),
        }
    }

    fn edge(&mut self, high: bool) -> Result<(), Infallible> {
        self.log
            .edges
            .borrow_mut()
            .push((self.output, high, self.log.now_ms.get()));
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.edge(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.edge(true)
    }
}

pub struct RecordingDelay {
    log: Rc<OutputLog>,
}

impl RecordingDelay {
    pub fn new(log: &Rc<OutputLog>) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.log.now_ms.set(self.log.now_ms.get() + ms);
    }
}

pub type TestController<'a> =
    ModeController<'a, MockSensor, MockDisplay, MockButtons, MockTicks, MockBus, MockAlert>;

/// Shared clock, statistics and wake flag for one controller under test.
pub struct Fixture {
    pub clock: Clock,
    pub statistics: StatisticsCell,
    pub wake: WakeFlag,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            statistics: Mutex::new(RefCell::new(SampleStatistics::new())),
            wake: WakeFlag::new(),
        }
    }

    pub fn now(&self) -> u32 {
        self.clock.get()
    }

    pub fn buttons(&self) -> MockButtons {
        MockButtons::with_clock(&self.clock)
    }

    pub fn controller(&self, sensor: MockSensor, buttons: MockButtons) -> TestController<'_> {
        ModeController::new(
            Ports {
                sensor: sensor.with_clock(&self.clock),
                display: MockDisplay::with_clock(&self.clock),
                buttons,
                ticks: MockTicks::with_clock(&self.clock),
                bus: MockBus::default(),
                alert: MockAlert::with_clock(&self.clock),
            },
            &self.statistics,
            &self.wake,
        )
    }
}
