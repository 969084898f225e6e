//! Blocking wait primitives at tick granularity
//!
//! Mode loops express every timeout as a tick count. Which source backs a tick
//! is chosen once when the controller is built: [`ActiveWait`] keeps the core
//! running (so a debug probe stays attached), [`DeepSleep`] enters standby and
//! powers the bus controller down for the duration of the wait.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

/// Length of one standby tick on the target (the low-power timer's period).
pub const TICK: Duration = Duration::from_millis(82);

/// Approximate number of ticks per minute.
pub const TICKS_PER_MINUTE: u32 = 731;

/// Strategy for waiting a number of ticks.
pub trait TickSource {
    /// Block for approximately `ticks × TICK`.
    fn wait(&mut self, ticks: u32) -> impl Future<Output = ()>;

    /// Whether a wait leaves the bus controller powered down.
    fn suspends_bus(&self) -> bool;
}

/// Busy/active wait through a delay provider.
pub struct ActiveWait<D> {
    delay: D,
}

impl<D: DelayNs> ActiveWait<D> {
    pub const fn new(delay: D) -> Self {
        Self { delay }
    }
}

impl<D: DelayNs> TickSource for ActiveWait<D> {
    async fn wait(&mut self, ticks: u32) {
        let ms = TICK.as_millis() as u32 * ticks;
        self.delay.delay_ms(ms).await;
    }

    fn suspends_bus(&self) -> bool {
        false
    }
}

/// Platform hook that puts the chip into standby for whole ticks.
pub trait Standby {
    fn standby(&mut self, ticks: u32) -> impl Future<Output = ()>;
}

/// Power-saving wait in standby; peripherals need re-initialization afterwards.
pub struct DeepSleep<S> {
    standby: S,
}

impl<S: Standby> DeepSleep<S> {
    pub const fn new(standby: S) -> Self {
        Self { standby }
    }
}

impl<S: Standby> TickSource for DeepSleep<S> {
    async fn wait(&mut self, ticks: u32) {
        self.standby.standby(ticks).await;
    }

    fn suspends_bus(&self) -> bool {
        true
    }
}
