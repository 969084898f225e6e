use log::debug;

use super::constants::*;
use super::{ExitReason, ModeController};
use crate::alert::AlertPort;
use crate::bus::BusControl;
use crate::config::OperatingMode;
use crate::display::DisplayPort;
use crate::input::ButtonPort;
use crate::sensors::{SensorPort, SensorPowerMode};
use crate::ticks::TickSource;

impl<S, D, K, T, B, A> ModeController<'_, S, D, K, T, B, A>
where
    S: SensorPort,
    D: DisplayPort,
    K: ButtonPort,
    T: TickSource,
    B: BusControl,
    A: AlertPort,
{
    /// Sample every ≈5 s with the display on until cancelled.
    ///
    /// `mode` is the run's configured mode. Anything other than
    /// [`OperatingMode::Continuous`] turns the display off after the first
    /// minute of readings.
    pub(crate) async fn continuous(&mut self, mode: OperatingMode) -> ExitReason {
        self.set_display(true);
        self.show_message("Warming up...");
        self.start_sensor(SensorPowerMode::Normal).await;
        for _ in 0..CONTINUOUS_WARMUP_STEPS {
            if self.step(CONTINUOUS_STEP_TICKS).await.is_cancel() {
                return self.cancel().await;
            }
        }

        let mut readings: u32 = 0;
        loop {
            // A failed read leaves the previous reading on the panel
            if let Some(reading) = self.acquire().await {
                readings = readings.saturating_add(1);
                if readings == DISPLAY_TIMEOUT_READING && mode != OperatingMode::Continuous {
                    debug!("Display timeout after {} readings", readings);
                    self.set_display(false);
                }
                self.render_current();
                self.accept(reading, readings >= STATS_FIRST_READING).await;
            }

            for _ in 0..CONTINUOUS_STEPS_PER_SAMPLE {
                if self.step(CONTINUOUS_STEP_TICKS).await.is_cancel() {
                    return self.cancel().await;
                }
            }
        }
    }
}
