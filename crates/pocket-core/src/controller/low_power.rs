use log::debug;

use super::constants::*;
use super::{ExitReason, ModeController};
use crate::alert::AlertPort;
use crate::bus::BusControl;
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
    /// Sleep with the display dark, sampling once per cycle.
    ///
    /// Two counters drive the loop. `sample_step` starts the sensor at 0,
    /// reads and stops it at [`LOW_POWER_READ_STEP`] and wraps at
    /// [`LOW_POWER_CYCLE_STEPS`]. `display_steps` is non-zero while the panel
    /// shows the last reading after a button press; presses while it is
    /// already showing do not extend it.
    pub(crate) async fn low_power(&mut self) -> ExitReason {
        self.set_display(false);
        let mut sample_step: u32 = 0;
        let mut display_steps: u32 = 0;

        loop {
            if sample_step == 0 {
                self.start_sensor(SensorPowerMode::Normal).await;
            }

            let event = self.poll();
            if event.is_cancel() {
                return self.cancel().await;
            }
            if event.is_single() && display_steps == 0 {
                self.set_display(true);
                self.render_current();
                display_steps = LOW_POWER_DISPLAY_STEPS;
            }

            self.wait(LOW_POWER_STEP_TICKS).await;
            sample_step += 1;

            if sample_step == LOW_POWER_READ_STEP {
                if let Some(reading) = self.acquire().await {
                    self.accept(reading, true).await;
                }
                self.stop_sensor().await;
            }
            if sample_step == LOW_POWER_CYCLE_STEPS {
                sample_step = 0;
            }

            if display_steps > 0 {
                display_steps -= 1;
                if display_steps == 0 {
                    debug!("Display timeout");
                    self.set_display(false);
                }
            }
        }
    }
}
