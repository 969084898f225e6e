use log::info;

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
    /// Idle dark until a button press, then measure for one window.
    ///
    /// The window is [`ON_DEMAND_WINDOW`] iterations with a sample rendered
    /// every [`ON_DEMAND_SAMPLE_EVERY`]th. Until the first reading arrives
    /// the sensor is asked again on every iteration, since a freshly started
    /// sensor needs a few seconds before its first measurement. When the
    /// window closes the sensor is shut down completely and the run returns
    /// so the dispatcher can go back to idling.
    pub(crate) async fn on_demand(&mut self) -> ExitReason {
        self.set_display(false);
        loop {
            let event = self.step(ON_DEMAND_IDLE_TICKS).await;
            if event.is_cancel() {
                return self.cancel().await;
            }
            if event.is_single() {
                break;
            }
        }

        info!("On-demand wake");
        self.start_sensor(SensorPowerMode::Normal).await;
        self.set_display(true);
        self.show_message("Waking up...");
        if self.poll().is_cancel() {
            return self.cancel().await;
        }

        let mut awaiting_first = true;
        for iteration in 0..ON_DEMAND_WINDOW {
            if awaiting_first || iteration % ON_DEMAND_SAMPLE_EVERY == 0 {
                if let Some(reading) = self.acquire().await {
                    awaiting_first = false;
                    self.render_current();
                    self.accept(reading, true).await;
                }
            }
            if self.step(ON_DEMAND_ITERATION_TICKS).await.is_cancel() {
                return self.cancel().await;
            }
        }

        self.shutdown_sensor().await;
        self.set_display(false);
        ExitReason::OnDemandWindowElapsed
    }
}
