use log::info;

use super::constants::*;
use super::{ExitReason, ModeController};
use crate::alert::AlertPort;
use crate::bus::BusControl;
use crate::display::DisplayPort;
use crate::input::ButtonPort;
use crate::sensors::SensorPort;
use crate::ticks::{TICKS_PER_MINUTE, TickSource};

impl<S, D, K, T, B, A> ModeController<'_, S, D, K, T, B, A>
where
    S: SensorPort,
    D: DisplayPort,
    K: ButtonPort,
    T: TickSource,
    B: BusControl,
    A: AlertPort,
{
    /// Count down the configured period, then play the alert.
    pub(crate) async fn timer(&mut self) -> ExitReason {
        self.set_display(true);
        self.show_message("Timer Mode");

        let mut budget = self.config.period_minutes as u32 * TICKS_PER_MINUTE;
        info!("Timer: {} ticks", budget);
        while budget > 0 {
            if self.step(TIMER_STEP_TICKS).await.is_cancel() {
                return self.cancel().await;
            }
            budget = budget.saturating_sub(TIMER_DECREMENT);
        }

        info!("Timer expired");
        self.alert.fire(self.config.alert).await;
        ExitReason::TimerExpired
    }
}
