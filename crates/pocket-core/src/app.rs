//! Top-level dispatcher: menu, mode run, back to the menu
//!
//! Only one mode runs at a time; a run always returns here before anything
//! else happens. An on-demand window that closes on its own goes straight
//! back to on-demand idling instead of the menu.

use embedded_hal_async::delay::DelayNs;
use log::{debug, info};

use crate::alert::AlertPort;
use crate::bus::BusControl;
use crate::config::{AlertMode, MonitorConfig, OperatingMode};
use crate::controller::{ExitReason, ModeController};
use crate::display::DisplayPort;
use crate::input::{ButtonEvent, ButtonPort};
use crate::menu::{Menu, MenuAction};
use crate::sensors::SensorPort;
use crate::ticks::TickSource;

/// Interval between menu button polls.
const MENU_POLL_MS: u32 = 20;

pub struct Monitor<'a, S, D, K, T, B, A, W> {
    controller: ModeController<'a, S, D, K, T, B, A>,
    delay: W,
    config: MonitorConfig,
    resume_on_demand: bool,
}

impl<'a, S, D, K, T, B, A, W> Monitor<'a, S, D, K, T, B, A, W>
where
    S: SensorPort,
    D: DisplayPort,
    K: ButtonPort,
    T: TickSource,
    B: BusControl,
    A: AlertPort,
    W: DelayNs,
{
    /// `config` is the starting menu state, typically restored from storage.
    pub fn new(
        controller: ModeController<'a, S, D, K, T, B, A>,
        delay: W,
        config: MonitorConfig,
    ) -> Self {
        Self {
            controller,
            delay,
            config,
            resume_on_demand: false,
        }
    }

    pub const fn config(&self) -> MonitorConfig {
        self.config
    }

    pub fn controller(&self) -> &ModeController<'a, S, D, K, T, B, A> {
        &self.controller
    }

    /// Power-on self-test of every actuator.
    pub async fn boot(&mut self) {
        info!("Pocket CO2 starting");
        self.controller.play_alert(AlertMode::Both).await;
    }

    /// Boot, then cycle forever.
    pub async fn run_forever(&mut self) -> ! {
        self.boot().await;
        loop {
            self.cycle().await;
        }
    }

    /// Choose a mode (or resume on-demand idling) and run it once.
    pub async fn cycle(&mut self) -> ExitReason {
        let mode = if self.resume_on_demand {
            debug!("Resuming on-demand idle");
            OperatingMode::OnDemand
        } else {
            self.choose().await
        };
        let reason = self.controller.run(mode, &self.config).await;
        self.resume_on_demand = reason == ExitReason::OnDemandWindowElapsed;
        reason
    }

    /// Run the settings menu until the user starts a mode.
    pub async fn choose(&mut self) -> OperatingMode {
        let mut menu = Menu::new(self.config);
        loop {
            self.controller.show_menu(&menu.view());
            let event = self.next_press().await;
            if menu.handle(event) == MenuAction::Start {
                self.config = menu.config();
                // A start gesture still held would read as a press (or a
                // cancel) at the mode's first poll
                self.wait_release().await;
                return self.config.mode;
            }
        }
    }

    async fn wait_release(&mut self) {
        while self.controller.poll_buttons() != ButtonEvent::None {
            self.delay.delay_ms(MENU_POLL_MS).await;
        }
    }

    /// Wait for both buttons to be released, then for a press.
    async fn next_press(&mut self) -> ButtonEvent {
        self.wait_release().await;
        loop {
            let event = self.controller.poll_buttons();
            if event != ButtonEvent::None {
                return event;
            }
            self.delay.delay_ms(MENU_POLL_MS).await;
        }
    }
}
