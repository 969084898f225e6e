//! Display-wake interrupt hand-off
//!
//! The wake interrupt must not call into the mode loops or touch the display
//! directly. It raises a single-slot "pending redraw" flag instead, and the
//! active mode loop consumes it at its next button poll, clearing and
//! repainting the panel from the main control flow.
//!
//! Known hazard: a redraw requested while the main loop is in the middle of a
//! display transaction is only honoured at the following poll, so the panel
//! may briefly show content the interrupt intended to clear.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Single-slot flag shared between the wake interrupt and the control loop.
pub struct WakeFlag {
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl WakeFlag {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Request a redraw. Non-blocking and allocation-free; safe from an ISR.
    pub fn raise(&self) {
        self.signal.signal(());
    }

    /// Consume a pending request, returning whether one was pending.
    pub fn take(&self) -> bool {
        self.signal.try_take().is_some()
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Flag raised by the firmware's display-wake interrupt handler.
pub static DISPLAY_WAKE: WakeFlag = WakeFlag::new();
