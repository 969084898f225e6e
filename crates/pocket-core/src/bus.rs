//! Shared I2C bus bring-up and speed switching
//!
//! The sensor and the display share one bus but need different clock rates,
//! and a deep-sleep tick powers the bus controller down entirely. Every
//! transaction helper in the controller calls [`BusManager::prepare`] first,
//! which re-initializes a suspended or never-initialized bus and otherwise
//! sets the speed for the peripheral class about to be addressed.

use log::{debug, warn};

/// Clock rate required by the SCD41 (it cannot handle 400 kHz).
pub const SENSOR_BUS_HZ: u32 = 50_000;
/// Clock rate the OLED controller handles.
pub const DISPLAY_BUS_HZ: u32 = 400_000;

/// Peripheral class about to use the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusClass {
    Sensor,
    Display,
}

impl BusClass {
    pub const fn speed_hz(self) -> u32 {
        match self {
            Self::Sensor => SENSOR_BUS_HZ,
            Self::Display => DISPLAY_BUS_HZ,
        }
    }
}

/// Power/initialization state of the bus controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Uninitialized,
    /// Powered down by a deep-sleep tick; needs a full re-init.
    Suspended,
    Active { hz: u32 },
}

/// Low-level bus controller operations supplied by the platform.
pub trait BusControl {
    type Error: core::fmt::Debug;

    /// Bring the controller up from scratch at `hz`.
    fn init(&mut self, hz: u32) -> Result<(), Self::Error>;

    /// Change the clock of an already initialized controller.
    fn set_speed(&mut self, hz: u32) -> Result<(), Self::Error>;
}

/// Tracks [`BusState`] and applies the right correction before each transaction.
pub struct BusManager<B> {
    bus: B,
    state: BusState,
}

impl<B: BusControl> BusManager<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            state: BusState::Uninitialized,
        }
    }

    pub const fn state(&self) -> BusState {
        self.state
    }

    /// Record that a deep-sleep tick powered the controller down.
    pub fn mark_suspended(&mut self) {
        if self.state != BusState::Uninitialized {
            self.state = BusState::Suspended;
        }
    }

    /// Make the bus usable for `class`. Speed is always set explicitly.
    pub fn prepare(&mut self, class: BusClass) {
        let hz = class.speed_hz();
        let result = match self.state {
            BusState::Uninitialized | BusState::Suspended => {
                debug!("Bus re-init at {} Hz for {:?} (was {:?})", hz, class, self.state);
                self.bus.init(hz)
            }
            BusState::Active { .. } => self.bus.set_speed(hz),
        };
        match result {
            Ok(()) => self.state = BusState::Active { hz },
            Err(e) => {
                // Force a full bring-up on the next transaction
                warn!("Bus preparation for {:?} failed: {:?}", class, e);
                if self.state != BusState::Uninitialized {
                    self.state = BusState::Suspended;
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &B {
        &self.bus
    }
}
