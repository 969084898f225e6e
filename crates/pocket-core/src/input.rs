//! Two-button input
//!
//! Deep sleep may disable the GPIO input configuration, so every poll first
//! re-asserts it and only then samples the pins.

use embedded_hal::digital::InputPin;
use log::warn;

/// Button state observed at one polling point. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    None,
    First,
    Second,
    /// Universal cancel signal
    Both,
}

impl ButtonEvent {
    pub const fn from_levels(first: bool, second: bool) -> Self {
        match (first, second) {
            (false, false) => Self::None,
            (true, false) => Self::First,
            (false, true) => Self::Second,
            (true, true) => Self::Both,
        }
    }

    pub const fn is_single(self) -> bool {
        matches!(self, Self::First | Self::Second)
    }

    pub const fn is_cancel(self) -> bool {
        matches!(self, Self::Both)
    }
}

/// Trait for the two buttons.
pub trait ButtonPort {
    /// Re-apply pull-up input configuration to both pins.
    fn configure_inputs(&mut self);

    /// Raw pressed state of (first, second).
    fn pressed(&mut self) -> (bool, bool);

    /// Re-assert the input configuration, then sample and classify.
    fn poll(&mut self) -> ButtonEvent {
        self.configure_inputs();
        let (first, second) = self.pressed();
        ButtonEvent::from_levels(first, second)
    }
}

/// Buttons wired to ground with pull-ups: a low level means pressed.
///
/// `reconfigure` is invoked before every sample to restore the pull-up
/// configuration the platform may have dropped during standby.
pub struct ActiveLowButtons<A, B, F> {
    first: A,
    second: B,
    reconfigure: F,
}

impl<A, B, F> ActiveLowButtons<A, B, F>
where
    A: InputPin,
    B: InputPin,
    F: FnMut(),
{
    pub fn new(first: A, second: B, reconfigure: F) -> Self {
        Self {
            first,
            second,
            reconfigure,
        }
    }
}

impl<A, B, F> ButtonPort for ActiveLowButtons<A, B, F>
where
    A: InputPin,
    B: InputPin,
    F: FnMut(),
{
    fn configure_inputs(&mut self) {
        (self.reconfigure)();
    }

    fn pressed(&mut self) -> (bool, bool) {
        // A pin that cannot be read counts as released
        let first = self.first.is_low().unwrap_or_else(|e| {
            warn!("Button 1 read failed: {:?}", e);
            false
        });
        let second = self.second.is_low().unwrap_or_else(|e| {
            warn!("Button 2 read failed: {:?}", e);
            false
        });
        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    struct Level(bool);

    impl embedded_hal::digital::ErrorType for Level {
        type Error = Infallible;
    }

    impl InputPin for Level {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(ButtonEvent::from_levels(false, false), ButtonEvent::None);
        assert_eq!(ButtonEvent::from_levels(true, false), ButtonEvent::First);
        assert_eq!(ButtonEvent::from_levels(false, true), ButtonEvent::Second);
        assert!(ButtonEvent::from_levels(true, true).is_cancel());
        assert!(!ButtonEvent::Both.is_single());
    }

    #[test]
    fn test_poll_reconfigures_before_reading() {
        let reconfigured = Cell::new(0);
        let mut buttons =
            ActiveLowButtons::new(Level(false), Level(true), || {
                reconfigured.set(reconfigured.get() + 1)
            });
        assert_eq!(buttons.poll(), ButtonEvent::First);
        assert_eq!(buttons.poll(), ButtonEvent::First);
        assert_eq!(reconfigured.get(), 2);
    }
}
