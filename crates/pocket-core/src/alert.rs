//! Vibration motor and LED alert patterns
//!
//! Alerts block the control flow while they play; no sensor or display
//! activity overlaps a pattern.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};

use crate::config::AlertMode;

/// Pulse counts and timings for each alert mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPattern {
    pub vibration_pulses: u8,
    pub vibration_ms: u32,
    pub vibration_pause_ms: u32,
    pub led_pairs: u8,
    pub led_ms: u32,
    pub combined_rounds: u8,
    pub combined_led_ms: u32,
}

impl AlertPattern {
    pub const DEFAULT: Self = Self {
        vibration_pulses: 3,
        vibration_ms: 150,
        vibration_pause_ms: 820,
        led_pairs: 4,
        led_ms: 300,
        combined_rounds: 3,
        combined_led_ms: 400,
    };
}

impl Default for AlertPattern {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Trait for whatever plays an alert; the controller only needs this seam.
pub trait AlertPort {
    fn fire(&mut self, mode: AlertMode) -> impl Future<Output = ()>;
}

/// Drives the vibration motor and the green/red LED pair.
pub struct Alerter<P, D> {
    motor: P,
    green: P,
    red: P,
    delay: D,
    pattern: AlertPattern,
}

impl<P: OutputPin, D: DelayNs> Alerter<P, D> {
    pub fn new(motor: P, green: P, red: P, delay: D) -> Self {
        Self::with_pattern(motor, green, red, delay, AlertPattern::DEFAULT)
    }

    pub fn with_pattern(motor: P, green: P, red: P, delay: D, pattern: AlertPattern) -> Self {
        Self {
            motor,
            green,
            red,
            delay,
            pattern,
        }
    }

    /// Drive `pin` high for `ms`, then low.
    async fn pulse(pin: &mut P, delay: &mut D, ms: u32) {
        if let Err(e) = pin.set_high() {
            warn!("Alert output failed to switch on: {:?}", e);
        }
        delay.delay_ms(ms).await;
        if let Err(e) = pin.set_low() {
            warn!("Alert output failed to switch off: {:?}", e);
        }
    }
}

impl<P: OutputPin, D: DelayNs> AlertPort for Alerter<P, D> {
    async fn fire(&mut self, mode: AlertMode) {
        let p = self.pattern;
        debug!("Alert: {:?}", mode);
        match mode {
            AlertMode::Vibration => {
                for _ in 0..p.vibration_pulses {
                    Self::pulse(&mut self.motor, &mut self.delay, p.vibration_ms).await;
                    self.delay.delay_ms(p.vibration_pause_ms).await;
                }
            }
            AlertMode::Led => {
                for _ in 0..p.led_pairs {
                    Self::pulse(&mut self.green, &mut self.delay, p.led_ms).await;
                    Self::pulse(&mut self.red, &mut self.delay, p.led_ms).await;
                }
            }
            AlertMode::Both => {
                for _ in 0..p.combined_rounds {
                    Self::pulse(&mut self.motor, &mut self.delay, p.vibration_ms).await;
                    Self::pulse(&mut self.green, &mut self.delay, p.combined_led_ms).await;
                    Self::pulse(&mut self.red, &mut self.delay, p.combined_led_ms).await;
                }
            }
        }
    }
}
