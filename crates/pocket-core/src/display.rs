//! Display port consumed by the controller
//!
//! Layout, fonts and pixel output live behind this trait. The controller only
//! decides *when* the panel is powered and *what* is shown.

use crate::menu::MenuView;
use crate::sensors::SensorReading;

/// Trait for the small status display.
///
/// Every call is a bus transaction; the controller prepares the bus for the
/// display class before invoking any of these.
pub trait DisplayPort {
    type Error: core::fmt::Debug;

    fn power(&mut self, on: bool) -> Result<(), Self::Error>;

    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Show the big CO2 figure with temperature and humidity.
    fn render_current(&mut self, reading: &SensorReading) -> Result<(), Self::Error>;

    /// Show a short status line such as "Waking up...".
    fn render_message(&mut self, text: &str) -> Result<(), Self::Error>;

    fn render_menu(&mut self, view: &MenuView) -> Result<(), Self::Error>;
}
