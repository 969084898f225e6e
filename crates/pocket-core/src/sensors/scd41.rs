use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};
use scd4x::Scd4xAsync;

use super::{SensorPort, SensorPowerMode, SensorReading};
use crate::error::SensorError;

const SENSOR: &str = "SCD41";

/// Map a driver failure onto the transient bus error.
///
/// The driver reports NACKs and CRC mismatches alike; either only costs the
/// current cycle, so nothing here faults the sensor for the rest of a run.
fn bus_error<E: core::fmt::Debug>(operation: &'static str) -> impl FnOnce(E) -> SensorError {
    move |e| {
        error!("SCD41 {} failed: {:?}", operation, e);
        SensorError::Bus {
            sensor: SENSOR,
            operation,
        }
    }
}

/// Round a physical value to tenths.
fn tenths(value: f32) -> i32 {
    let scaled = value * 10.0;
    if scaled < 0.0 {
        (scaled - 0.5) as i32
    } else {
        (scaled + 0.5) as i32
    }
}

/// SCD41 photoacoustic CO2 sensor on an async I2C bus.
///
/// The bus speed is managed by the controller; this type only adapts the
/// driver to [`SensorPort`].
pub struct Scd41<I, D> {
    sensor: Scd4xAsync<I, D>,
    calibrated: bool,
    powered_down: bool,
}

impl<I: I2c, D: DelayNs> Scd41<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            sensor: Scd4xAsync::new(i2c, delay),
            calibrated: false,
            powered_down: false,
        }
    }

    /// Enable automatic self-calibration once per power cycle.
    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.sensor
            .set_automatic_self_calibration(true)
            .await
            .map_err(bus_error("enable self-calibration"))?;
        self.calibrated = true;
        info!("SCD41: automatic self-calibration enabled");
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> SensorPort for Scd41<I, D> {
    async fn start(&mut self, mode: SensorPowerMode) -> Result<(), SensorError> {
        if self.powered_down {
            self.sensor.wake_up().await;
            self.powered_down = false;
            info!("SCD41: woken from power-down");
        }
        if !self.calibrated {
            self.initialize().await?;
        }
        match mode {
            SensorPowerMode::Normal => self
                .sensor
                .start_periodic_measurement()
                .await
                .map_err(bus_error("start periodic measurement")),
            SensorPowerMode::LowPower => self
                .sensor
                .start_low_power_periodic_measurements()
                .await
                .map_err(bus_error("start low power measurement")),
        }
    }

    async fn read_sample(&mut self) -> Result<SensorReading, SensorError> {
        let ready = self
            .sensor
            .data_ready_status()
            .await
            .map_err(bus_error("check data ready status"))?;
        if !ready {
            return Err(SensorError::NotReady { sensor: SENSOR });
        }
        let data = self
            .sensor
            .measurement()
            .await
            .map_err(bus_error("read measurement"))?;
        Ok(SensorReading {
            co2_ppm: data.co2,
            temperature_tenths: tenths(data.temperature) as i16,
            humidity_tenths: tenths(data.humidity).max(0) as u16,
        })
    }

    async fn stop(&mut self) -> Result<(), SensorError> {
        self.sensor
            .stop_periodic_measurement()
            .await
            .map_err(bus_error("stop periodic measurement"))
    }

    async fn shutdown(&mut self) -> Result<(), SensorError> {
        self.stop().await?;
        self.sensor
            .power_down()
            .await
            .map_err(bus_error("power down"))?;
        self.powered_down = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorLink;
    use crate::testing::{MockDelay, MockI2c, crc8};
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    fn word(value: u16) -> [u8; 3] {
        let [hi, lo] = value.to_be_bytes();
        [hi, lo, crc8(&[hi, lo])]
    }

    fn words(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| word(*v)).collect()
    }

    #[test]
    fn test_tenths_rounds_both_signs() {
        assert_eq!(tenths(25.04), 250);
        assert_eq!(tenths(25.06), 251);
        assert_eq!(tenths(-3.26), -33);
        assert_eq!(tenths(0.0), 0);
    }

    #[test]
    fn test_read_sample_converts_measurement() {
        let mut i2c = MockI2c::default();
        i2c.responses.push_back(words(&[0x8006]));
        // 500 ppm, 0x6667 ≈ 25 °C, 0x5eb9 ≈ 37 %RH per the datasheet example
        i2c.responses.push_back(words(&[0x01f4, 0x6667, 0x5eb9]));

        let mut sensor = Scd41::new(i2c, MockDelay::default());
        let reading = block_on(sensor.read_sample()).unwrap();
        assert_eq!(reading.co2_ppm, 500);
        assert_eq!(reading.temperature_tenths, 250);
        assert_eq!(reading.humidity_tenths, 370);
    }

    #[test]
    fn test_not_ready_is_transient() {
        let mut i2c = MockI2c::default();
        i2c.responses.push_back(words(&[0x8000]));
        let mut sensor = Scd41::new(i2c, MockDelay::default());
        let err = block_on(sensor.read_sample()).unwrap_err();
        assert_eq!(err, SensorError::NotReady { sensor: SENSOR });
        assert!(err.is_transient());
    }

    #[test]
    fn test_nack_on_start_does_not_fault_the_run() {
        let mut i2c = MockI2c::default();
        i2c.fail_writes = 1;
        let mut link = SensorLink::new(Scd41::new(i2c, MockDelay::default()));

        let err = block_on(link.start(SensorPowerMode::Normal)).unwrap_err();
        assert!(matches!(err, SensorError::Bus { .. }));
        assert!(err.is_transient());
        assert!(!link.is_faulted());

        // The next cycle's start reaches the bus again and succeeds
        block_on(link.start(SensorPowerMode::Normal)).unwrap();
        assert!(!link.is_faulted());
    }

    #[test]
    fn test_shutdown_then_start_wakes_sensor() {
        let mut sensor = Scd41::new(MockI2c::default(), MockDelay::default());
        block_on(sensor.start(SensorPowerMode::Normal)).unwrap();
        block_on(sensor.shutdown()).unwrap();
        assert!(sensor.powered_down);

        block_on(sensor.start(SensorPowerMode::LowPower)).unwrap();
        assert!(!sensor.powered_down);
        assert!(sensor.calibrated);
    }
}
