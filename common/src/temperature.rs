use crate::{
    config::TemperatureConfig,
    ports::{ClockSource, TemperatureSensor},
    types::TemperatureReadings,
};

/// Samples interior and exterior temperature and flags readings outside the
/// comfort band.
///
/// Readings are taken at face value: a disconnected thermistor reporting 0
/// is indistinguishable from a cold tank.
#[derive(Debug, Clone)]
pub struct TemperatureMonitor {
    config: TemperatureConfig,
}

impl TemperatureMonitor {
    pub fn new(config: TemperatureConfig) -> Self {
        Self { config }
    }

    pub fn sample<S, C>(&self, sensor: &mut S, clock: &mut C) -> TemperatureReadings
    where
        S: TemperatureSensor + ?Sized,
        C: ClockSource + ?Sized,
    {
        TemperatureReadings {
            interior_c: sensor.read_averaged(self.config.samples),
            exterior_c: clock.ambient_temperature_c(),
        }
    }

    pub fn is_warning(&self, interior_c: f32) -> bool {
        interior_c < self.config.comfort_min_c || interior_c > self.config.comfort_max_c
    }
}

/// Mean of the raw ADC reads that actually succeeded. Failed reads are left
/// out instead of counting as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawAverage {
    total: u64,
    count: u32,
}

impl RawAverage {
    pub fn push(&mut self, raw: u16) {
        self.total += u64::from(raw);
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// `None` when every read failed.
    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| self.total as f32 / self.count as f32)
    }
}
