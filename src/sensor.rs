pub mod sds011;

use crate::clock::Clock;
use crate::error::SensorError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Driver operations the sampler needs from a particulate sensor.
pub trait ParticulateSensor: Send {
    fn wake(&mut self) -> Result<(), SensorError>;
    /// One raw `(pm25, pm10)` measurement in µg/m³.
    fn query(&mut self) -> Result<(f64, f64), SensorError>;
    fn sleep(&mut self) -> Result<(), SensorError>;
}

/// One averaged measurement, produced once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub pm25: f64,
    pub pm10: f64,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerSettings {
    pub measures: u32,
    pub start_delay: Duration,
    pub operation_delay: Duration,
}

pub struct Sampler {
    sensor: Box<dyn ParticulateSensor>,
    clock: Arc<dyn Clock>,
    settings: SamplerSettings,
}

impl Sampler {
    pub fn new(
        sensor: Box<dyn ParticulateSensor>,
        clock: Arc<dyn Clock>,
        settings: SamplerSettings,
    ) -> Self {
        Self {
            sensor,
            clock,
            settings,
        }
    }

    /// Wake, let the fan spin up, take `measures` queries, put the sensor back
    /// to sleep and return the mean rounded to one decimal.
    pub fn sample(&mut self) -> Result<Reading, SensorError> {
        self.sensor.wake()?;
        self.clock.sleep(self.settings.start_delay);

        let (pm25, pm10) = match self.measure() {
            Ok(means) => means,
            Err(err) => {
                if let Err(sleep_err) = self.sensor.sleep() {
                    tracing::debug!(error=%sleep_err, "sensor did not go back to sleep after a failed query");
                }
                return Err(err);
            }
        };

        self.sensor.sleep()?;
        self.clock.sleep(self.settings.operation_delay);

        Ok(Reading {
            pm25,
            pm10,
            timestamp: self.clock.now(),
        })
    }

    fn measure(&mut self) -> Result<(f64, f64), SensorError> {
        let measures = self.settings.measures.max(1);
        let mut total_pm25 = 0.0;
        let mut total_pm10 = 0.0;
        for n in 0..measures {
            let (pm25, pm10) = self.sensor.query()?;
            if !pm25.is_finite() || !pm10.is_finite() || pm25 < 0.0 || pm10 < 0.0 {
                return Err(SensorError::InvalidReading { pm25, pm10 });
            }
            tracing::debug!(n, pm25, pm10, "raw sensor sample");
            total_pm25 += pm25;
            total_pm10 += pm10;
            self.clock.sleep(self.settings.operation_delay);
        }
        Ok((
            round_tenth(total_pm25 / measures as f64),
            round_tenth(total_pm10 / measures as f64),
        ))
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
