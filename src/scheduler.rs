
use crate::aqi;
use crate::clock::Clock;
use crate::error::SensorError;
use crate::export::{self, CycleReport, FanOut, SinkOutcome};
use crate::policy::{self, Country};
use crate::sensor::Sampler;
use crate::window::{Pollutant, WindowAggregator};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct CycleOutcome {
    pub report: CycleReport,
    pub sinks: Vec<SinkOutcome>,
}

/// Drives sample → window → AQI → export, then sleeps `delay` and repeats.
pub struct Scheduler {
    country: Country,
    delay: Duration,
    sampler: Sampler,
    windows: WindowAggregator,
    fan_out: FanOut,
    clock: Arc<dyn Clock>,
    cycles: u64,
}

impl Scheduler {
    pub fn new(
        country: Country,
        delay: Duration,
        sampler: Sampler,
        fan_out: FanOut,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let window = policy::window_size(country, delay);
        tracing::info!(
            %country,
            averaging_seconds = policy::averaging_seconds(country),
            delay_secs = delay.as_secs(),
            window,
            sinks = fan_out.len(),
            "measurement schedule ready"
        );
        Self {
            country,
            delay,
            sampler,
            windows: WindowAggregator::new(window),
            fan_out,
            clock,
            cycles: 0,
        }
    }

    pub fn window_capacity(&self) -> usize {
        self.windows.window(Pollutant::Pm25).capacity()
    }

    /// One cycle without the trailing sleep. A sensor failure skips the
    /// window update and every sink.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, SensorError> {
        self.cycles += 1;
        let reading = match self.sampler.sample() {
            Ok(reading) => reading,
            Err(err) => {
                tracing::warn!(cycle = self.cycles, error = %err, "sensor read failed, skipping export");
                return Err(err);
            }
        };

        self.windows.push_reading(&reading);
        let average_pm25 = self.windows.average(Pollutant::Pm25).unwrap_or(reading.pm25);
        let average_pm10 = self.windows.average(Pollutant::Pm10).unwrap_or(reading.pm10);
        let window_len = self.windows.window(Pollutant::Pm25).len();
        tracing::debug!(window_len, capacity = self.window_capacity(), "window updated");

        let result = aqi::compute(average_pm25, average_pm10, self.country);
        if !result.is_defined() {
            tracing::warn!(average_pm25, average_pm10, country = %self.country, "averages outside the AQI table");
        }
        tracing::info!(
            cycle = self.cycles,
            pm25 = reading.pm25,
            pm10 = reading.pm10,
            average_pm25,
            average_pm10,
            aqi = result.index,
            level = result.level_name(),
            "measurement"
        );

        let report = CycleReport {
            country: self.country,
            reading,
            average_pm25,
            average_pm10,
            window_len,
            aqi: result,
        };
        let sinks = self.fan_out.export(&report);
        Ok(CycleOutcome { report, sinks })
    }

    /// Runs cycles until the process exits.
    pub fn run(mut self) {
        loop {
            // Sensor failures are logged by run_cycle; the next cycle is the retry.
            if let Ok(outcome) = self.run_cycle() {
                self.log_outcome(&outcome);
            }
            self.clock.sleep(self.delay);
        }
    }

    fn log_outcome(&self, outcome: &CycleOutcome) {
        let failed = export::failed_sinks(&outcome.sinks);
        if failed.is_empty() {
            tracing::debug!(cycle = self.cycles, sinks = outcome.sinks.len(), "cycle exported");
        } else {
            tracing::warn!(
                cycle = self.cycles,
                aqi = outcome.report.aqi.index,
                failed_sinks = ?failed,
                total = outcome.sinks.len(),
                "cycle exported with failing sinks"
            );
        }
    }
}
