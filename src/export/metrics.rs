use super::{CycleReport, Sink};
use crate::error::SinkError;
use crate::sensor::Reading;
use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, Registry, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

/// Histogram bucket edges in µg/m³: 0, 5, ..., 100.
fn concentration_buckets() -> Result<Vec<f64>, prometheus::Error> {
    prometheus::linear_buckets(0.0, 5.0, 21)
}

/// Latest gauge values, as served by `/v1/current`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentSnapshot {
    pub pm25: f64,
    pub pm10: f64,
}

/// The exporter's own Prometheus registry. Written by the measurement thread,
/// read by the HTTP responder; the prometheus types are atomic internally.
pub struct AirQualityMetrics {
    registry: Registry,
    pm25: Gauge,
    pm10: Gauge,
    pm25_measurements: Histogram,
    pm10_measurements: Histogram,
}

impl AirQualityMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let pm25 = Gauge::new("PM25", "Particulate Matter of diameter less than 2.5 microns. Measured in micrograms per cubic metre")?;
        let pm10 = Gauge::new("PM10", "Particulate Matter of diameter less than 10 microns. Measured in micrograms per cubic metre")?;
        let pm25_measurements = Histogram::with_opts(
            HistogramOpts::new("pm25_measurements", "Histogram of Particulate Matter of PM2.5 measurements")
                .buckets(concentration_buckets()?),
        )?;
        let pm10_measurements = Histogram::with_opts(
            HistogramOpts::new("pm10_measurements", "Histogram of Particulate Matter of PM10 measurements")
                .buckets(concentration_buckets()?),
        )?;

        registry.register(Box::new(pm25.clone()))?;
        registry.register(Box::new(pm10.clone()))?;
        registry.register(Box::new(pm25_measurements.clone()))?;
        registry.register(Box::new(pm10_measurements.clone()))?;

        Ok(Self {
            registry,
            pm25,
            pm10,
            pm25_measurements,
            pm10_measurements,
        })
    }

    pub fn record(&self, reading: &Reading) {
        self.pm25.set(reading.pm25);
        self.pm10.set(reading.pm10);
        self.pm25_measurements.observe(reading.pm25);
        // Coarse fraction (PM10 minus the PM2.5 it contains).
        self.pm10_measurements.observe(reading.pm10 - reading.pm25);
    }

    pub fn snapshot(&self) -> CurrentSnapshot {
        CurrentSnapshot {
            pm25: self.pm25.get(),
            pm10: self.pm10.get(),
        }
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

pub struct MetricsSink {
    metrics: Arc<AirQualityMetrics>,
}

impl MetricsSink {
    pub fn new(metrics: Arc<AirQualityMetrics>) -> Self {
        Self { metrics }
    }
}

impl Sink for MetricsSink {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn export(&mut self, report: &CycleReport) -> Result<(), SinkError> {
        self.metrics.record(&report.reading);
        Ok(())
    }
}
