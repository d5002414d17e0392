use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported country code {0:?} (expected one of CN, EU, US)")]
    UnsupportedCountry(String),
    #[error("measurement delay must be at least 1 second")]
    InvalidDelay,
    #[error("number of measures must be at least 1")]
    InvalidMeasures,
    #[error("MQTT base topic {0:?} is empty once trailing '/' are removed")]
    EmptyTopicPrefix(String),
}

/// Failures talking to the particulate sensor. Local to one measurement cycle.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor I/O on {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out waiting for a reply from {device}")]
    Timeout { device: String },
    #[error("bad checksum in reply from {device} (expected {expected:#04x}, got {actual:#04x})")]
    Checksum {
        device: String,
        expected: u8,
        actual: u8,
    },
    #[error("sensor returned an unusable reading (pm25={pm25}, pm10={pm10})")]
    InvalidReading { pm25: f64, pm10: f64 },
}

/// Failures of a single export sink. Never propagated past the fan-out.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to append to {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },
    #[error("failed to write indicator {path}: {source}")]
    Indicator {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
