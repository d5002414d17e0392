use super::{CycleReport, Sink};
use crate::error::SinkError;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Appends `timestamp,pm25,pm10,aqi_index` per cycle. The file is reopened
/// every time so it can be rotated underneath the exporter.
pub struct CsvLogSink {
    path: PathBuf,
}

impl CsvLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, report: &CycleReport) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record([
                report.reading.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format!("{:.1}", report.reading.pm25),
                format!("{:.1}", report.reading.pm10),
                report.aqi.index.to_string(),
            ])
            .map_err(io::Error::from)?;
        writer.flush()
    }
}

impl Sink for CsvLogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn export(&mut self, report: &CycleReport) -> Result<(), SinkError> {
        self.append(report).map_err(|source| SinkError::Log {
            path: self.path.clone(),
            source,
        })
    }
}
