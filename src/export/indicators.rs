use super::{CycleReport, Sink};
use crate::aqi;
use crate::error::SinkError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PM25_CHANNEL: &str = "omnia-led:user1";
pub const PM10_CHANNEL: &str = "omnia-led:user2";

/// One sysfs LED directory (`autonomous` and `color` attributes).
#[derive(Debug, Clone)]
pub struct IndicatorChannel {
    dir: PathBuf,
}

impl IndicatorChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Takes the LED out of autonomous mode and sets its color.
    pub fn set_color(&self, rgb: &str) -> Result<(), SinkError> {
        self.write_attribute("autonomous", "0\n")?;
        self.write_attribute("color", &format!("{rgb}\n"))
    }

    fn write_attribute(&self, name: &str, value: &str) -> Result<(), SinkError> {
        let path = self.dir.join(name);
        // sysfs attributes exist already; never create regular files in their place.
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .and_then(|mut file| file.write_all(value.as_bytes()))
            .map_err(|source| SinkError::Indicator { path, source })
    }
}

/// Colors both Turris Omnia user LEDs by the current AQI level.
pub struct IndicatorSink {
    pm25: IndicatorChannel,
    pm10: IndicatorChannel,
}

impl IndicatorSink {
    pub fn new(leds_root: &Path) -> Self {
        Self::with_channels(
            IndicatorChannel::new(leds_root.join(PM25_CHANNEL)),
            IndicatorChannel::new(leds_root.join(PM10_CHANNEL)),
        )
    }

    pub fn with_channels(pm25: IndicatorChannel, pm10: IndicatorChannel) -> Self {
        Self { pm25, pm10 }
    }
}

impl Sink for IndicatorSink {
    fn name(&self) -> &'static str {
        "indicators"
    }

    fn export(&mut self, report: &CycleReport) -> Result<(), SinkError> {
        let color = aqi::color_for(report.country, report.aqi.level_name());
        if color.is_empty() {
            tracing::debug!(level = report.aqi.level_name(), "no indicator color, leaving LEDs untouched");
            return Ok(());
        }

        let pm25 = self.pm25.set_color(color);
        let pm10 = self.pm10.set_color(color);
        pm25.and(pm10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::report;
    use crate::policy::Country;
    use std::fs;

    fn led_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for channel in [PM25_CHANNEL, PM10_CHANNEL] {
            let dir = root.path().join(channel);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("autonomous"), "1\n").unwrap();
            fs::write(dir.join("color"), "255 255 255\n").unwrap();
        }
        root
    }

    fn read(root: &Path, channel: &str, attribute: &str) -> String {
        fs::read_to_string(root.join(channel).join(attribute)).unwrap()
    }

    #[test]
    fn writes_autonomous_off_and_level_color() {
        let root = led_root();
        let mut sink = IndicatorSink::new(root.path());

        sink.export(&report(Country::Us, 11.0, 21.0)).unwrap();

        for channel in [PM25_CHANNEL, PM10_CHANNEL] {
            assert_eq!(read(root.path(), channel, "autonomous"), "0\n");
            assert_eq!(read(root.path(), channel, "color"), "121 227 71\n");
        }
    }

    #[test]
    fn undefined_level_leaves_leds_untouched() {
        let root = led_root();
        let mut sink = IndicatorSink::new(root.path());

        sink.export(&report(Country::Us, 600.0, 21.0)).unwrap();

        assert_eq!(read(root.path(), PM25_CHANNEL, "autonomous"), "1\n");
        assert_eq!(read(root.path(), PM10_CHANNEL, "color"), "255 255 255\n");
    }

    #[test]
    fn missing_channel_does_not_block_the_other() {
        let root = led_root();
        fs::remove_dir_all(root.path().join(PM25_CHANNEL)).unwrap();
        let mut sink = IndicatorSink::new(root.path());

        let err = sink.export(&report(Country::Us, 11.0, 21.0)).unwrap_err();

        assert!(matches!(err, SinkError::Indicator { .. }));
        assert!(!root.path().join(PM25_CHANNEL).exists());
        assert_eq!(read(root.path(), PM10_CHANNEL, "color"), "121 227 71\n");
    }
}
