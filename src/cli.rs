use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "aqi-exporter",
    version,
    about = "Measure air quality using an SDS011 sensor"
)]
pub struct Args {
    /// Bind address of the metrics endpoint.
    #[arg(short = 'b', long, env = "AQI_BIND", value_name = "ADDRESS", default_value = "0.0.0.0")]
    pub bind: String,
    #[arg(short = 'p', long, env = "AQI_PORT", default_value_t = 8000)]
    pub port: u16,
    /// AQI standard: CN (Mainland China), EU (CAQI) or US.
    #[arg(short = 'c', long, env = "AQI_COUNTRY", default_value = "US")]
    pub country: String,
    /// Seconds to pause between two measurement cycles.
    #[arg(short = 'd', long, env = "AQI_DELAY", value_name = "SECONDS", default_value_t = 10)]
    pub delay: u64,
    /// CSV file the readings are appended to.
    #[arg(short = 'l', long, env = "AQI_LOG", value_name = "FILE")]
    pub log: Option<PathBuf>,
    /// Consecutive sensor queries averaged into one reading.
    #[arg(short = 'm', long, env = "AQI_MEASURES", value_name = "N", default_value_t = 3)]
    pub measures: u32,
    #[arg(short = 'n', long, env = "AQI_MQTT_HOSTNAME", value_name = "HOST")]
    pub mqtt_hostname: Option<String>,
    #[arg(short = 'r', long, env = "AQI_MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,
    #[arg(short = 'i', long, env = "AQI_MQTT_BASE_TOPIC", value_name = "TOPIC", default_value = "sds011")]
    pub mqtt_base_topic: String,
    #[arg(long, env = "AQI_MQTT_CLIENT_ID", default_value = "aqi-exporter")]
    pub mqtt_client_id: String,
    #[arg(long, env = "AQI_MQTT_USERNAME")]
    pub mqtt_username: Option<String>,
    #[arg(long, env = "AQI_MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,
    /// Set the Turris Omnia user LEDs (#1 for PM2.5, #2 for PM10) to the AQI level color.
    #[arg(short = 'o', long, env = "AQI_OMNIA_LEDS", default_value_t = false)]
    pub omnia_leds: bool,
    #[arg(long, env = "AQI_LEDS_ROOT", default_value = "/sys/class/leds")]
    pub leds_root: PathBuf,
    /// Serial device of the SDS011.
    #[arg(short = 's', long, env = "AQI_SENSOR", value_name = "FILE", default_value = "/dev/ttyUSB0")]
    pub sensor: PathBuf,
    /// Seconds to let the sensor finish a query or go to sleep.
    #[arg(short = 'e', long, env = "AQI_SENSOR_OPERATION_DELAY", value_name = "SECONDS", default_value_t = 1)]
    pub sensor_operation_delay: u64,
    /// Seconds to let the fan spin up after waking the sensor.
    #[arg(short = 't', long, env = "AQI_SENSOR_START_DELAY", value_name = "SECONDS", default_value_t = 5)]
    pub sensor_start_delay: u64,
    /// Verbose logging, including raw sensor samples.
    #[arg(
        short = 'f',
        long,
        env = "AQI_DEBUG",
        value_name = "BOOL",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_bool,
        action = ArgAction::Set
    )]
    pub debug: bool,
    /// Expose metrics in Prometheus format.
    #[arg(
        short = 'P',
        long,
        env = "AQI_PROMETHEUS",
        value_name = "BOOL",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_bool,
        action = ArgAction::Set
    )]
    pub prometheus: bool,
    /// Also append log events to this file.
    #[arg(long, env = "AQI_DIAGNOSTICS_LOG", value_name = "FILE")]
    pub diagnostics_log: Option<PathBuf>,
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        other => Err(format!("{other} is not a valid boolean value")),
    }
}

#[cfg(test)]
pub mod testing {
    use super::Args;
    use clap::{CommandFactory, FromArgMatches};

    /// Parses `args` ignoring every `AQI_*` variable of the calling shell.
    pub fn parse_without_env(args: &[&str]) -> Result<Args, clap::Error> {
        let command = Args::command().mut_args(|arg| arg.env(None::<&'static str>));
        let matches =
            command.try_get_matches_from(std::iter::once("aqi-exporter").chain(args.iter().copied()))?;
        Args::from_arg_matches(&matches)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::parse_without_env;
    use super::*;

    fn parse(args: &[&str]) -> Args {
        parse_without_env(args).unwrap()
    }

    #[test]
    fn defaults_match_the_documented_flags() {
        let args = parse(&[]);
        assert_eq!(args.bind, "0.0.0.0");
        assert_eq!(args.port, 8000);
        assert_eq!(args.country, "US");
        assert_eq!(args.delay, 10);
        assert_eq!(args.measures, 3);
        assert_eq!(args.mqtt_port, 1883);
        assert_eq!(args.mqtt_base_topic, "sds011");
        assert_eq!(args.sensor, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(args.sensor_operation_delay, 1);
        assert_eq!(args.sensor_start_delay, 5);
        assert!(args.log.is_none());
        assert!(args.mqtt_hostname.is_none());
        assert!(!args.omnia_leds);
        assert!(!args.debug);
        assert!(!args.prometheus);
    }

    #[test]
    fn short_flags() {
        let args = parse(&[
            "-c", "eu", "-d", "60", "-m", "5", "-n", "broker.lan", "-i", "home/air/", "-o", "-l",
            "/tmp/aqi.csv",
        ]);
        assert_eq!(args.country, "eu");
        assert_eq!(args.delay, 60);
        assert_eq!(args.measures, 5);
        assert_eq!(args.mqtt_hostname.as_deref(), Some("broker.lan"));
        assert_eq!(args.mqtt_base_topic, "home/air/");
        assert!(args.omnia_leds);
        assert_eq!(args.log, Some(PathBuf::from("/tmp/aqi.csv")));
    }

    #[test]
    fn boolean_flags_take_optional_values() {
        assert!(parse(&["-P"]).prometheus);
        assert!(parse(&["--prometheus", "yes"]).prometheus);
        assert!(!parse(&["-P", "N"]).prometheus);
        assert!(parse(&["--debug=t"]).debug);
        assert!(parse_without_env(&["--debug", "maybe"]).is_err());
    }

    #[test]
    fn parse_bool_accepts_both_spellings() {
        for value in ["true", "T", "1", "Yes", "y"] {
            assert_eq!(parse_bool(value), Ok(true), "{value}");
        }
        for value in ["false", "F", "0", "NO", "n"] {
            assert_eq!(parse_bool(value), Ok(false), "{value}");
        }
        assert!(parse_bool("").is_err());
    }
}
