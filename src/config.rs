use crate::cli::Args;
use crate::error::ConfigError;
use crate::export::mqtt::{normalize_prefix, MqttSettings};
use crate::policy::Country;
use crate::sensor::SamplerSettings;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SensorSettings {
    pub device: PathBuf,
    pub sampler: SamplerSettings,
}

#[derive(Debug, Clone)]
pub struct MetricsSettings {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub country: Country,
    pub delay: Duration,
    pub sensor: SensorSettings,
    pub metrics: Option<MetricsSettings>,
    pub log: Option<PathBuf>,
    pub mqtt: Option<MqttSettings>,
    pub leds_root: Option<PathBuf>,
    pub verbose: bool,
    pub diagnostics_log: Option<PathBuf>,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let country: Country = args.country.parse()?;
        if args.delay == 0 {
            return Err(ConfigError::InvalidDelay);
        }
        if args.measures == 0 {
            return Err(ConfigError::InvalidMeasures);
        }

        let mqtt = match args.mqtt_hostname {
            Some(host) => {
                let topic_prefix = normalize_prefix(&args.mqtt_base_topic).to_string();
                if topic_prefix.is_empty() {
                    return Err(ConfigError::EmptyTopicPrefix(args.mqtt_base_topic));
                }
                Some(MqttSettings {
                    host,
                    port: args.mqtt_port,
                    client_id: args.mqtt_client_id,
                    username: args.mqtt_username,
                    password: args.mqtt_password,
                    topic_prefix,
                })
            }
            None => None,
        };

        Ok(Self {
            country,
            delay: Duration::from_secs(args.delay),
            sensor: SensorSettings {
                device: args.sensor,
                sampler: SamplerSettings {
                    measures: args.measures,
                    start_delay: Duration::from_secs(args.sensor_start_delay),
                    operation_delay: Duration::from_secs(args.sensor_operation_delay),
                },
            },
            metrics: args.prometheus.then(|| MetricsSettings {
                bind: args.bind,
                port: args.port,
            }),
            log: args.log,
            mqtt,
            leds_root: args.omnia_leds.then_some(args.leds_root),
            verbose: is_verbose(args.debug, env::var("DEBUG").ok().as_deref()),
            diagnostics_log: args.diagnostics_log,
        })
    }
}

/// `DEBUG=true` in the environment turns on verbose logging, like `--debug`.
fn is_verbose(debug_flag: bool, debug_env: Option<&str>) -> bool {
    debug_flag || debug_env.is_some_and(|value| value.trim() == "true")
}
