mod aqi;
mod cli;
mod clock;
mod config;
mod error;
mod export;
mod http;
mod policy;
mod scheduler;
mod sensor;
mod window;

use crate::cli::Args;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::export::csv_log::CsvLogSink;
use crate::export::indicators::IndicatorSink;
use crate::export::metrics::{AirQualityMetrics, MetricsSink};
use crate::export::mqtt::{self as mqtt_export, MqttSink};
use crate::export::FanOut;
use crate::scheduler::Scheduler;
use crate::sensor::sds011::Sds011;
use crate::sensor::Sampler;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(config: &Config) -> Result<()> {
    let default_filter = if config.verbose {
        "debug,aqi_exporter=debug"
    } else {
        "info,aqi_exporter=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let diagnostics = match &config.diagnostics_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open diagnostics log {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(diagnostics)
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

async fn wait_for(handle: Option<JoinHandle<()>>, task: &str) {
    match handle {
        Some(handle) => {
            if let Err(err) = handle.await {
                tracing::error!(task, error=%err, "task panicked");
            }
        }
        None => std::future::pending::<()>().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args(Args::parse())?;
    init_tracing(&config)?;

    let metrics = match &config.metrics {
        Some(_) => Some(Arc::new(
            AirQualityMetrics::new().context("failed to build metrics registry")?,
        )),
        None => None,
    };

    let mut fan_out = FanOut::new();
    if let Some(metrics) = &metrics {
        fan_out.push(Box::new(MetricsSink::new(metrics.clone())));
    }
    if let Some(leds_root) = &config.leds_root {
        fan_out.push(Box::new(IndicatorSink::new(leds_root)));
    }
    if let Some(path) = &config.log {
        fan_out.push(Box::new(CsvLogSink::new(path.clone())));
    }
    let mqtt_handle = match &config.mqtt {
        Some(settings) => {
            let (publisher, handle) = mqtt_export::spawn_client(settings);
            tracing::info!(host=%settings.host, port=settings.port, prefix=%settings.topic_prefix, "mqtt client started");
            fan_out.push(Box::new(MqttSink::new(publisher, &settings.topic_prefix)));
            Some(handle)
        }
        None => None,
    };

    if fan_out.is_empty() {
        tracing::warn!("no export enabled; readings will only be logged");
    }

    let http_handle = match (&config.metrics, &metrics) {
        (Some(settings), Some(metrics)) => {
            let app = http::router(http::HttpState {
                metrics: metrics.clone(),
            });
            let listener = tokio::net::TcpListener::bind((settings.bind.as_str(), settings.port))
                .await
                .with_context(|| format!("failed to bind metrics endpoint {}:{}", settings.bind, settings.port))?;
            tracing::info!(bind=%settings.bind, port=settings.port, "metrics HTTP listening");
            Some(tokio::spawn(async move {
                if let Err(err) = axum::serve(listener, app).await {
                    tracing::error!(error=%err, "metrics HTTP server exited");
                }
            }))
        }
        _ => None,
    };

    let sensor = Sds011::open(&config.sensor.device)
        .with_context(|| format!("failed to open sensor {}", config.sensor.device.display()))?;
    tracing::info!(device=%config.sensor.device.display(), country=%config.country, "sensor opened");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sampler = Sampler::new(Box::new(sensor), clock.clone(), config.sensor.sampler);
    let scheduler = Scheduler::new(config.country, config.delay, sampler, fan_out, clock);

    let (done_tx, done_rx) = oneshot::channel::<()>();
    std::thread::Builder::new()
        .name("aqi-cycle".to_string())
        .spawn(move || {
            // Dropped on return or panic, which wakes `done_rx`.
            let _done = done_tx;
            scheduler.run();
        })
        .context("failed to spawn measurement thread")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = done_rx => {
            return Err(anyhow!("measurement thread stopped"));
        }
        _ = wait_for(mqtt_handle, "mqtt") => {}
        _ = wait_for(http_handle, "http") => {}
    }

    Ok(())
}
