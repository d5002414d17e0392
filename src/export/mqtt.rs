use super::{CycleReport, Sink};
use crate::error::SinkError;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
}

/// Fire-and-forget publish used by the sink from the measurement thread.
pub trait Publisher: Send {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), SinkError>;
}

#[derive(Debug, Clone)]
pub struct RumqttcPublisher {
    client: AsyncClient,
}

impl Publisher for RumqttcPublisher {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), SinkError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|err| SinkError::Publish {
                topic: topic.to_string(),
                reason: err.to_string(),
            })
    }
}

/// Creates the client and drives its event loop on the current runtime.
/// Connection problems are logged and retried by the loop; publishes made
/// while disconnected are queued up to the request channel capacity.
pub fn spawn_client(settings: &MqttSettings) -> (RumqttcPublisher, JoinHandle<()>) {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(Duration::from_secs(10));
    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        options.set_credentials(username, password);
    }
    let (client, mut eventloop) = AsyncClient::new(options, 16);
    let host = settings.host.clone();
    let port = settings.port;
    let handle = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(event) => tracing::trace!(?event, "mqtt event"),
                Err(err) => {
                    tracing::warn!(%host, port, error = %err, "mqtt event loop error");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
    (RumqttcPublisher { client }, handle)
}

/// Strips trailing `/` so `"aqi/"` and `"aqi"` address the same topics.
pub fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_end_matches('/')
}

pub struct MqttSink<P> {
    publisher: P,
    prefix: String,
}

impl<P: Publisher> MqttSink<P> {
    pub fn new(publisher: P, prefix: &str) -> Self {
        Self {
            publisher,
            prefix: normalize_prefix(prefix).to_string(),
        }
    }

    pub fn messages(&self, report: &CycleReport) -> Vec<(String, String)> {
        let level = report
            .aqi
            .level
            .map(|level| level.to_string())
            .unwrap_or_else(|| "{}".to_string());
        vec![
            (self.topic("aqi"), report.aqi.index.to_string()),
            (self.topic("level"), level),
            (self.topic("current_pm25"), format!("{:.1}", report.reading.pm25)),
            (self.topic("current_pm10"), format!("{:.1}", report.reading.pm10)),
        ]
    }

    fn topic(&self, leaf: &str) -> String {
        format!("{}/{}", self.prefix, leaf)
    }
}

impl<P: Publisher> Sink for MqttSink<P> {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn export(&mut self, report: &CycleReport) -> Result<(), SinkError> {
        let mut first_error = None;
        for (topic, payload) in self.messages(report) {
            if let Err(err) = self.publisher.publish(&topic, payload) {
                tracing::debug!(%topic, error = %err, "mqtt publish rejected");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
