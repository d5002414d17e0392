pub mod csv_log;
pub mod indicators;
pub mod metrics;
pub mod mqtt;

use crate::aqi::AqiResult;
use crate::error::SinkError;
use crate::policy::Country;
use crate::sensor::Reading;
use serde::Serialize;

/// Everything one measurement cycle produced, handed to every sink.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub country: Country,
    pub reading: Reading,
    pub average_pm25: f64,
    pub average_pm10: f64,
    pub window_len: usize,
    pub aqi: AqiResult,
}

pub trait Sink: Send {
    fn name(&self) -> &'static str;
    fn export(&mut self, report: &CycleReport) -> Result<(), SinkError>;
}

#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: &'static str,
    pub result: Result<(), SinkError>,
}

impl SinkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Names of the sinks whose export failed, in fan-out order.
pub fn failed_sinks(outcomes: &[SinkOutcome]) -> Vec<&'static str> {
    outcomes
        .iter()
        .filter(|outcome| !outcome.is_ok())
        .map(|outcome| outcome.sink)
        .collect()
}

/// Runs every configured sink in order; a failing sink is logged and does not
/// stop the ones after it.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn Sink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn Sink>) {
        tracing::info!(sink = sink.name(), "export sink enabled");
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn export(&mut self, report: &CycleReport) -> Vec<SinkOutcome> {
        self.sinks
            .iter_mut()
            .map(|sink| {
                let result = sink.export(report);
                match &result {
                    Ok(()) => tracing::debug!(sink = sink.name(), "export complete"),
                    Err(err) => tracing::warn!(sink = sink.name(), error=%err, "export failed"),
                }
                SinkOutcome {
                    sink: sink.name(),
                    result,
                }
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{report, RecordingSink};
    use super::*;

    #[test]
    fn empty_fan_out_exports_nothing() {
        let mut fan_out = FanOut::new();
        assert!(fan_out.is_empty());
        assert!(fan_out.export(&report(Country::Us, 11.0, 21.0)).is_empty());
    }

    #[test]
    fn failing_sink_does_not_stop_later_sinks() {
        let first = RecordingSink::new("first", false);
        let broken = RecordingSink::new("broken", true);
        let last = RecordingSink::new("last", false);
        let mut fan_out = FanOut::new();
        fan_out.push(Box::new(first.clone()));
        fan_out.push(Box::new(broken.clone()));
        fan_out.push(Box::new(last.clone()));

        let outcomes = fan_out.export(&report(Country::Us, 11.0, 21.0));

        let summary: Vec<(&str, bool)> = outcomes.iter().map(|o| (o.sink, o.is_ok())).collect();
        assert_eq!(summary, vec![("first", true), ("broken", false), ("last", true)]);
        assert_eq!(failed_sinks(&outcomes), vec!["broken"]);
        for sink in [&first, &broken, &last] {
            assert_eq!(*sink.seen.lock().unwrap(), vec![46]);
        }
    }

    #[test]
    fn no_failed_sinks_when_all_succeed() {
        let mut fan_out = FanOut::new();
        fan_out.push(Box::new(RecordingSink::new("only", false)));
        let outcomes = fan_out.export(&report(Country::Eu, 11.0, 21.0));
        assert!(failed_sinks(&outcomes).is_empty());
    }
}
