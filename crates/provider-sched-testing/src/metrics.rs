//! Recording [`MetricsSink`] double: keeps every call so tests can assert
//! on what was reported instead of just that nothing panicked.

use provider_sched_core::MetricsSink;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMetric {
    pub name: String,
    pub value: f64,
    pub labels: Vec<(String, String)>,
}

#[derive(Default)]
pub struct RecordingMetricsSink {
    recorded: Mutex<Vec<RecordedMetric>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        RecordingMetricsSink::default()
    }

    pub fn recorded(&self) -> Vec<RecordedMetric> {
        self.recorded.lock().expect("metrics sink mutex poisoned").clone()
    }

    fn record(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.recorded
            .lock()
            .expect("metrics sink mutex poisoned")
            .push(RecordedMetric {
                name: name.to_string(),
                value,
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn counter(&self, name: &str, value: u64, labels: &[(&str, &str)]) {
        self.record(name, value as f64, labels);
    }

    fn gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.record(name, value, labels);
    }

    fn histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.record(name, value, labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_call_kind() {
        let sink = RecordingMetricsSink::new();
        sink.counter("jobs_total", 3, &[("job_type", "deal")]);
        sink.gauge("paused", 2.0, &[("job_type", "deal")]);
        sink.histogram("duration_seconds", 0.5, &[]);

        let recorded = sink.recorded();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].name, "jobs_total");
        assert_eq!(recorded[0].value, 3.0);
        assert_eq!(recorded[1].name, "paused");
        assert_eq!(recorded[2].name, "duration_seconds");
    }
}
