//! Metrics seam. No exporter is bundled — the scheduler depends only on
//! this trait, and a binary wires in whatever backend it wants (the same
//! shape as `ActiveProviderSource`: the crate owns the interface, not the
//! implementation).

/// Destination for the scheduler's operational metrics (spec §4.7 / §8
//  observability notes).
pub trait MetricsSink: Send + Sync {
    /// Increment a counter by `value`, tagged with `labels` (key, value).
    fn counter(&self, name: &str, value: u64, labels: &[(&str, &str)]);

    /// Record an instantaneous gauge reading.
    fn gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]);

    /// Record an observation into a histogram (e.g. job duration seconds).
    fn histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]);
}

/// A [`MetricsSink`] that discards everything. Useful as a default and in
/// tests that don't care about metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetricsSink;

impl MetricsSink for NoOpMetricsSink {
    fn counter(&self, _name: &str, _value: u64, _labels: &[(&str, &str)]) {}
    fn gauge(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}
    fn histogram(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_all_calls_without_panicking() {
        let sink = NoOpMetricsSink;
        sink.counter("jobs_sent_total", 1, &[("job_type", "deal")]);
        sink.gauge("queue_depth", 42.0, &[("job_type", "deal")]);
        sink.histogram("job_duration_seconds", 1.23, &[("job_type", "deal")]);
    }
}
