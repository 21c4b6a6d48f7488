//! Metrics Collector: periodically samples schedule/queue state and
//! reports it to the configured [`MetricsSink`], independent of the
//! per-job counters the worker runtime records as jobs run.
//!
//! Per spec §4.7, every expected gauge bucket (each configured job type
//! crossed with each known state) is reported on every pass, explicitly
//! zeroed when the store/queue has no matching rows. A gauge sink has no
//! concept of "this series no longer applies" — if a queue drains to
//! empty and the collector simply stops reporting it, the last non-zero
//! value sits at the sink forever. Sampling every bucket unconditionally
//! is what makes a drained queue actually show up as zero.

use std::sync::Arc;

use provider_sched_core::{JobType, MetricsSink, QueueAdapter, SchedulerError};
use provider_sched_postgres::PgScheduleStore;

pub struct MetricsCollector<Q> {
    store: PgScheduleStore,
    queue: Q,
    sink: Arc<dyn MetricsSink>,
    job_types: Vec<JobType>,
}

impl<Q: QueueAdapter> MetricsCollector<Q> {
    pub fn new(
        store: PgScheduleStore,
        queue: Q,
        sink: Arc<dyn MetricsSink>,
        job_types: Vec<JobType>,
    ) -> Self {
        MetricsCollector {
            store,
            queue,
            sink,
            job_types,
        }
    }

    /// States a `scheduler_queue_jobs` gauge is tracked for. `"running"` is
    /// the queue adapter's status column value; `oldest_age_seconds` uses
    /// `"active"` as its synonym (see `PgQueueAdapter::oldest_age_seconds`).
    const QUEUE_STATES: [&'static str; 2] = ["queued", "running"];

    /// Sample `job_schedule_state` (paused counts) and `queue_job`
    /// (created/active counts and oldest-age, bucketed by queue name) and
    /// report one gauge per job type for each, explicitly zeroing buckets
    /// with no matching rows so a drained queue reads as zero rather than
    /// keeping its last sampled value.
    pub async fn collect_once(&self) -> Result<(), SchedulerError> {
        for job_type in &self.job_types {
            let paused = self.store.count_paused(*job_type).await?;
            self.sink.gauge(
                "scheduler_paused_schedules",
                paused as f64,
                &[("job_type", job_type.as_str())],
            );
        }

        let state_counts = self.queue.count_states().await?;
        if state_counts.is_empty() {
            tracing::debug!("queue reported no rows in any state; queue may be empty or misconfigured");
        }
        for job_type in &self.job_types {
            for state in Self::QUEUE_STATES {
                let count = count_for(&state_counts, job_type.as_str(), state);
                self.sink.gauge(
                    "scheduler_queue_jobs",
                    count as f64,
                    &[("job_type", job_type.as_str()), ("state", state)],
                );
            }
        }

        for (state, gauge_name) in [
            ("queued", "scheduler_oldest_queued_age_seconds"),
            ("active", "scheduler_oldest_in_flight_age_seconds"),
        ] {
            let ages = self.queue.oldest_age_seconds(state).await?;
            for job_type in &self.job_types {
                let age_seconds = age_for(&ages, job_type.as_str());
                self.sink
                    .gauge(gauge_name, age_seconds as f64, &[("job_type", job_type.as_str())]);
            }
        }

        Ok(())
    }
}

/// Looks up `(queue_name, state)` in a `count_states` result, defaulting
/// to zero when the queue has no rows in that state.
fn count_for(state_counts: &[(String, String, i64)], queue_name: &str, state: &str) -> i64 {
    state_counts
        .iter()
        .find(|(name, s, _)| name == queue_name && s == state)
        .map_or(0, |(_, _, n)| *n)
}

/// Looks up `queue_name` in an `oldest_age_seconds` result, defaulting to
/// zero when the queue has no rows in the sampled state.
fn age_for(ages: &[(String, i64)], queue_name: &str) -> i64 {
    ages.iter().find(|(name, _)| name == queue_name).map_or(0, |(_, age)| *age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_sched_core::SendOptions;
    use provider_sched_testing::FakeQueueAdapter;

    // `PgScheduleStore` needs a reachable pool even for `count_paused`, so
    // these tests exercise only the queue-side sampling directly against
    // the fake adapter rather than constructing a full collector.

    #[tokio::test]
    async fn oldest_age_reports_nothing_for_an_empty_queue() {
        let queue = FakeQueueAdapter::new();
        queue.create_queue("deal").await.unwrap();
        let ages = queue.oldest_age_seconds("queued").await.unwrap();
        assert!(ages.is_empty());
    }

    #[tokio::test]
    async fn count_states_reflects_queued_jobs() {
        let queue = FakeQueueAdapter::new();
        queue.create_queue("deal").await.unwrap();
        queue
            .send("deal", serde_json::json!({}), SendOptions::default())
            .await
            .unwrap();

        let counts = queue.count_states().await.unwrap();
        assert_eq!(counts, vec![("deal".to_string(), "queued".to_string(), 1)]);
    }

    #[test]
    fn count_for_defaults_to_zero_when_bucket_absent() {
        let counts = vec![("deal".to_string(), "queued".to_string(), 3)];
        assert_eq!(count_for(&counts, "deal", "queued"), 3);
        assert_eq!(count_for(&counts, "deal", "running"), 0);
        assert_eq!(count_for(&counts, "retrieval", "queued"), 0);
    }

    #[test]
    fn age_for_defaults_to_zero_when_queue_absent() {
        let ages = vec![("deal".to_string(), 42)];
        assert_eq!(age_for(&ages, "deal"), 42);
        assert_eq!(age_for(&ages, "retrieval"), 0);
    }
}
