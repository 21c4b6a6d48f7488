//! Worker Runtime: claims queue jobs, enforces per-provider mutual
//! exclusion and maintenance-window deferral, and dispatches to the
//! registered [`WorkHandler`] under a per-job-type timeout.
//!
//! Follows the state machine in spec §4.6:
//!
//! ```text
//! DEQUEUED ──maintenance?──▶ DEFERRED (re-sent with start_after=resume_at)
//!     │
//!     └──▶ MUTEX_TRY ──fail──▶ REQUEUED (re-sent with start_after=now+lock_retry_seconds)
//!                │
//!                success
//!                ▼
//!           HANDLING ──timeout──▶ ABORTED
//!                │
//!                ▼
//!           { SUCCESS | ERROR } ──▶ RELEASE_MUTEX ──▶ RECORDED
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use dashmap::DashMap;
use provider_sched_core::{
    HandlerOutcome, JobType, MaintenanceWindowEvaluator, MetricsSink, QueueAdapter, QueueJob,
    SchedulerError, SendOptions, WorkHandler, WorkOptions,
};
use provider_sched_postgres::PgMutexStore;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;

/// Per-provider maintenance window configuration, refreshed by whatever
/// populates it (typically the metrics collector or reconciler pass).
pub type MaintenanceWindows = DashMap<String, MaintenanceWindowEvaluator>;

pub struct WorkerRuntime<Q> {
    queue: Q,
    mutex_store: PgMutexStore,
    handlers: HashMap<&'static str, Arc<dyn WorkHandler>>,
    metrics: Arc<dyn MetricsSink>,
    maintenance_windows: Arc<MaintenanceWindows>,
    hostname: String,
}

impl<Q: QueueAdapter> WorkerRuntime<Q> {
    pub fn new(
        queue: Q,
        mutex_store: PgMutexStore,
        metrics: Arc<dyn MetricsSink>,
        maintenance_windows: Arc<MaintenanceWindows>,
        hostname: String,
    ) -> Self {
        WorkerRuntime {
            queue,
            mutex_store,
            handlers: HashMap::new(),
            metrics,
            maintenance_windows,
            hostname,
        }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn WorkHandler>) {
        self.handlers.insert(handler.job_type(), handler);
    }

    /// Claim and process at most one job from `job_type`'s queue. Returns
    /// `true` if a job was claimed (regardless of outcome), `false` if the
    /// queue was empty.
    pub async fn run_once(
        &self,
        job_type: JobType,
        config: &SchedulerConfig,
        shutdown: &CancellationToken,
    ) -> Result<bool, SchedulerError> {
        let options = WorkOptions {
            queue_name: job_type.as_str().to_string(),
            lease_seconds: config.lease_seconds,
        };
        let Some(job) = self.queue.work(options).await? else {
            return Ok(false);
        };

        let sp_address = job
            .data
            .get("sp_address")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let singleton_key = format!("{}:{}", job_type.as_str(), sp_address);

        if job_type.is_per_provider() && !sp_address.is_empty() {
            if let Some(evaluator) = self.maintenance_windows.get(&sp_address) {
                let evaluation = evaluator.evaluate_at(Utc::now());
                if evaluation.in_window {
                    let resume_at = Utc::now() + chrono::Duration::minutes(evaluation.minutes_until_end as i64);
                    tracing::info!(
                        sp_address = %sp_address,
                        job_type = job_type.as_str(),
                        minutes_until_end = evaluation.minutes_until_end,
                        "deferring job, provider is in a maintenance window"
                    );
                    self.requeue(job_type, &job, &singleton_key, resume_at).await?;
                    self.metrics.counter(
                        "scheduler_job_deferred_total",
                        1,
                        &[("job_type", job_type.as_str())],
                    );
                    return Ok(true);
                }
            }
        }

        let job_id = job.id;
        let mutex_held = if job_type.is_per_provider() && !sp_address.is_empty() {
            let acquired = self
                .mutex_store
                .acquire(
                    &sp_address,
                    job_type,
                    job_id,
                    &self.hostname,
                    config.mutex_stale_seconds,
                    Utc::now(),
                )
                .await?;
            if !acquired {
                tracing::info!(
                    sp_address = %sp_address,
                    job_type = job_type.as_str(),
                    "mutex contention, deferring job"
                );
                let retry_at = Utc::now() + chrono::Duration::seconds(config.lock_retry_seconds);
                self.requeue(job_type, &job, &singleton_key, retry_at).await?;
                self.metrics.counter(
                    "scheduler_job_requeued_total",
                    1,
                    &[("job_type", job_type.as_str())],
                );
                return Ok(true);
            }
            true
        } else {
            false
        };

        self.metrics
            .counter("scheduler_job_started_total", 1, &[("job_type", job_type.as_str())]);
        let started = std::time::Instant::now();

        let outcome = self.dispatch(job_type, &job, config, shutdown).await;

        if mutex_held {
            if let Err(err) = self.mutex_store.release(&sp_address, job_id).await {
                tracing::warn!(error = %err, sp_address = %sp_address, "failed to release job mutex");
            }
        }

        self.record_outcome(job_type, &sp_address, &outcome, started.elapsed());

        match &outcome {
            HandlerOutcome::Success => self.queue.complete(job_id).await?,
            HandlerOutcome::Error { reason } | HandlerOutcome::Aborted { reason } => {
                self.queue.fail(job_id, reason).await?
            }
        }

        Ok(true)
    }

    /// Re-send `job`'s payload onto its own queue at `run_at`, preserving
    /// the singleton key, then consume the dequeued job cleanly. Used for
    /// both maintenance deferral and mutex-contention requeue (spec §4.6
    /// steps 1 and the `MUTEX_TRY` failure branch) — neither path ever
    /// invoked the handler, so the original claim is completed rather than
    /// failed.
    async fn requeue(
        &self,
        job_type: JobType,
        job: &QueueJob,
        singleton_key: &str,
        run_at: chrono::DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.queue.complete(job.id).await?;
        self.queue
            .send(
                job_type.as_str(),
                job.data.clone(),
                SendOptions {
                    singleton_key: Some(singleton_key.to_string()),
                    run_at: Some(run_at),
                },
            )
            .await?;
        Ok(())
    }

    async fn dispatch(
        &self,
        job_type: JobType,
        job: &QueueJob,
        config: &SchedulerConfig,
        shutdown: &CancellationToken,
    ) -> HandlerOutcome {
        let Some(handler) = self.handlers.get(job_type.as_str()) else {
            tracing::warn!(job_type = job_type.as_str(), "no handler registered, dropping job");
            return HandlerOutcome::Aborted {
                reason: "no handler registered for job type".to_string(),
            };
        };

        let cancel = shutdown.child_token();
        let timeout = config.job_timeout(job_type);

        tokio::select! {
            result = tokio::time::timeout(timeout, handler.handle(job, &cancel)) => {
                match result {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        cancel.cancel();
                        HandlerOutcome::Aborted {
                            reason: format!("handler exceeded {}s timeout", timeout.as_secs()),
                        }
                    }
                }
            }
            _ = shutdown.cancelled() => {
                cancel.cancel();
                HandlerOutcome::Aborted {
                    reason: "worker shutting down".to_string(),
                }
            }
        }
    }

    fn record_outcome(
        &self,
        job_type: JobType,
        sp_address: &str,
        outcome: &HandlerOutcome,
        duration: StdDuration,
    ) {
        let labels: [(&str, &str); 2] = [("job_type", job_type.as_str()), ("outcome", outcome.label())];
        self.metrics.counter("scheduler_job_completed_total", 1, &labels);
        self.metrics.histogram(
            "scheduler_job_duration_seconds",
            duration.as_secs_f64(),
            &[("job_type", job_type.as_str())],
        );
        if !sp_address.is_empty() {
            tracing::debug!(
                job_type = job_type.as_str(),
                sp_address,
                outcome = outcome.label(),
                duration_seconds = duration.as_secs_f64(),
                "job run recorded"
            );
        }
    }
}

/// Default lease renewal cadence used by long-running handlers that want
/// to heartbeat; exposed as a constant rather than baked into the worker
/// loop since not every handler needs it.
pub const DEFAULT_HEARTBEAT_INTERVAL: StdDuration = StdDuration::from_secs(20);

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provider_sched_core::MaintenanceWindow;
    use provider_sched_postgres::PgMutexStore;
    use provider_sched_testing::{FakeQueueAdapter, RecordingMetricsSink};

    struct AlwaysSucceeds;

    #[async_trait]
    impl WorkHandler for AlwaysSucceeds {
        fn job_type(&self) -> &'static str {
            "deal"
        }
        async fn handle(&self, _job: &QueueJob, _cancel: &CancellationToken) -> HandlerOutcome {
            HandlerOutcome::Success
        }
    }

    struct NeverFinishes;

    #[async_trait]
    impl WorkHandler for NeverFinishes {
        fn job_type(&self) -> &'static str {
            "deal"
        }
        async fn handle(&self, _job: &QueueJob, cancel: &CancellationToken) -> HandlerOutcome {
            cancel.cancelled().await;
            HandlerOutcome::Aborted {
                reason: "cancelled".to_string(),
            }
        }
    }

    // These tests exercise the dispatch/timeout/metrics wiring using the
    // in-memory queue fake; the mutex store still needs a real pool, so
    // tests that don't touch a per-provider job (and thus never acquire
    // the mutex) avoid constructing one. Global job types are used here
    // for that reason.
    /// A lazily-connecting pool: valid to construct without a reachable
    /// database, since the tests that use it never dispatch a per-provider
    /// job (the only path that touches `job_mutex`).
    fn unconnected_mutex_store() -> PgMutexStore {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool construction never touches the network");
        PgMutexStore::new(pool)
    }

    fn no_mutex_worker(
        queue: FakeQueueAdapter,
        metrics: Arc<RecordingMetricsSink>,
    ) -> WorkerRuntime<FakeQueueAdapter> {
        WorkerRuntime::new(
            queue,
            unconnected_mutex_store(),
            metrics,
            Arc::new(MaintenanceWindows::new()),
            "test-host".to_string(),
        )
    }

    #[tokio::test]
    async fn global_job_success_completes_and_records_metrics() {
        let queue = FakeQueueAdapter::new();
        queue.create_queue("metrics").await.unwrap();
        queue
            .send("metrics", serde_json::json!({}), SendOptions::default())
            .await
            .unwrap();

        let metrics = Arc::new(RecordingMetricsSink::new());
        let mut worker = no_mutex_worker(queue, Arc::clone(&metrics));
        worker.register_handler(Arc::new(AlwaysSucceeds));

        let config = SchedulerConfig::default();
        let shutdown = CancellationToken::new();
        let claimed = worker.run_once(JobType::Metrics, &config, &shutdown).await.unwrap();
        assert!(claimed);

        let recorded = metrics.recorded();
        assert!(recorded.iter().any(|m| m.name == "scheduler_job_started_total"));
        assert!(recorded
            .iter()
            .any(|m| m.name == "scheduler_job_completed_total"
                && m.labels.contains(&("outcome".to_string(), "success".to_string()))));
        assert!(recorded.iter().any(|m| m.name == "scheduler_job_duration_seconds"));
    }

    #[tokio::test]
    async fn handler_exceeding_timeout_is_recorded_as_aborted() {
        let queue = FakeQueueAdapter::new();
        queue.create_queue("metrics").await.unwrap();
        queue
            .send("metrics", serde_json::json!({}), SendOptions::default())
            .await
            .unwrap();

        let metrics = Arc::new(RecordingMetricsSink::new());
        let mut worker = no_mutex_worker(queue, Arc::clone(&metrics));
        worker.register_handler(Arc::new(NeverFinishes));

        let config = SchedulerConfig {
            default_job_timeout_seconds: 5,
            ..SchedulerConfig::default()
        };
        let shutdown = CancellationToken::new();

        tokio::time::pause();
        let task = tokio::spawn(async move {
            worker.run_once(JobType::Metrics, &config, &shutdown).await
        });
        tokio::task::yield_now().await;
        tokio::time::advance(StdDuration::from_secs(6)).await;
        let claimed = task.await.unwrap().unwrap();
        assert!(claimed);

        let recorded = metrics.recorded();
        assert!(recorded
            .iter()
            .any(|m| m.name == "scheduler_job_completed_total"
                && m.labels.contains(&("outcome".to_string(), "aborted".to_string()))));
    }

    #[tokio::test]
    async fn maintenance_window_defers_without_invoking_handler() {
        let queue = FakeQueueAdapter::new();
        queue.create_queue("deal").await.unwrap();
        queue
            .send(
                "deal",
                serde_json::json!({"sp_address": "f01"}),
                SendOptions {
                    singleton_key: Some("deal:f01".to_string()),
                    run_at: None,
                },
            )
            .await
            .unwrap();

        let metrics = Arc::new(RecordingMetricsSink::new());
        let windows: Arc<MaintenanceWindows> = Arc::new(MaintenanceWindows::new());
        windows.insert(
            // [0, 1439) covers the entire day except the last minute, far
            // more reliable for a wall-clock-dependent test than an
            // exactly-24h window (which the evaluator treats as "no
            // window" per its equal-start-and-end rule).
            "f01".to_string(),
            MaintenanceWindowEvaluator::new(vec![MaintenanceWindow::new(0, 1439)]),
        );

        let mut worker = WorkerRuntime::new(
            queue,
            unconnected_mutex_store(),
            Arc::clone(&metrics) as Arc<dyn MetricsSink>,
            windows,
            "test-host".to_string(),
        );
        worker.register_handler(Arc::new(AlwaysSucceeds));

        let config = SchedulerConfig::default();
        let shutdown = CancellationToken::new();
        let claimed = worker.run_once(JobType::Deal, &config, &shutdown).await.unwrap();
        assert!(claimed);

        let recorded = metrics.recorded();
        assert!(recorded.iter().any(|m| m.name == "scheduler_job_deferred_total"));
        assert!(!recorded.iter().any(|m| m.name == "scheduler_job_started_total"));
    }
}
