//! Top-level orchestrator: one tick runs the reconciler, then the enqueue
//! loop for every job type, then the metrics collector, guarded by
//! [`TickSingleFlight`] so a slow tick never overlaps the next timer fire.

use std::sync::Arc;

use provider_sched_core::{JobType, QueueAdapter, SchedulerError};
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::enqueue::EnqueueLoop;
use crate::metrics_collector::MetricsCollector;
use crate::reconciler::ScheduleReconciler;
use crate::single_flight::TickSingleFlight;

pub struct Scheduler<Q> {
    reconciler: ScheduleReconciler,
    enqueue_loop: EnqueueLoop<Q>,
    metrics_collector: MetricsCollector<Q>,
    config: SchedulerConfig,
    job_types: Vec<JobType>,
    single_flight: TickSingleFlight,
}

impl<Q: QueueAdapter> Scheduler<Q> {
    pub fn new(
        reconciler: ScheduleReconciler,
        enqueue_loop: EnqueueLoop<Q>,
        metrics_collector: MetricsCollector<Q>,
        config: SchedulerConfig,
        job_types: Vec<JobType>,
    ) -> Self {
        Scheduler {
            reconciler,
            enqueue_loop,
            metrics_collector,
            config: config.validated(),
            job_types,
            single_flight: TickSingleFlight::new(),
        }
    }

    /// Run one tick body: reconcile, enqueue per job type, collect
    /// metrics. Skips entirely (logging at debug) if a previous tick is
    /// still in flight.
    pub async fn tick(&self) -> Result<(), SchedulerError> {
        let Some(_guard) = self.single_flight.try_acquire() else {
            tracing::debug!("skipping tick, previous tick still in flight");
            return Ok(());
        };

        let report = self.reconciler.reconcile(&self.config).await?;
        tracing::info!(
            providers_observed = report.providers_observed,
            schedules_inserted = report.schedules_inserted,
            schedules_deleted = report.schedules_deleted,
            "reconciliation complete"
        );

        for job_type in &self.job_types {
            let report = self.enqueue_loop.run_once(*job_type, &self.config).await?;
            if report.rows_claimed > 0 {
                tracing::info!(
                    job_type = job_type.as_str(),
                    rows_claimed = report.rows_claimed,
                    jobs_sent = report.jobs_sent,
                    jobs_already_queued = report.jobs_already_queued,
                    runs_skipped = report.runs_skipped,
                    "enqueue pass complete"
                );
            }
        }

        self.metrics_collector.collect_once().await?;
        Ok(())
    }

    /// Run the tick loop until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        tracing::error!(error = %err, "tick failed");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("scheduler shutting down");
                    break;
                }
            }
        }
    }
}
